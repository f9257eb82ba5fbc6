//! Device-type classification from a port's status and signature
//! registers. The classification is derived, never stored; callers
//! recompute it on demand.

use core::fmt;

use crate::regs::{self, HostRegs, PortReg};

/// Device classification for one port
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    /// No device, or the link is not active
    Absent,
    /// SATA drive
    Sata,
    /// SATAPI drive
    Satapi,
    /// Enclosure management bridge
    EnclosureBridge,
    /// Port multiplier
    PortMultiplier,
}

impl fmt::Display for DeviceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceClass::Absent => write!(f, "none"),
            DeviceClass::Sata => write!(f, "SATA"),
            DeviceClass::Satapi => write!(f, "SATAPI"),
            DeviceClass::EnclosureBridge => write!(f, "SEMB"),
            DeviceClass::PortMultiplier => write!(f, "PM"),
        }
    }
}

/// Classify the device attached to `port`.
///
/// A port whose detection field is not "present" or whose link is not
/// active classifies as [`DeviceClass::Absent`] regardless of signature.
/// Any signature outside the known set, the plain ATA value included,
/// classifies as a SATA drive.
pub fn classify<H: HostRegs>(hba: &H, port: u8) -> DeviceClass {
    let ssts = hba.read_port_reg(port, PortReg::Ssts);

    if regs::ssts_det(ssts) != regs::SSTS_DET_PRESENT {
        return DeviceClass::Absent;
    }
    if regs::ssts_ipm(ssts) != regs::SSTS_IPM_ACTIVE {
        return DeviceClass::Absent;
    }

    match hba.read_port_reg(port, PortReg::Sig) {
        regs::SIG_ATAPI => DeviceClass::Satapi,
        regs::SIG_SEMB => DeviceClass::EnclosureBridge,
        regs::SIG_PM => DeviceClass::PortMultiplier,
        _ => DeviceClass::Sata,
    }
}
