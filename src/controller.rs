//! # Controller Bring-up
//!
//! Orchestrates adapter bring-up: command memory layout for every
//! implemented port, then device enumeration. Each port's engine is
//! stopped before its backing memory is touched and restarted only once
//! every structure is assigned and zeroed.

use alloc::vec::Vec;
use spin::RwLock;

use crate::classify::{classify, DeviceClass};
use crate::engine::{self, RetryPolicy};
use crate::layout::{
    check_capacity, CmdHeader, PortLayout, ScratchRegion, CMD_HEADER_SIZE, CMD_LIST_SIZE,
    CMD_SLOTS, CMD_TABLE_SIZE, FIS_SIZE,
};
use crate::regs::{HbaReg, HostRegs, MmioHba, PortReg, GHC_AE, MAX_PORTS};
use crate::AhciResult;

/// Log target for adapter records
const TARGET: &str = "ahci";

/// One enumerated device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PortReport {
    pub port: u8,
    pub class: DeviceClass,
}

/// AHCI adapter bring-up driver
#[derive(Debug)]
pub struct AhciController<H: HostRegs> {
    regs: H,
    scratch: ScratchRegion,
    retry: RetryPolicy,
}

impl<H: HostRegs> AhciController<H> {
    /// Create a controller over `regs`, with `scratch` backing the
    /// per-port command structures.
    pub fn new(regs: H, scratch: ScratchRegion) -> Self {
        Self {
            regs,
            scratch,
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the poll budget used for engine start/stop waits.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Borrow the register handle.
    pub fn regs(&self) -> &H {
        &self.regs
    }

    /// Assign and zero every implemented port's command structures.
    ///
    /// The scratch region is capacity-checked against the highest
    /// implemented port before the first register write. Ports are
    /// processed in ascending index order; within a port the sequence
    /// is strict: stop engine, command list, received FIS, all 32
    /// command headers and tables, restart engine.
    pub fn rebase(&mut self) -> AhciResult<()> {
        let pi = self.regs.read_reg(HbaReg::Pi);
        check_capacity(&self.scratch, pi)?;

        for port in 0..MAX_PORTS {
            if pi & (1 << port) == 0 {
                continue;
            }
            self.rebase_port(port)?;
        }
        Ok(())
    }

    fn rebase_port(&mut self, port: u8) -> AhciResult<()> {
        engine::stop(&mut self.regs, port, &self.retry)?;

        let layout = PortLayout::for_port(port);

        let clb = self.scratch.phys_at(layout.cmd_list);
        self.regs
            .write_port_reg(port, PortReg::Clb, clb.as_u64() as u32);
        self.regs
            .write_port_reg(port, PortReg::Clbu, (clb.as_u64() >> 32) as u32);
        self.scratch.zero(layout.cmd_list, CMD_LIST_SIZE);

        let fb = self.scratch.phys_at(layout.fis);
        self.regs
            .write_port_reg(port, PortReg::Fb, fb.as_u64() as u32);
        self.regs
            .write_port_reg(port, PortReg::Fbu, (fb.as_u64() >> 32) as u32);
        self.scratch.zero(layout.fis, FIS_SIZE);

        for slot in 0..CMD_SLOTS as u8 {
            let table = layout.command_table(slot);
            self.scratch.zero(table, CMD_TABLE_SIZE);
            let header = CmdHeader::with_table(self.scratch.phys_at(table));
            self.scratch
                .write(layout.cmd_list + slot as u64 * CMD_HEADER_SIZE, header);
        }

        engine::start(&mut self.regs, port, &self.retry)
    }

    /// Enumerate implemented ports and report attached devices.
    ///
    /// Visits exactly the ports whose bit is set in the
    /// ports-implemented mask, in ascending index order. Ports that
    /// classify as absent produce no report and no log line.
    pub fn scan_ports(&self) -> Vec<PortReport> {
        let mut found = Vec::new();
        let mut pi = self.regs.read_reg(HbaReg::Pi);

        for port in 0..MAX_PORTS {
            if pi & 1 != 0 {
                let class = classify(&self.regs, port);
                if class != DeviceClass::Absent {
                    log::info!(target: TARGET, "{} drive found, port = {}", class, port);
                    found.push(PortReport { port, class });
                }
            }
            pi >>= 1;
        }
        found
    }

    /// Bring the adapter up: enable AHCI mode, lay out port memory,
    /// then enumerate attached devices.
    ///
    /// An undersized scratch region is rejected before the first
    /// register write.
    pub fn bring_up(&mut self) -> AhciResult<Vec<PortReport>> {
        let pi = self.regs.read_reg(HbaReg::Pi);
        check_capacity(&self.scratch, pi)?;

        let ghc = self.regs.read_reg(HbaReg::Ghc);
        self.regs.write_reg(HbaReg::Ghc, ghc | GHC_AE);

        let vs = self.regs.read_reg(HbaReg::Vs);
        let cap = self.regs.read_reg(HbaReg::Cap);
        log::info!(
            target: TARGET,
            "AHCI {}.{} host adapter: {} command slots, {} ports",
            vs >> 16,
            (vs >> 8) & 0xff,
            ((cap >> 8) & 0x1f) + 1,
            (cap & 0x1f) + 1
        );

        self.rebase()?;
        log::info!(target: TARGET, "port memory spaces configured, enumerating devices");

        let found = self.scan_ports();
        log::info!(
            target: TARGET,
            "drive enumeration completed, {} device(s) attached",
            found.len()
        );
        Ok(found)
    }
}

static CONTROLLER: RwLock<Option<AhciController<MmioHba>>> = RwLock::new(None);

/// Bring up the adapter behind `regs` and make the controller available
/// through [`with_controller`]. On error nothing is registered and the
/// error is returned to the caller.
pub fn init(regs: MmioHba, scratch: ScratchRegion) -> AhciResult<Vec<PortReport>> {
    log::info!(
        target: TARGET,
        "ABAR = {:#x}, reconfiguring port memory",
        regs.base_addr()
    );
    let mut controller = AhciController::new(regs, scratch);
    let found = controller.bring_up()?;
    *CONTROLLER.write() = Some(controller);
    Ok(found)
}

/// Run `f` against the registered controller, if any.
pub fn with_controller<F, R>(f: F) -> Option<R>
where
    F: FnOnce(&mut AhciController<MmioHba>) -> R,
{
    CONTROLLER.write().as_mut().map(f)
}
