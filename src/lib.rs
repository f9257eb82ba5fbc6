//! # AHCI Host Controller Core
//!
//! Controller-management core for AHCI host bus adapters: discovery of
//! populated ports, device-type classification from hardware signatures,
//! per-port command memory layout, and the start/stop lifecycle of each
//! port's command engine.
//!
//! Command submission, interrupt-driven completion, and PCI discovery of
//! the adapter live outside this crate. The embedding kernel hands in a
//! validated register base address ([`MmioHba`]) and an exclusively-owned
//! scratch memory region ([`ScratchRegion`]), installs a `log` sink for
//! diagnostics, and receives a report of the attached devices.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod classify;
pub mod controller;
pub mod engine;
pub mod layout;
pub mod regs;

#[cfg(test)]
mod sim;

use core::fmt;

pub use classify::{classify, DeviceClass};
pub use controller::{init, with_controller, AhciController, PortReport};
pub use engine::RetryPolicy;
pub use layout::{CmdHeader, PortLayout, ScratchRegion};
pub use regs::{HostRegs, MmioHba};

/// Errors surfaced during adapter bring-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AhciError {
    /// A command-engine start/stop poll exhausted its retry budget
    EngineTimeout { port: u8 },
    /// The scratch region cannot hold the layout for all implemented ports
    LayoutExhausted { required: u64, available: u64 },
    /// Reserved: a device signature the classifier refuses to map.
    /// The current policy classifies unknown signatures as SATA instead.
    UnsupportedSignature(u32),
}

impl fmt::Display for AhciError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AhciError::EngineTimeout { port } => {
                write!(f, "command engine on port {} did not settle", port)
            }
            AhciError::LayoutExhausted {
                required,
                available,
            } => {
                write!(
                    f,
                    "scratch region too small: need {} bytes, have {}",
                    required, available
                )
            }
            AhciError::UnsupportedSignature(sig) => {
                write!(f, "unrecognized device signature {:#010x}", sig)
            }
        }
    }
}

/// Result alias for adapter operations
pub type AhciResult<T> = Result<T, AhciError>;
