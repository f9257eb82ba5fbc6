//! Per-port command engine lifecycle.
//!
//! The engine must be fully stopped before its backing memory is
//! reconfigured and restarted only afterwards. Both transitions wait on
//! hardware-owned status bits with a bounded poll; a port that never
//! settles reports [`AhciError::EngineTimeout`] instead of hanging the
//! caller.

use crate::regs::{HostRegs, PortCmd, PortReg};
use crate::{AhciError, AhciResult};

/// Bounded-retry policy for polls against hardware-owned status bits
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of polls before the wait is abandoned
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32) -> Self {
        Self { max_attempts }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1_000_000)
    }
}

fn poll<F>(policy: &RetryPolicy, port: u8, mut done: F) -> AhciResult<()>
where
    F: FnMut() -> bool,
{
    for _ in 0..policy.max_attempts {
        if done() {
            return Ok(());
        }
        core::hint::spin_loop();
    }
    Err(AhciError::EngineTimeout { port })
}

/// Start the port's command engine.
///
/// Waits for any prior command-list activity to fully cease, then enables
/// FIS receive and sets the start bit, in that order. If the running bit
/// never clears within the poll budget, the engine bits are left
/// untouched and the timeout is reported.
pub fn start<H: HostRegs>(hba: &mut H, port: u8, policy: &RetryPolicy) -> AhciResult<()> {
    poll(policy, port, || {
        let cmd = PortCmd::from_bits_truncate(hba.read_port_reg(port, PortReg::Cmd));
        !cmd.contains(PortCmd::CR)
    })?;

    let cmd = hba.read_port_reg(port, PortReg::Cmd);
    hba.write_port_reg(port, PortReg::Cmd, cmd | PortCmd::FRE.bits());
    let cmd = hba.read_port_reg(port, PortReg::Cmd);
    hba.write_port_reg(port, PortReg::Cmd, cmd | PortCmd::ST.bits());
    Ok(())
}

/// Stop the port's command engine.
///
/// Clears the start bit, then FIS receive enable, then waits until both
/// the FIS-receive-running and command-list-running bits read clear.
pub fn stop<H: HostRegs>(hba: &mut H, port: u8, policy: &RetryPolicy) -> AhciResult<()> {
    let cmd = hba.read_port_reg(port, PortReg::Cmd);
    hba.write_port_reg(port, PortReg::Cmd, cmd & !PortCmd::ST.bits());
    let cmd = hba.read_port_reg(port, PortReg::Cmd);
    hba.write_port_reg(port, PortReg::Cmd, cmd & !PortCmd::FRE.bits());

    poll(policy, port, || {
        let cmd = PortCmd::from_bits_truncate(hba.read_port_reg(port, PortReg::Cmd));
        !cmd.intersects(PortCmd::FR | PortCmd::CR)
    })
}
