//! Simulated adapter register model for the unit tests.
//!
//! Models the behavior the driver polls on: the CR and FR status bits
//! catch up with ST and FRE a fixed number of command-register reads
//! after a write, and a stuck port never settles.

use core::cell::Cell;

use crate::regs::{HbaReg, HostRegs, PortCmd, PortReg, MAX_PORTS};

/// Command-register reads before CR/FR catch up with ST/FRE
const SETTLE_POLLS: u32 = 3;

#[derive(Debug, Default)]
pub struct SimPort {
    regs: [Cell<u32>; 16],
    settle: Cell<u32>,
    /// A stuck engine never updates CR/FR
    pub stuck: bool,
    /// SATA status reads observed, for enumeration-coverage asserts
    pub ssts_reads: Cell<u32>,
}

impl SimPort {
    fn idx(reg: PortReg) -> usize {
        reg as u32 as usize / 4
    }

    pub fn read(&self, reg: PortReg) -> u32 {
        if matches!(reg, PortReg::Ssts) {
            self.ssts_reads.set(self.ssts_reads.get() + 1);
        }
        if matches!(reg, PortReg::Cmd) && !self.stuck {
            let polls = self.settle.get();
            if polls > 0 {
                self.settle.set(polls - 1);
                if polls == 1 {
                    self.sync_engine_bits();
                }
            }
        }
        self.regs[Self::idx(reg)].get()
    }

    pub fn write(&mut self, reg: PortReg, value: u32) {
        self.regs[Self::idx(reg)].set(value);
        if matches!(reg, PortReg::Cmd) {
            self.settle.set(SETTLE_POLLS);
        }
    }

    fn sync_engine_bits(&self) {
        let idx = Self::idx(PortReg::Cmd);
        let mut cmd = PortCmd::from_bits_truncate(self.regs[idx].get());
        cmd.set(PortCmd::CR, cmd.contains(PortCmd::ST));
        cmd.set(PortCmd::FR, cmd.contains(PortCmd::FRE));
        self.regs[idx].set(cmd.bits());
    }

    /// Put the engine in the running state.
    pub fn set_running(&mut self) {
        let cmd = PortCmd::ST | PortCmd::FRE | PortCmd::CR | PortCmd::FR;
        self.regs[Self::idx(PortReg::Cmd)].set(cmd.bits());
        self.settle.set(0);
    }

    /// Engine bits disabled but still draining: CR/FR clear after a few
    /// polls.
    pub fn set_winding_down(&mut self) {
        let cmd = PortCmd::CR | PortCmd::FR;
        self.regs[Self::idx(PortReg::Cmd)].set(cmd.bits());
        self.settle.set(SETTLE_POLLS);
    }

    /// Attach a device: detection and power fields plus the signature.
    pub fn attach(&mut self, det: u32, ipm: u32, sig: u32) {
        self.regs[Self::idx(PortReg::Ssts)].set((ipm << 8) | det);
        self.regs[Self::idx(PortReg::Sig)].set(sig);
    }
}

#[derive(Debug)]
pub struct SimHba {
    regs: [u32; 8],
    ports: [SimPort; MAX_PORTS as usize],
    /// Register writes observed, global and port alike
    pub writes: u32,
}

impl SimHba {
    pub fn new(ports_implemented: u32) -> Self {
        let mut hba = Self {
            regs: [0u32; 8],
            ports: core::array::from_fn(|_| SimPort::default()),
            writes: 0,
        };
        hba.regs[HbaReg::Pi as u32 as usize / 4] = ports_implemented;
        // 32 command slots, 32 ports, AHCI 1.3
        hba.regs[HbaReg::Cap as u32 as usize / 4] = (31 << 8) | 31;
        hba.regs[HbaReg::Vs as u32 as usize / 4] = 0x0001_0300;
        for port in hba.ports.iter_mut() {
            port.set_running();
        }
        hba
    }

    pub fn port(&self, port: u8) -> &SimPort {
        &self.ports[port as usize]
    }

    pub fn port_mut(&mut self, port: u8) -> &mut SimPort {
        &mut self.ports[port as usize]
    }
}

impl HostRegs for SimHba {
    fn read_reg(&self, reg: HbaReg) -> u32 {
        self.regs[reg as u32 as usize / 4]
    }

    fn write_reg(&mut self, reg: HbaReg, value: u32) {
        self.writes += 1;
        self.regs[reg as u32 as usize / 4] = value;
    }

    fn read_port_reg(&self, port: u8, reg: PortReg) -> u32 {
        self.ports[port as usize].read(reg)
    }

    fn write_port_reg(&mut self, port: u8, reg: PortReg, value: u32) {
        self.writes += 1;
        self.ports[port as usize].write(reg, value);
    }
}
