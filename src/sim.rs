/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Simulated register file for the unit tests.
//!
//! Registers read as zero until written. PLL configuration registers added
//! with [`SimHal::add_pll`] report `LOCK` as soon as they are enabled, and
//! `DYNRAMP_DONE` as soon as a ramp is started, unless told otherwise.

use crate::node::pll::PllCfg;
use crate::regs::Hal;
use crate::Error;
use std::collections::{BTreeMap, BTreeSet};
use std::vec::Vec;

#[derive(Debug, Default)]
pub struct SimHal {
    regs: BTreeMap<u32, u32>,
    plls: BTreeSet<u32>,
    never_lock: BTreeSet<u32>,
    stuck_ramp: BTreeSet<u32>,
    writes: Vec<(u32, u32)>,
    elapsed_us: u64,
}

impl SimHal {
    pub fn new() -> Self {
        let _ = env_logger::builder().is_test(true).try_init();
        SimHal::default()
    }

    pub fn add_pll(&mut self, cfg: u32) {
        self.plls.insert(cfg);
    }

    pub fn pll_never_locks(&mut self, cfg: u32) {
        self.add_pll(cfg);
        self.never_lock.insert(cfg);
    }

    pub fn ramp_never_finishes(&mut self, cfg: u32) {
        self.add_pll(cfg);
        self.stuck_ramp.insert(cfg);
    }

    pub fn reg(&self, addr: u32) -> u32 {
        self.regs.get(&addr).copied().unwrap_or(0)
    }

    /// Presets a register without logging a write.
    pub fn set_reg(&mut self, addr: u32, value: u32) {
        self.regs.insert(addr, value);
    }

    pub fn writes(&self) -> &[(u32, u32)] {
        &self.writes
    }

    pub fn clear_writes(&mut self) {
        self.writes.clear();
    }

    /// Values written to `addr`, oldest first.
    pub fn writes_to(&self, addr: u32) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Position in the write log of the first write to `addr`.
    pub fn write_index(&self, addr: u32) -> Option<usize> {
        self.write_index_where(addr, |_| true)
    }

    pub fn write_index_where<F: Fn(u32) -> bool>(&self, addr: u32, f: F) -> Option<usize> {
        self.writes.iter().position(|&(a, v)| a == addr && f(v))
    }

    pub fn elapsed_us(&self) -> u64 {
        self.elapsed_us
    }

    fn settle_pll(&self, cfg_addr: u32, value: u32) -> u32 {
        let mut cfg = PllCfg::from_bits_truncate(value);
        let running = cfg.contains(PllCfg::ENABLE) && !cfg.contains(PllCfg::IDDQ);
        cfg.set(PllCfg::LOCK, running && !self.never_lock.contains(&cfg_addr));
        let ramping = cfg.contains(PllCfg::EN_DYNRAMP);
        cfg.set(
            PllCfg::DYNRAMP_DONE,
            ramping && !self.stuck_ramp.contains(&cfg_addr),
        );
        (value & !PllCfg::all().bits()) | cfg.bits()
    }
}

impl Hal for SimHal {
    fn read(&mut self, addr: u32) -> Result<u32, Error> {
        Ok(self.reg(addr))
    }

    fn write(&mut self, addr: u32, value: u32) -> Result<(), Error> {
        self.writes.push((addr, value));
        let value = if self.plls.contains(&addr) {
            self.settle_pll(addr, value)
        } else {
            value
        };
        self.regs.insert(addr, value);
        Ok(())
    }

    fn delay_us(&mut self, us: u32) {
        self.elapsed_us += us as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locks_only_when_running() {
        let mut hw = SimHal::new();
        hw.add_pll(0x10);
        hw.write(0x10, (PllCfg::ENABLE | PllCfg::IDDQ).bits()).unwrap();
        assert!(!PllCfg::from_bits_truncate(hw.reg(0x10)).contains(PllCfg::LOCK));
        hw.write(0x10, PllCfg::ENABLE.bits()).unwrap();
        assert!(PllCfg::from_bits_truncate(hw.reg(0x10)).contains(PllCfg::LOCK));
        hw.delay_us(3);
        assert_eq!(hw.elapsed_us(), 3);
        assert_eq!(hw.writes().len(), 2);
    }
}
