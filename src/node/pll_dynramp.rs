/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! SDM PLL that ramps to a new NDIV/SDM_DIN in hardware.
//!
//! A hot switch loads both values into the ramp register and lets the PLL
//! walk there by itself instead of sliding NDIV from software.

use super::pll::{Pll, PllCfg, PllLimits, PllPhase, PllRegs, NDIV};
use super::pll_sdm::{read_sdm, resolve_sdm, write_sdm, SDM_DIN};
use super::{ClockNode, Graph, Inputs, NodeId};
use crate::phase::{check_phase, PhaseIndex};
use crate::regs::{Field, Hal};
use crate::signal::{Signal, TargetSignal};
use crate::Error;

pub const NDIV_NEW: Field = Field::new(0, 8);
pub const SDM_DIN_NEW: Field = Field::new(16, 13);

/// Time the hardware ramp is given before `DYNRAMP_DONE` is checked.
pub const DYNRAMP_DELAY_US: u32 = 500;

#[derive(Debug)]
pub struct DynRampPll {
    pll: Pll,
    sdm_addr: u32,
    ramp_addr: u32,
}

impl DynRampPll {
    pub fn new(
        input: NodeId,
        regs: PllRegs,
        sdm_addr: u32,
        ramp_addr: u32,
        limits: PllLimits,
    ) -> Self {
        DynRampPll {
            pll: Pll::new(input, regs, limits),
            sdm_addr,
            ramp_addr,
        }
    }

    pub fn map_pll<F: FnOnce(Pll) -> Pll>(mut self, f: F) -> Self {
        self.pll = f(self.pll);
        self
    }

    pub fn phase(&self, phase: PhaseIndex) -> &PllPhase {
        self.pll.phase(phase)
    }

    /// Loads the new NDIV/SDM_DIN, runs the ramp and checks it finished once.
    fn ramp(&self, hw: &mut dyn Hal, from: &PllPhase, to: &PllPhase) -> Result<(), Error> {
        let regs = self.pll.regs();
        assert!(
            from.coeffs.mdiv == to.coeffs.mdiv && from.coeffs.pldiv == to.coeffs.pldiv,
            "pll {:#x}: dynamic ramp may only move NDIV and SDM_DIN",
            regs.cfg
        );

        let word = NDIV_NEW.set(hw.read(self.ramp_addr)?, to.coeffs.ndiv as u32);
        hw.write(self.ramp_addr, SDM_DIN_NEW.set_signed(word, to.sdm_din as i32))?;
        hw.modify(regs.cfg, 0, PllCfg::EN_DYNRAMP.bits())?;
        hw.delay_us(DYNRAMP_DELAY_US);

        let status = PllCfg::from_bits_truncate(hw.read(regs.cfg)?);
        if !status.contains(PllCfg::DYNRAMP_DONE) {
            log::error!(
                "pll {:#x} dynamic ramp to N={} SDM={} did not finish",
                regs.cfg,
                to.coeffs.ndiv,
                to.sdm_din
            );
            return Err(Error::Timeout);
        }

        hw.modify(regs.cfg, PllCfg::EN_DYNRAMP.bits(), 0)?;
        hw.write_field(regs.coeff, NDIV, to.coeffs.ndiv as u32)?;
        write_sdm(hw, self.sdm_addr, to.sdm_din)?;
        log::debug!(
            "pll {:#x} ramped N={} SDM={} -> N={} SDM={}",
            regs.cfg,
            from.coeffs.ndiv,
            from.sdm_din,
            to.coeffs.ndiv,
            to.sdm_din
        );
        Ok(())
    }
}

impl ClockNode for DynRampPll {
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        read_sdm(&mut self.pll, self.sdm_addr, graph, active)
    }

    fn config(
        &mut self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error> {
        check_phase(phase)?;
        let (record, signal) = resolve_sdm(&self.pll, graph, target, phase, hot_switch)?;
        self.pll.commit(phase, record);
        Ok(signal)
    }

    fn program(&mut self, graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error> {
        check_phase(phase)?;
        self.pll.wire().program_input(graph, phase)?;
        if self.pll.phases().unchanged(phase) {
            return Ok(());
        }
        let record = *self.pll.phase(phase);
        let prev = *self.pll.phases().prev(phase);
        let hw = graph.hw();
        if !record.enabled {
            return self.pll.power_down(hw);
        }
        if record.hot {
            return self.ramp(hw, &prev, &record);
        }
        let word = SDM_DIN.set_signed(hw.read(self.sdm_addr)?, record.sdm_din as i32);
        self.pll
            .program_cold(hw, &record, Some((self.sdm_addr, word)), PllCfg::EN_SDM)
    }

    fn cleanup(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        self.pll.cleanup_common(graph, active)
    }

    fn inputs(&self) -> Inputs {
        self.pll.inputs()
    }

    fn set_active(&mut self, phase: PhaseIndex, active: bool) {
        self.pll.set_active_flag(phase, active);
    }

    fn is_active(&self, phase: PhaseIndex) -> bool {
        self.pll.is_active(phase)
    }

    #[cfg(feature = "diagnostics")]
    fn dump(&self, id: NodeId, hw: &mut dyn Hal) {
        let ramp = hw.read(self.ramp_addr).ok();
        let sdm = hw.read(self.sdm_addr).map(|w| SDM_DIN.get_signed(w)).ok();
        log::debug!(
            "{} ramp[{:#x}] = {:?} sdm[{:#x}] = {:?}",
            id,
            self.ramp_addr,
            ramp,
            self.sdm_addr,
            sdm
        );
        self.pll.dump_regs(id, "pll-dynramp", hw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::pll::tests::{limits, REGS};
    use crate::node::pll::Coeffs;
    use crate::node::{Node, Xtal};
    use crate::signal::FreqRange;
    use crate::sim::SimHal;

    const SDM: u32 = 0x108;
    const RAMP: u32 = 0x10c;

    fn running(hw: &mut SimHal) -> [Node; 2] {
        hw.add_pll(REGS.cfg);
        hw.set_reg(REGS.cfg, (PllCfg::ENABLE | PllCfg::EN_SDM | PllCfg::LOCK).bits());
        hw.set_reg(REGS.coeff, Coeffs { mdiv: 1, ndiv: 40, pldiv: 1 }.encode(0));
        hw.set_reg(SDM, SDM_DIN.set_signed(0, 0));
        [
            Node::from(Xtal::new(27_000)),
            Node::from(DynRampPll::new(NodeId(0), REGS, SDM, RAMP, limits())),
        ]
    }

    fn decode_ramp(word: u32) -> (u16, i16) {
        (NDIV_NEW.get(word) as u16, SDM_DIN_NEW.get_signed(word) as i16)
    }

    fn ramp_pll(nodes: &[Node]) -> &DynRampPll {
        match &nodes[1] {
            Node::DynRampPll(pll) => pll,
            _ => unreachable!(),
        }
    }

    #[test]
    fn hot_switch_ramps_in_hardware() {
        let mut hw = SimHal::new();
        let mut nodes = running(&mut hw);
        let mut graph = Graph::new(&mut nodes, &mut hw);
        assert_eq!(graph.read(NodeId(1), true).unwrap().freq_khz, 1_093_500);

        let target = TargetSignal::new(1_120_000, FreqRange::tolerance(1_120_000, 1));
        let signal = graph.config(NodeId(1), &target, 1, true).unwrap();
        assert!(signal.freq_khz >= 1_120_000 && target.range.contains(signal.freq_khz));
        let record = *ramp_pll(&nodes).phase(1);
        assert!(record.hot);

        let mut graph = Graph::new(&mut nodes, &mut hw);
        graph.program(NodeId(1), 1).unwrap();
        assert_eq!(decode_ramp(hw.reg(RAMP)), (record.coeffs.ndiv, record.sdm_din));
        assert_eq!(Coeffs::decode(hw.reg(REGS.coeff)), record.coeffs);
        assert_eq!(SDM_DIN.get_signed(hw.reg(SDM)), record.sdm_din as i32);
        let cfg = PllCfg::from_bits_truncate(hw.reg(REGS.cfg));
        assert!(!cfg.contains(PllCfg::EN_DYNRAMP));
        assert!(cfg.contains(PllCfg::ENABLE));

        let mut graph = Graph::new(&mut nodes, &mut hw);
        assert_eq!(graph.read(NodeId(1), true).unwrap().freq_khz, signal.freq_khz);
    }

    #[test]
    fn stuck_ramp_times_out_without_retry() {
        let mut hw = SimHal::new();
        let mut nodes = running(&mut hw);
        hw.ramp_never_finishes(REGS.cfg);
        let mut graph = Graph::new(&mut nodes, &mut hw);
        graph.read(NodeId(1), true).unwrap();
        let target = TargetSignal::new(1_120_000, FreqRange::tolerance(1_120_000, 1));
        graph.config(NodeId(1), &target, 1, true).unwrap();

        hw.clear_writes();
        let mut graph = Graph::new(&mut nodes, &mut hw);
        assert_eq!(graph.program(NodeId(1), 1), Err(Error::Timeout));
        assert_eq!(hw.writes_to(RAMP).len(), 1);
        assert_eq!(Coeffs::decode(hw.reg(REGS.coeff)).ndiv, 40);
    }
}
