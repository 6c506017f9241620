/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
use super::pll::{Coeffs, PllCfg, PllRegs};
use super::xtal::check_leaf;
use super::{ClockNode, Graph, Inputs, MUX_MAX_INPUTS};
#[cfg(feature = "diagnostics")]
use super::NodeId;
use crate::phase::{check_phase, ActivePhase, PhaseIndex, Phases};
#[cfg(feature = "diagnostics")]
use crate::regs::Hal;
use crate::signal::{Signal, Source, TargetSignal};
use crate::Error;

/// Display PLL owned by another domain.
///
/// Treated as a leaf: its configuration is read, never changed, and it is
/// never powered down from here.
#[derive(Debug)]
pub struct Sppll {
    regs: PllRegs,
    ref_khz: u32,
    source: Source,
    signal: Signal,
    phases: Phases<ActivePhase>,
}

impl Sppll {
    /// `source` is the tag a route must request to end here, normally
    /// `Source::Sppll0` or `Source::Sppll1`.
    pub fn new(regs: PllRegs, ref_khz: u32, source: Source) -> Self {
        Sppll {
            regs,
            ref_khz,
            source,
            signal: Signal::new(0, source),
            phases: Phases::new(ActivePhase::default()),
        }
    }

    /// Output observed by the last `read`.
    pub fn signal(&self) -> Signal {
        self.signal
    }
}

impl ClockNode for Sppll {
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        let hw = graph.hw();
        let cfg = PllCfg::from_bits_truncate(hw.read(self.regs.cfg)?);
        let coeffs = Coeffs::decode(hw.read(self.regs.coeff)?);
        let freq_khz = if cfg.contains(PllCfg::ENABLE) && !cfg.contains(PllCfg::IDDQ) {
            coeffs.output_khz(self.ref_khz)
        } else {
            0
        };
        self.signal = Signal::new(freq_khz, self.source);
        self.phases.set_all(ActivePhase::default(), active);
        Ok(self.signal)
    }

    fn config(
        &mut self,
        _graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        _hot_switch: bool,
    ) -> Result<Signal, Error> {
        check_phase(phase)?;
        check_leaf(target, &self.signal)?;
        self.phases.set(phase, ActivePhase { active: true });
        Ok(self.signal)
    }

    fn program(&mut self, _graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error> {
        check_phase(phase)
    }

    fn cleanup(&mut self, _graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        self.phases.collapse(active);
        Ok(())
    }

    fn inputs(&self) -> Inputs {
        [None; MUX_MAX_INPUTS]
    }

    fn set_active(&mut self, phase: PhaseIndex, active: bool) {
        self.phases.set_active(phase, active);
    }

    fn is_active(&self, phase: PhaseIndex) -> bool {
        self.phases.is_active(phase)
    }

    #[cfg(feature = "diagnostics")]
    fn dump(&self, id: NodeId, hw: &mut dyn Hal) {
        let cfg = hw.read(self.regs.cfg).unwrap_or(0);
        let coeff = hw.read(self.regs.coeff).unwrap_or(0);
        log::debug!(
            "{} sppll {:?} cfg={:#010x} coeff={:#010x} -> {} kHz: {:?}",
            id,
            self.source,
            cfg,
            coeff,
            self.signal.freq_khz,
            self.phases
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, NodeId};
    use crate::signal::FreqRange;
    use crate::sim::SimHal;

    const REGS: PllRegs = PllRegs {
        cfg: 0x300,
        coeff: 0x304,
    };

    fn running(hw: &mut SimHal) -> [Node; 1] {
        hw.set_reg(REGS.cfg, (PllCfg::ENABLE | PllCfg::LOCK).bits());
        hw.set_reg(REGS.coeff, Coeffs { mdiv: 1, ndiv: 30, pldiv: 1 }.encode(0));
        [Node::from(Sppll::new(REGS, 27_000, Source::Sppll0))]
    }

    #[test]
    fn reads_coefficients() {
        let mut hw = SimHal::new();
        let mut nodes = running(&mut hw);
        let mut graph = Graph::new(&mut nodes, &mut hw);
        let signal = graph.read(NodeId(0), true).unwrap();
        assert_eq!(signal, Signal::new(810_000, Source::Sppll0));

        hw.set_reg(REGS.cfg, PllCfg::IDDQ.bits());
        let mut graph = Graph::new(&mut nodes, &mut hw);
        assert_eq!(graph.read(NodeId(0), true).unwrap().freq_khz, 0);
    }

    #[test]
    fn config_only_checks() {
        let mut hw = SimHal::new();
        let mut nodes = running(&mut hw);
        let mut graph = Graph::new(&mut nodes, &mut hw);
        graph.read(NodeId(0), true).unwrap();

        let ok = TargetSignal::new(810_000, FreqRange::tolerance(810_000, 5)).with_source(Source::Sppll0);
        assert!(graph.config(NodeId(0), &ok, 1, true).is_ok());
        let wrong = ok.with_source(Source::Sppll1);
        assert_eq!(graph.config(NodeId(0), &wrong, 1, true), Err(Error::InvalidSource));
        let far = TargetSignal::new(700_000, FreqRange::tolerance(700_000, 5));
        assert_eq!(graph.config(NodeId(0), &far, 1, true), Err(Error::UnsupportedFrequency));

        graph.program(NodeId(0), 1).unwrap();
        graph.cleanup(NodeId(0), false).unwrap();
        assert!(hw.writes().is_empty());
    }
}
