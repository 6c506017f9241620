/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
use super::xtal::check_leaf;
use super::{ClockNode, Graph, Inputs, NodeId, Wire};
use crate::phase::{check_phase, ActivePhase, PhaseIndex, Phases};
#[cfg(feature = "diagnostics")]
use crate::regs::Hal;
use crate::signal::{Signal, Source, TargetSignal};
use crate::Error;

/// Marks a subtree owned by someone else.
///
/// `read` walks the input so the observed frequency is known. `config` only
/// checks that frequency against the target and never recurses, so nothing
/// upstream is ever reprogrammed or powered down through this node.
#[derive(Debug)]
pub struct ReadOnly {
    wire: Wire,
    signal: Signal,
    phases: Phases<ActivePhase>,
}

impl ReadOnly {
    pub fn new(input: NodeId) -> Self {
        ReadOnly {
            wire: Wire::new(input),
            signal: Signal::new(0, Source::ReadOnly),
            phases: Phases::new(ActivePhase::default()),
        }
    }
}

impl ClockNode for ReadOnly {
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        let input = self.wire.read_input(graph, active)?;
        self.signal = Signal {
            source: Source::ReadOnly,
            ..input
        };
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
        self.wire.inputs()
    }

    fn set_active(&mut self, phase: PhaseIndex, active: bool) {
        self.phases.set_active(phase, active);
    }

    fn is_active(&self, phase: PhaseIndex) -> bool {
        self.phases.is_active(phase)
    }

    #[cfg(feature = "diagnostics")]
    fn dump(&self, id: NodeId, _hw: &mut dyn Hal) {
        log::debug!(
            "{} readonly <- {}: {} kHz {:?}",
            id,
            self.wire.input(),
            self.signal.freq_khz,
            self.phases
        );
    }
}
