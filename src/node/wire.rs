/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
use super::{single_input, ClockNode, Graph, Inputs, NodeId};
use crate::phase::{check_phase, ActivePhase, PhaseIndex, Phases};
#[cfg(feature = "diagnostics")]
use crate::regs::Hal;
use crate::signal::{Signal, TargetSignal};
use crate::Error;

/// Node with exactly one input that passes everything through.
///
/// PLL-like nodes embed a `Wire` and use its forwarding helpers for the
/// input side of each operation.
#[derive(Debug)]
pub struct Wire {
    input: NodeId,
    phases: Phases<ActivePhase>,
}

impl Wire {
    pub fn new(input: NodeId) -> Self {
        Wire {
            input,
            phases: Phases::new(ActivePhase::default()),
        }
    }

    pub fn input(&self) -> NodeId {
        self.input
    }

    pub fn read_input(&self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        graph.read(self.input, active)
    }

    pub fn config_input(
        &self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error> {
        graph.config(self.input, target, phase, hot_switch)
    }

    pub fn program_input(&self, graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error> {
        graph.program(self.input, phase)
    }

    pub fn cleanup_input(&self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        graph.cleanup(self.input, active)
    }
}

impl ClockNode for Wire {
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        let signal = self.read_input(graph, active)?;
        self.phases.set_all(ActivePhase::default(), active);
        Ok(signal)
    }

    fn config(
        &mut self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error> {
        check_phase(phase)?;
        let signal = self.config_input(graph, target, phase, hot_switch)?;
        self.phases.set(phase, ActivePhase { active: true });
        Ok(signal)
    }

    fn program(&mut self, graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error> {
        check_phase(phase)?;
        self.program_input(graph, phase)
    }

    fn cleanup(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        self.cleanup_input(graph, active)?;
        self.phases.collapse(active);
        Ok(())
    }

    fn inputs(&self) -> Inputs {
        single_input(self.input)
    }

    fn set_active(&mut self, phase: PhaseIndex, active: bool) {
        self.phases.set_active(phase, active);
    }

    fn is_active(&self, phase: PhaseIndex) -> bool {
        self.phases.is_active(phase)
    }

    #[cfg(feature = "diagnostics")]
    fn dump(&self, id: NodeId, _hw: &mut dyn Hal) {
        log::debug!("{} wire <- {}: {:?}", id, self.input, self.phases);
    }
}
