/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
use super::{ClockNode, Graph, Inputs, MUX_MAX_INPUTS};
#[cfg(feature = "diagnostics")]
use super::NodeId;
use crate::phase::{check_phase, ActivePhase, PhaseIndex, Phases};
#[cfg(feature = "diagnostics")]
use crate::regs::Hal;
use crate::signal::{Signal, Source, TargetSignal};
use crate::Error;

/// Crystal oscillator: a fixed frequency with no registers.
#[derive(Debug)]
pub struct Xtal {
    freq_khz: u32,
    phases: Phases<ActivePhase>,
}

impl Xtal {
    pub fn new(freq_khz: u32) -> Self {
        Xtal {
            freq_khz,
            phases: Phases::new(ActivePhase::default()),
        }
    }

    pub fn freq_khz(&self) -> u32 {
        self.freq_khz
    }
}

/// Checks shared by the leaf nodes: no mux index may be left in the path,
/// the source tag must match and the frequency must be in range.
pub(crate) fn check_leaf(target: &TargetSignal, signal: &Signal) -> Result<(), Error> {
    if target.path.head().is_some() || !signal.source.satisfies(target.source) {
        return Err(Error::InvalidSource);
    }
    if !target.range.contains(signal.freq_khz) || !target.frac.allows(signal.frac) {
        return Err(Error::UnsupportedFrequency);
    }
    Ok(())
}

impl ClockNode for Xtal {
    fn read(&mut self, _graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        self.phases.set_all(ActivePhase::default(), active);
        Ok(Signal::new(self.freq_khz, Source::Xtal))
    }

    fn config(
        &mut self,
        _graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        _hot_switch: bool,
    ) -> Result<Signal, Error> {
        check_phase(phase)?;
        let signal = Signal::new(self.freq_khz, Source::Xtal);
        check_leaf(target, &signal)?;
        self.phases.set(phase, ActivePhase { active: true });
        Ok(signal)
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
    fn dump(&self, id: NodeId, _hw: &mut dyn Hal) {
        log::debug!("{} xtal {} kHz: {:?}", id, self.freq_khz, self.phases);
    }
}
