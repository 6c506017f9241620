/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Linear divider.
//!
//! Divider values are counted in half steps: `2` divides by one, `3` by one
//! and a half. The register field holds `div - 2`. Odd values produce a
//! fractional (non 50% duty cycle) output.

use super::{ClockNode, Graph, Inputs, NodeId, Wire};
use crate::phase::{check_phase, PhaseIndex, PhaseRecord, Phases};
use crate::regs::{Field, Hal};
use crate::signal::{FracDiv, FreqRange, Signal, TargetSignal};
use crate::Error;

/// Smallest divider value, a plain pass-through.
pub const LDIV_MIN: u8 = 2;

pub fn ldiv_output_khz(input_khz: u32, div: u8) -> u32 {
    if div == 0 {
        return 0;
    }
    (input_khz as u64 * 2 / div as u64) as u32
}

/// Inputs of the hot-switch planner.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HotSwitch {
    pub prev_input_khz: u32,
    pub target_input_khz: u32,
    pub prev_div: u8,
    pub target_div: u8,
    /// Range both intermediate frequencies have to stay in.
    pub required: FreqRange,
    pub max_div: u8,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HotSwitchPlan {
    /// Divider to hold while the input moves.
    pub div: u8,
    /// Whether both intermediate frequencies lie in the required range.
    pub in_range: bool,
}

/// Picks the divider to hold while the input moves from
/// `prev_input_khz` to `target_input_khz`.
///
/// Candidates are the previous and the target divider plus a grid over
/// `LDIV_MIN..=max_div`: every value when both dividers are fractional, the
/// integer ones otherwise. They are ranked by, in order: both intermediate
/// frequencies inside `required`; the worst distance outside the span of the
/// previous and target outputs; being the target divider; being the previous
/// divider; closeness to the midpoint of the two, lower first.
///
/// The best candidate is always returned; `in_range` tells whether it
/// actually honours `required`.
pub fn plan_hot_switch(switch: &HotSwitch) -> HotSwitchPlan {
    let prev_out = ldiv_output_khz(switch.prev_input_khz, switch.prev_div);
    let target_out = ldiv_output_khz(switch.target_input_khz, switch.target_div);
    let span = FreqRange::spanning(prev_out, target_out);
    let fractional = switch.prev_div % 2 == 1 && switch.target_div % 2 == 1;
    let midpoint = switch.prev_div as i32 + switch.target_div as i32;

    let in_range = |div: u8| {
        switch
            .required
            .contains(ldiv_output_khz(switch.prev_input_khz, div))
            && switch
                .required
                .contains(ldiv_output_khz(switch.target_input_khz, div))
    };
    let rank = |div: u8| {
        let before = ldiv_output_khz(switch.prev_input_khz, div);
        let after = ldiv_output_khz(switch.target_input_khz, div);
        (
            !in_range(div),
            span.distance(before).max(span.distance(after)),
            div != switch.target_div,
            div != switch.prev_div,
            (2 * div as i32 - midpoint).abs(),
            div,
        )
    };

    let grid = (LDIV_MIN..=switch.max_div.max(LDIV_MIN)).filter(|div| fractional || div % 2 == 0);
    let div = [switch.prev_div, switch.target_div]
        .iter()
        .copied()
        .filter(|&div| div >= LDIV_MIN)
        .chain(grid)
        .min_by_key(|&div| rank(div))
        .unwrap_or(switch.target_div);

    HotSwitchPlan {
        div,
        in_range: in_range(div),
    }
}

/// Per-phase divider state: `before` is written ahead of the input change,
/// `after` once the input has settled.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LdivPhase {
    pub before: u8,
    pub after: u8,
    pub input_khz: u32,
    pub active: bool,
}

impl Default for LdivPhase {
    fn default() -> Self {
        LdivPhase {
            before: LDIV_MIN,
            after: LDIV_MIN,
            input_khz: 0,
            active: false,
        }
    }
}

impl PhaseRecord for LdivPhase {
    fn active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn settings_eq(&self, other: &Self) -> bool {
        self.before == other.before && self.after == other.after
    }
}

#[derive(Debug)]
pub struct LdivUnit {
    wire: Wire,
    addr: u32,
    field: Field,
    max_div: u8,
    phases: Phases<LdivPhase>,
}

impl LdivUnit {
    pub fn new(input: NodeId, addr: u32, field: Field, max_div: u8) -> Self {
        LdivUnit {
            wire: Wire::new(input),
            addr,
            field,
            max_div: max_div.max(LDIV_MIN),
            phases: Phases::new(LdivPhase::default()),
        }
    }

    pub fn phase(&self, phase: PhaseIndex) -> &LdivPhase {
        self.phases.get(phase)
    }

    /// Divider closest to `target` for an input of `input_khz`.
    fn choose(&self, input_khz: u32, target: &TargetSignal) -> Option<(u8, u32)> {
        let mut best: Option<(u8, u32)> = None;
        for div in LDIV_MIN..=self.max_div {
            if !target.frac.allows(div % 2 == 1) {
                continue;
            }
            let out = ldiv_output_khz(input_khz, div);
            if !target.range.contains(out) {
                continue;
            }
            let delta = if out > target.freq_khz {
                out - target.freq_khz
            } else {
                target.freq_khz - out
            };
            if best.map_or(true, |(_, best_delta)| delta < best_delta) {
                best = Some((div, delta));
            }
        }
        best
    }

    fn write_div(&self, hw: &mut dyn Hal, div: u8) -> Result<(), Error> {
        hw.write_field(self.addr, self.field, (div - LDIV_MIN) as u32)?;
        log::debug!("ldiv {:#x} = {}/2", self.addr, div);
        Ok(())
    }

    fn signal(input: &Signal, div: u8) -> Signal {
        Signal {
            freq_khz: ldiv_output_khz(input.freq_khz, div),
            frac: div % 2 == 1,
            ..*input
        }
    }
}

impl ClockNode for LdivUnit {
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        let input = self.wire.read_input(graph, active)?;
        let div = (graph.hw().read_field(self.addr, self.field)? + LDIV_MIN as u32).min(u8::MAX as u32) as u8;
        self.phases.set_all(
            LdivPhase {
                before: div,
                after: div,
                input_khz: input.freq_khz,
                active: false,
            },
            active,
        );
        Ok(LdivUnit::signal(&input, div))
    }

    fn config(
        &mut self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error> {
        check_phase(phase)?;
        let prev = *self.phases.prev(phase);
        let hot = hot_switch && prev.active;

        let scale = if hot { prev.after } else { LDIV_MIN };
        let input_target = TargetSignal {
            freq_khz: (target.freq_khz as u64 * scale as u64 / 2).min(u32::MAX as u64) as u32,
            range: FreqRange::new(
                target.range.min,
                (target.range.max as u64 * self.max_div as u64 / 2).min(u32::MAX as u64) as u32,
            ),
            frac: FracDiv::DontCare,
            ..*target
        };
        let input = self.wire.config_input(graph, &input_target, phase, hot_switch)?;
        let (div, _) = self
            .choose(input.freq_khz, target)
            .ok_or(Error::UnsupportedFrequency)?;

        if !hot {
            self.phases.set(
                phase,
                LdivPhase {
                    before: prev.after,
                    after: div,
                    input_khz: input.freq_khz,
                    active: true,
                },
            );
            return Ok(LdivUnit::signal(&input, div));
        }

        let prev_out = ldiv_output_khz(prev.input_khz, prev.after);
        let plan = plan_hot_switch(&HotSwitch {
            prev_input_khz: prev.input_khz,
            target_input_khz: input.freq_khz,
            prev_div: prev.after,
            target_div: div,
            required: FreqRange::exact(prev_out).hull(&target.range),
            max_div: self.max_div,
        });
        self.phases.set(
            phase,
            LdivPhase {
                before: plan.div,
                after: div,
                input_khz: input.freq_khz,
                active: true,
            },
        );
        if !plan.in_range {
            log::warn!(
                "ldiv {:#x}: no divider keeps {} -> {} kHz in range, best is {}/2",
                self.addr,
                prev.input_khz,
                input.freq_khz,
                plan.div
            );
            return Err(Error::RangeViolation);
        }
        Ok(LdivUnit::signal(&input, div))
    }

    fn program(&mut self, graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error> {
        check_phase(phase)?;
        if self.phases.unchanged(phase) {
            return self.wire.program_input(graph, phase);
        }
        let record = *self.phases.get(phase);
        let prev = *self.phases.prev(phase);
        if record.before != prev.after {
            self.write_div(graph.hw(), record.before)?;
        }
        self.wire.program_input(graph, phase)?;
        if record.after != record.before {
            self.write_div(graph.hw(), record.after)?;
        }
        Ok(())
    }

    fn cleanup(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        self.wire.cleanup_input(graph, active)?;
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
    fn dump(&self, id: NodeId, hw: &mut dyn Hal) {
        let raw = hw.read_field(self.addr, self.field).ok();
        log::debug!(
            "{} ldiv <- {} [{:#x}] = {:?}: {:?}",
            id,
            self.wire.input(),
            self.addr,
            raw,
            self.phases
        );
    }
}
