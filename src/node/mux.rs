/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Input multiplexer.
//!
//! Each logical input index maps to the value the hardware expects in the
//! select field. The route a caller asks for is read from the lowest nibble
//! of the target path; the mux pushes its choice back onto the achieved path.

use super::{ClockNode, Graph, Inputs, NodeId, MUX_MAX_INPUTS};
use crate::phase::{check_phase, PhaseIndex, PhaseRecord, Phases};
use crate::regs::{Field, Hal};
use crate::signal::{Signal, TargetSignal};
use crate::Error;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct MuxPhase {
    pub selected: u8,
    pub active: bool,
}

impl PhaseRecord for MuxPhase {
    fn active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn settings_eq(&self, other: &Self) -> bool {
        self.selected == other.selected
    }
}

#[derive(Debug)]
pub struct Mux {
    addr: u32,
    field: Field,
    glitchy: bool,
    inputs: Inputs,
    values: [u32; MUX_MAX_INPUTS],
    count: usize,
    phases: Phases<MuxPhase>,
}

impl Mux {
    pub fn new(addr: u32, field: Field) -> Self {
        Mux {
            addr,
            field,
            glitchy: false,
            inputs: [None; MUX_MAX_INPUTS],
            values: [0; MUX_MAX_INPUTS],
            count: 0,
            phases: Phases::new(MuxPhase::default()),
        }
    }

    /// The mux glitches when switched, so it may not change input while its
    /// output is live.
    pub fn glitchy(mut self) -> Self {
        self.glitchy = true;
        self
    }

    /// Appends an input selected by writing `value` into the field.
    ///
    /// # Panics
    ///
    /// When the mux already has `MUX_MAX_INPUTS` inputs.
    pub fn with_input(mut self, input: NodeId, value: u32) -> Self {
        assert!(self.count < MUX_MAX_INPUTS, "mux has too many inputs");
        self.inputs[self.count] = Some(input);
        self.values[self.count] = value;
        self.count += 1;
        self
    }

    /// Removes input `index` for good (the block behind it is fused off).
    pub fn floorsweep(&mut self, index: usize) -> Result<(), Error> {
        match self.inputs.get_mut(index) {
            Some(slot) if index < self.count && slot.is_some() => {
                *slot = None;
                Ok(())
            }
            _ => Err(Error::InvalidParameter),
        }
    }

    pub fn phase(&self, phase: PhaseIndex) -> &MuxPhase {
        self.phases.get(phase)
    }

    /// Input selected in `phase`.
    pub fn selected(&self, phase: PhaseIndex) -> Option<NodeId> {
        self.inputs[self.phases.get(phase).selected as usize]
    }

    fn input_at(&self, index: u8) -> Result<NodeId, Error> {
        self.inputs
            .get(index as usize)
            .copied()
            .flatten()
            .ok_or(Error::InvalidSource)
    }

    fn route(signal: Signal, index: u8) -> Signal {
        Signal {
            path: signal.path.push(index),
            ..signal
        }
    }

    fn select(&self, hw: &mut dyn Hal, index: u8) -> Result<(), Error> {
        hw.write_field(self.addr, self.field, self.values[index as usize])?;
        log::debug!("mux {:#x} -> input {}", self.addr, index);
        Ok(())
    }
}

impl ClockNode for Mux {
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        let value = graph.hw().read_field(self.addr, self.field)?;
        let selected = (0..self.count)
            .find(|&i| self.inputs[i].is_some() && self.values[i] == value)
            .ok_or(Error::InvalidSource)? as u8;

        for (index, input) in self.inputs.iter().enumerate() {
            match input {
                Some(input) if index != selected as usize => {
                    graph.read(*input, false)?;
                }
                _ => {}
            }
        }
        let signal = graph.read(self.input_at(selected)?, active)?;

        self.phases.set_all(
            MuxPhase {
                selected,
                active: false,
            },
            active,
        );
        Ok(Mux::route(signal, selected))
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
        let requested = target.path.head();
        let pinned = self.glitchy && hot_switch && prev.active;
        let child = TargetSignal {
            path: target.path.tail(),
            ..*target
        };

        let mut best: Option<(u8, Signal)> = None;
        let mut last_error = Error::InvalidSource;
        let mut tried = [None; MUX_MAX_INPUTS];
        let mut tries = 0;
        let mut held_off = false;

        for index in 0..self.count as u8 {
            if requested.map_or(false, |want| want != index) {
                continue;
            }
            if pinned && prev.selected != index {
                held_off = true;
                continue;
            }
            let input = match self.inputs[index as usize] {
                Some(input) => input,
                None => continue,
            };
            tried[tries] = Some(input);
            tries += 1;
            match graph.config(input, &child, phase, hot_switch) {
                Ok(signal) => {
                    let better = best.map_or(true, |(_, b)| {
                        signal.delta(target.freq_khz) < b.delta(target.freq_khz)
                    });
                    if better {
                        best = Some((index, signal));
                    }
                }
                Err(e) => last_error = e,
            }
        }

        let (selected, mut signal) = match best {
            Some(best) => best,
            // Only a cold switch can reach the inputs held off.
            None if tries == 0 && held_off => return Err(Error::UnsupportedFrequency),
            None => return Err(last_error),
        };

        if tries > 1 {
            // Other candidates may have rewritten nodes shared with the winner.
            for input in tried.iter().flatten() {
                graph.deactivate(*input, phase);
            }
            signal = graph.config(self.input_at(selected)?, &child, phase, hot_switch)?;
        }

        log::trace!(
            "mux {:#x} phase {}: input {} ({} kHz)",
            self.addr,
            phase,
            selected,
            signal.freq_khz
        );
        self.phases.set(
            phase,
            MuxPhase {
                selected,
                active: true,
            },
        );
        Ok(Mux::route(signal, selected))
    }

    fn program(&mut self, graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error> {
        check_phase(phase)?;
        let record = *self.phases.get(phase);
        graph.program(self.input_at(record.selected)?, phase)?;
        if !self.phases.unchanged(phase) {
            self.select(graph.hw(), record.selected)?;
        }
        Ok(())
    }

    fn cleanup(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        let selected = self.phases.last().selected;
        for (index, input) in self.inputs.iter().enumerate() {
            match input {
                Some(input) if index != selected as usize => graph.cleanup(*input, false)?,
                _ => {}
            }
        }
        graph.cleanup(self.input_at(selected)?, active)?;
        self.phases.collapse(active);
        Ok(())
    }

    fn inputs(&self) -> Inputs {
        self.inputs
    }

    fn set_active(&mut self, phase: PhaseIndex, active: bool) {
        self.phases.set_active(phase, active);
    }

    fn is_active(&self, phase: PhaseIndex) -> bool {
        self.phases.is_active(phase)
    }

    #[cfg(feature = "diagnostics")]
    fn dump(&self, id: NodeId, hw: &mut dyn Hal) {
        let value = hw.read_field(self.addr, self.field).ok();
        log::debug!(
            "{} mux{} [{:#x}] = {:?} inputs {:?}: {:?}",
            id,
            if self.glitchy { " (glitchy)" } else { "" },
            self.addr,
            value,
            &self.inputs[..self.count],
            self.phases
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Node, Xtal};
    use crate::phase::PHASE_COUNT;
    use crate::signal::{FreqRange, Path, Source};
    use crate::sim::SimHal;

    const SEL: u32 = 0x40;
    const FIELD: Field = Field::new(4, 2);

    fn tree(mux: Mux) -> [Node; 3] {
        [
            Node::from(Xtal::new(27_000)),
            Node::from(Xtal::new(100_000)),
            Node::from(mux.with_input(NodeId(0), 2).with_input(NodeId(1), 1)),
        ]
    }

    fn mux(nodes: &[Node]) -> &Mux {
        match &nodes[2] {
            Node::Mux(mux) => mux,
            _ => unreachable!(),
        }
    }

    #[test]
    fn picks_closest_input() {
        let mut hw = SimHal::new();
        hw.set_reg(SEL, FIELD.set(0, 2));
        let mut nodes = tree(Mux::new(SEL, FIELD));
        let mut graph = Graph::new(&mut nodes, &mut hw);
        graph.read(NodeId(2), true).unwrap();

        let signal = graph
            .config(NodeId(2), &TargetSignal::new(90_000, FreqRange::ANY), 1, false)
            .unwrap();
        assert_eq!(signal.freq_khz, 100_000);
        assert_eq!(signal.path.head(), Some(1));
        assert!(graph.is_active(NodeId(1), 1));
        assert!(!graph.is_active(NodeId(0), 1));

        graph.program(NodeId(2), 1).unwrap();
        assert_eq!(FIELD.get(hw.reg(SEL)), 1);
    }

    #[test]
    fn honours_requested_path() {
        let mut hw = SimHal::new();
        let mut nodes = tree(Mux::new(SEL, FIELD));
        let mut graph = Graph::new(&mut nodes, &mut hw);
        let target = TargetSignal::new(90_000, FreqRange::ANY).with_path(Path::from_indices(&[0]));
        assert_eq!(graph.config(NodeId(2), &target, 1, false).unwrap().freq_khz, 27_000);

        let target = target.with_path(Path::from_indices(&[5]));
        assert_eq!(graph.config(NodeId(2), &target, 1, false), Err(Error::InvalidSource));
    }

    #[test]
    fn ties_go_to_lower_index() {
        let mut hw = SimHal::new();
        let mut nodes = [
            Node::from(Xtal::new(27_000)),
            Node::from(Mux::new(SEL, FIELD).with_input(NodeId(0), 0).with_input(NodeId(0), 3)),
        ];
        let mut graph = Graph::new(&mut nodes, &mut hw);
        let signal = graph
            .config(NodeId(1), &TargetSignal::new(27_000, FreqRange::ANY), 1, false)
            .unwrap();
        assert_eq!(signal.path.head(), Some(0));
        assert!(graph.is_active(NodeId(0), 1));
    }

    #[test]
    fn reports_last_error_when_nothing_fits() {
        let mut hw = SimHal::new();
        let mut nodes = tree(Mux::new(SEL, FIELD));
        let mut graph = Graph::new(&mut nodes, &mut hw);
        let target = TargetSignal::new(50_000, FreqRange::tolerance(50_000, 5));
        assert_eq!(graph.config(NodeId(2), &target, 1, false), Err(Error::UnsupportedFrequency));
        let target = TargetSignal::new(27_000, FreqRange::ANY).with_source(Source::Pll);
        assert_eq!(graph.config(NodeId(2), &target, 1, false), Err(Error::InvalidSource));
    }

    #[test]
    fn glitchy_mux_stays_put_while_hot() {
        let mut hw = SimHal::new();
        hw.set_reg(SEL, FIELD.set(0, 2));
        let mut nodes = tree(Mux::new(SEL, FIELD).glitchy());
        let mut graph = Graph::new(&mut nodes, &mut hw);
        graph.read(NodeId(2), true).unwrap();

        let target = TargetSignal::new(100_000, FreqRange::tolerance(100_000, 5));
        assert_eq!(graph.config(NodeId(2), &target, 1, true), Err(Error::UnsupportedFrequency));
        let routed = target.with_path(Path::from_indices(&[1]));
        assert_eq!(graph.config(NodeId(2), &routed, 1, true), Err(Error::UnsupportedFrequency));
        let signal = graph.config(NodeId(2), &target, 1, false).unwrap();
        assert_eq!(signal.path.head(), Some(1));
    }

    #[test]
    fn read_maps_selector_back() {
        let mut hw = SimHal::new();
        hw.set_reg(SEL, FIELD.set(0, 1));
        let mut nodes = tree(Mux::new(SEL, FIELD));
        let mut graph = Graph::new(&mut nodes, &mut hw);
        let signal = graph.read(NodeId(2), true).unwrap();
        assert_eq!(signal.freq_khz, 100_000);
        assert!(graph.is_active(NodeId(1), 0));
        assert!(!graph.is_active(NodeId(0), 0));
        for phase in 0..PHASE_COUNT {
            assert_eq!(mux(&nodes).phase(phase).selected, 1);
        }

        hw.set_reg(SEL, FIELD.set(0, 3));
        let mut graph = Graph::new(&mut nodes, &mut hw);
        assert_eq!(graph.read(NodeId(2), true), Err(Error::InvalidSource));
    }

    #[test]
    fn program_skips_unchanged_selector() {
        let mut hw = SimHal::new();
        hw.set_reg(SEL, FIELD.set(0, 1));
        let mut nodes = tree(Mux::new(SEL, FIELD));
        let mut graph = Graph::new(&mut nodes, &mut hw);
        graph.read(NodeId(2), true).unwrap();
        graph
            .config(NodeId(2), &TargetSignal::new(100_000, FreqRange::ANY), 1, false)
            .unwrap();
        graph.program(NodeId(2), 1).unwrap();
        assert!(hw.writes().is_empty());
    }

    #[test]
    fn cleanup_marks_only_final_input() {
        let mut hw = SimHal::new();
        hw.set_reg(SEL, FIELD.set(0, 2));
        let mut nodes = tree(Mux::new(SEL, FIELD));
        let mut graph = Graph::new(&mut nodes, &mut hw);
        graph.read(NodeId(2), true).unwrap();
        graph
            .config(NodeId(2), &TargetSignal::new(100_000, FreqRange::ANY), 1, false)
            .unwrap();
        graph.program(NodeId(2), 1).unwrap();
        graph.cleanup(NodeId(2), true).unwrap();

        assert!(graph.is_active(NodeId(1), 0));
        assert!(!graph.is_active(NodeId(0), 0));
        for phase in 1..PHASE_COUNT {
            assert!(!graph.is_active(NodeId(1), phase));
        }
        assert_eq!(mux(&nodes).selected(0), Some(NodeId(1)));
    }

    #[test]
    fn floorswept_input_is_never_chosen() {
        let mut hw = SimHal::new();
        let mut nodes = tree(Mux::new(SEL, FIELD));
        if let Node::Mux(mux) = &mut nodes[2] {
            mux.floorsweep(1).unwrap();
            assert_eq!(mux.floorsweep(1), Err(Error::InvalidParameter));
            assert_eq!(mux.floorsweep(7), Err(Error::InvalidParameter));
        }
        let mut graph = Graph::new(&mut nodes, &mut hw);
        let signal = graph
            .config(NodeId(2), &TargetSignal::new(100_000, FreqRange::ANY), 1, false)
            .unwrap();
        assert_eq!(signal.freq_khz, 27_000);
    }
}
