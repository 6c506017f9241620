/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Owning arena of clock nodes.

use crate::domain::Domain;
use crate::node::{Graph, Node, NodeId};
use crate::phase::PhaseIndex;
use crate::regs::Hal;
use crate::signal::{Signal, TargetSignal};
use crate::Error;

/// Every clock node of the chip, plus the root node of each domain.
///
/// Nodes can only refer to nodes added before them, so the graph is acyclic
/// by construction.
pub struct Schematic<const N: usize> {
    nodes: [Node; N],
    len: usize,
    roots: [Option<NodeId>; Domain::COUNT],
}

impl<const N: usize> Default for Schematic<N> {
    fn default() -> Self {
        Schematic {
            nodes: core::array::from_fn(|_| Node::Vacant),
            len: 0,
            roots: [None; Domain::COUNT],
        }
    }
}

impl<const N: usize> Schematic<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `node`, whose inputs must already be part of the schematic.
    pub fn add<T: Into<Node>>(&mut self, node: T) -> Result<NodeId, Error> {
        let node = node.into();
        if self.len >= N || node.is_vacant() {
            return Err(Error::InvalidParameter);
        }
        if node.inputs().iter().flatten().any(|input| input.index() >= self.len) {
            return Err(Error::InvalidParameter);
        }
        let id = NodeId(self.len as u16);
        self.nodes[self.len] = node;
        self.len += 1;
        Ok(id)
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes[..self.len].get(id.index())
    }

    pub fn set_root(&mut self, domain: Domain, id: NodeId) -> Result<(), Error> {
        if id.index() >= self.len {
            return Err(Error::InvalidParameter);
        }
        self.roots[domain.index()] = Some(id);
        Ok(())
    }

    pub fn root(&self, domain: Domain) -> Option<NodeId> {
        self.roots[domain.index()]
    }

    /// Removes input `index` of mux `mux` for good.
    pub fn floorsweep(&mut self, mux: NodeId, index: usize) -> Result<(), Error> {
        match self.nodes[..self.len].get_mut(mux.index()) {
            Some(Node::Mux(mux)) => mux.floorsweep(index),
            _ => Err(Error::InvalidParameter),
        }
    }

    fn graph<'a>(&'a mut self, id: NodeId, hw: &'a mut dyn Hal) -> Result<Graph<'a>, Error> {
        if id.index() >= self.len {
            return Err(Error::InvalidParameter);
        }
        Ok(Graph::new(&mut self.nodes[..self.len], hw))
    }

    pub fn read(&mut self, id: NodeId, active: bool, hw: &mut dyn Hal) -> Result<Signal, Error> {
        self.graph(id, hw)?.read(id, active)
    }

    pub fn config(
        &mut self,
        id: NodeId,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
        hw: &mut dyn Hal,
    ) -> Result<Signal, Error> {
        self.graph(id, hw)?.config(id, target, phase, hot_switch)
    }

    pub fn program(&mut self, id: NodeId, phase: PhaseIndex, hw: &mut dyn Hal) -> Result<(), Error> {
        self.graph(id, hw)?.program(id, phase)
    }

    pub fn cleanup(&mut self, id: NodeId, active: bool, hw: &mut dyn Hal) -> Result<(), Error> {
        self.graph(id, hw)?.cleanup(id, active)
    }

    pub fn is_active(&self, id: NodeId, phase: PhaseIndex) -> bool {
        self.node(id)
            .and_then(|node| node.as_clock_node())
            .map_or(false, |node| node.is_active(phase))
    }

    /// Logs every node with its phase records and live registers.
    #[cfg(feature = "diagnostics")]
    pub fn dump(&self, hw: &mut dyn Hal) {
        log::debug!("schematic: {} of {} nodes", self.len, N);
        for (index, node) in self.nodes[..self.len].iter().enumerate() {
            if let Some(node) = node.as_clock_node() {
                node.dump(NodeId(index as u16), hw);
            }
        }
        for (index, root) in self.roots.iter().enumerate() {
            if let Some(root) = root {
                log::debug!("domain {:?} -> {}", Domain::ALL[index], root);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Mux, Wire, Xtal};
    use crate::phase::PHASE_COUNT;
    use crate::regs::Field;
    use crate::sim::SimHal;

    #[test]
    fn add_rejects_forward_references_and_overflow() {
        let mut schematic = Schematic::<2>::new();
        assert!(schematic.is_empty());
        assert_eq!(schematic.add(Wire::new(NodeId(0))), Err(Error::InvalidParameter));
        let xtal = schematic.add(Xtal::new(27_000)).unwrap();
        assert_eq!(schematic.add(Wire::new(NodeId(1))), Err(Error::InvalidParameter));
        let wire = schematic.add(Wire::new(xtal)).unwrap();
        assert_eq!(wire, NodeId(1));
        assert_eq!(schematic.add(Xtal::new(1)), Err(Error::InvalidParameter));
        assert_eq!(schematic.add(Node::Vacant), Err(Error::InvalidParameter));
        assert_eq!(schematic.len(), 2);
    }

    #[test]
    fn roots_and_floorsweeping() {
        let mut hw = SimHal::new();
        let mut schematic = Schematic::<4>::new();
        let a = schematic.add(Xtal::new(27_000)).unwrap();
        let b = schematic.add(Xtal::new(100_000)).unwrap();
        let mux = schematic
            .add(Mux::new(0x10, Field::new(0, 1)).with_input(a, 0).with_input(b, 1))
            .unwrap();

        assert_eq!(schematic.root(Domain::Gpc), None);
        schematic.set_root(Domain::Gpc, mux).unwrap();
        assert_eq!(schematic.root(Domain::Gpc), Some(mux));
        assert_eq!(schematic.set_root(Domain::Sys, NodeId(3)), Err(Error::InvalidParameter));

        assert_eq!(schematic.floorsweep(a, 0), Err(Error::InvalidParameter));
        schematic.floorsweep(mux, 1).unwrap();
        let target = TargetSignal::new(100_000, crate::signal::FreqRange::ANY);
        let signal = schematic.config(mux, &target, 1, false, &mut hw).unwrap();
        assert_eq!(signal.freq_khz, 27_000);
        assert!(schematic.is_active(a, 1));
        assert!(!schematic.is_active(b, 1));
    }

    #[test]
    fn operations_check_the_id() {
        let mut hw = SimHal::new();
        let mut schematic = Schematic::<4>::new();
        schematic.add(Xtal::new(27_000)).unwrap();
        assert_eq!(
            schematic.read(NodeId(2), true, &mut hw),
            Err(Error::InvalidParameter)
        );
        assert_eq!(schematic.program(NodeId(0), 0, &mut hw), Err(Error::InvalidParameter));

        schematic.read(NodeId(0), true, &mut hw).unwrap();
        assert!(schematic.is_active(NodeId(0), 0));
        assert!(!schematic.is_active(NodeId(0), PHASE_COUNT));
        assert!(!schematic.is_active(NodeId(3), 0));
    }

    #[cfg(feature = "diagnostics")]
    #[test]
    fn dump_only_reads() {
        let mut hw = SimHal::new();
        let mut schematic = Schematic::<4>::new();
        let xtal = schematic.add(Xtal::new(27_000)).unwrap();
        schematic.set_root(Domain::Util, xtal).unwrap();
        schematic.dump(&mut hw);
        assert!(hw.writes().is_empty());
    }
}
