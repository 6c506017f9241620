/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Clock nodes and the graph they are wired into.
//!
//! Every element of the clock tree implements [`ClockNode`]. Nodes never own
//! each other: they refer to their inputs by [`NodeId`], and [`Graph`]
//! resolves those ids while an operation recurses toward the leaves.

use crate::phase::PhaseIndex;
use crate::regs::Hal;
use crate::signal::{Signal, TargetSignal};
use crate::Error;
use core::mem;

pub mod ldiv;
pub mod mux;
pub mod pll;
pub mod pll_dynramp;
pub mod pll_sdm;
pub mod readonly;
pub mod sppll;
pub mod wire;
pub mod xtal;

pub use self::ldiv::{plan_hot_switch, HotSwitch, HotSwitchPlan, LdivPhase, LdivUnit};
pub use self::mux::{Mux, MuxPhase};
pub use self::pll::{Coeffs, Pll, PllLimits, PllPhase, PllRegs};
pub use self::pll_dynramp::DynRampPll;
pub use self::pll_sdm::SdmPll;
pub use self::readonly::ReadOnly;
pub use self::sppll::Sppll;
pub use self::wire::Wire;
pub use self::xtal::Xtal;

/// Most inputs any node can have.
pub const MUX_MAX_INPUTS: usize = 8;

/// Input slots of a node, indexed like the mux inputs.
pub type Inputs = [Option<NodeId>; MUX_MAX_INPUTS];

/// Index of a node in its [`Schematic`](crate::Schematic).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub u16);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub(crate) fn single_input(input: NodeId) -> Inputs {
    let mut inputs = [None; MUX_MAX_INPUTS];
    inputs[0] = Some(input);
    inputs
}

/// Operations every clock node supports.
pub trait ClockNode {
    /// Determines the hardware state, sets every phase record to it and
    /// returns the signal produced. Phase 0 is marked `active`, later phases
    /// inactive.
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error>;

    /// Finds the best configuration for `phase`, records it for `phase` and
    /// every later phase, and marks the node active for `phase`.
    fn config(
        &mut self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error>;

    /// Writes the registers for `phase`, recursing into the inputs.
    fn program(&mut self, graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error>;

    /// Idles the node unless it is on the final path, then collapses the
    /// phase records to the final one.
    fn cleanup(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error>;

    fn inputs(&self) -> Inputs;

    fn set_active(&mut self, phase: PhaseIndex, active: bool);

    fn is_active(&self, phase: PhaseIndex) -> bool;

    #[cfg(feature = "diagnostics")]
    fn dump(&self, id: NodeId, hw: &mut dyn Hal);
}

/// Every node kind the graph can hold.
pub enum Node {
    /// Empty arena slot, also stands in for a node while it is being operated on.
    Vacant,
    Wire(Wire),
    Mux(Mux),
    LdivUnit(LdivUnit),
    Pll(Pll),
    SdmPll(SdmPll),
    DynRampPll(DynRampPll),
    Xtal(Xtal),
    ReadOnly(ReadOnly),
    Sppll(Sppll),
}

impl Node {
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Vacant => "vacant",
            Node::Wire(_) => "wire",
            Node::Mux(_) => "mux",
            Node::LdivUnit(_) => "ldiv",
            Node::Pll(_) => "pll",
            Node::SdmPll(_) => "pll-sdm",
            Node::DynRampPll(_) => "pll-dynramp",
            Node::Xtal(_) => "xtal",
            Node::ReadOnly(_) => "readonly",
            Node::Sppll(_) => "sppll",
        }
    }

    pub fn is_vacant(&self) -> bool {
        matches!(self, Node::Vacant)
    }

    pub fn as_clock_node(&self) -> Option<&dyn ClockNode> {
        match self {
            Node::Vacant => None,
            Node::Wire(n) => Some(n),
            Node::Mux(n) => Some(n),
            Node::LdivUnit(n) => Some(n),
            Node::Pll(n) => Some(n),
            Node::SdmPll(n) => Some(n),
            Node::DynRampPll(n) => Some(n),
            Node::Xtal(n) => Some(n),
            Node::ReadOnly(n) => Some(n),
            Node::Sppll(n) => Some(n),
        }
    }

    pub fn as_clock_node_mut(&mut self) -> Option<&mut dyn ClockNode> {
        match self {
            Node::Vacant => None,
            Node::Wire(n) => Some(n),
            Node::Mux(n) => Some(n),
            Node::LdivUnit(n) => Some(n),
            Node::Pll(n) => Some(n),
            Node::SdmPll(n) => Some(n),
            Node::DynRampPll(n) => Some(n),
            Node::Xtal(n) => Some(n),
            Node::ReadOnly(n) => Some(n),
            Node::Sppll(n) => Some(n),
        }
    }

    pub fn inputs(&self) -> Inputs {
        self.as_clock_node()
            .map(|node| node.inputs())
            .unwrap_or([None; MUX_MAX_INPUTS])
    }
}

macro_rules! node_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for Node {
                fn from(node: $variant) -> Node {
                    Node::$variant(node)
                }
            }
        )*
    };
}

node_from!(Wire, Mux, LdivUnit, Pll, SdmPll, DynRampPll, Xtal, ReadOnly, Sppll);

/// Mutable view of the node arena plus the hardware, handed to every node
/// operation so it can recurse into its inputs.
pub struct Graph<'a> {
    nodes: &'a mut [Node],
    hw: &'a mut dyn Hal,
}

impl<'a> Graph<'a> {
    pub fn new(nodes: &'a mut [Node], hw: &'a mut dyn Hal) -> Self {
        Graph { nodes, hw }
    }

    pub fn hw(&mut self) -> &mut dyn Hal {
        &mut *self.hw
    }

    /// Takes node `id` out of the arena for the duration of `f`.
    ///
    /// A node is absent from the arena only while one of its own operations
    /// runs, so finding the slot vacant means the wiring has a cycle. An id
    /// past the end of the arena is `InvalidParameter`.
    fn with_node<T, F>(&mut self, id: NodeId, f: F) -> Result<T, Error>
    where
        F: FnOnce(&mut dyn ClockNode, &mut Graph<'a>) -> Result<T, Error>,
    {
        let slot = self.nodes.get_mut(id.index()).ok_or(Error::InvalidParameter)?;
        let mut node = mem::replace(slot, Node::Vacant);
        let result = match node.as_clock_node_mut() {
            Some(clock_node) => f(clock_node, self),
            None => panic!("clock node {} is vacant or re-entered", id),
        };
        self.nodes[id.index()] = node;
        result
    }

    pub fn read(&mut self, id: NodeId, active: bool) -> Result<Signal, Error> {
        self.with_node(id, |node, graph| node.read(graph, active))
    }

    pub fn config(
        &mut self,
        id: NodeId,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error> {
        self.with_node(id, |node, graph| node.config(graph, target, phase, hot_switch))
    }

    pub fn program(&mut self, id: NodeId, phase: PhaseIndex) -> Result<(), Error> {
        self.with_node(id, |node, graph| node.program(graph, phase))
    }

    pub fn cleanup(&mut self, id: NodeId, active: bool) -> Result<(), Error> {
        self.with_node(id, |node, graph| node.cleanup(graph, active))
    }

    pub fn is_active(&self, id: NodeId, phase: PhaseIndex) -> bool {
        self.nodes
            .get(id.index())
            .and_then(|node| node.as_clock_node())
            .map_or(false, |node| node.is_active(phase))
    }

    /// Clears the active flag of `phase` in `id` and everything upstream.
    /// Unknown ids and phases leave the arena untouched.
    pub fn deactivate(&mut self, id: NodeId, phase: PhaseIndex) {
        let _ = self.with_node(id, |node, graph| {
            node.set_active(phase, false);
            for input in node.inputs().iter().flatten() {
                graph.deactivate(*input, phase);
            }
            Ok(())
        });
    }
}
