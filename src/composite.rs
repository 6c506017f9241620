/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Recurring sub-circuits, built from plain nodes.
//!
//! Builders add their nodes to a [`Schematic`] and remember the ids; the
//! engine only ever sees the individual nodes.

use crate::node::{LdivUnit, Mux, NodeId};
use crate::regs::Field;
use crate::schematic::Schematic;
use crate::Error;

/// Select register of a mux.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MuxDesc {
    pub addr: u32,
    pub field: Field,
    pub glitchy: bool,
}

impl MuxDesc {
    fn build(&self) -> Mux {
        let mux = Mux::new(self.addr, self.field);
        if self.glitchy {
            mux.glitchy()
        } else {
            mux
        }
    }
}

/// Divider register of a linear divider unit.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct DivDesc {
    pub addr: u32,
    pub field: Field,
    /// Largest divider, in half steps.
    pub max_div: u8,
}

impl DivDesc {
    fn build(&self, input: NodeId) -> LdivUnit {
        LdivUnit::new(input, self.addr, self.field, self.max_div)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LinearDividerDesc {
    /// Reference clock feeding the bypass unit.
    pub bypass: NodeId,
    /// PLL output feeding the VCO unit.
    pub vco: NodeId,
    pub bypass_div: DivDesc,
    pub vco_div: DivDesc,
    pub mux: MuxDesc,
    /// Select values of the bypass and VCO inputs.
    pub mux_values: [u32; 2],
}

/// Two divider units, one on the bypass path and one on the VCO path,
/// behind an output mux.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct LinearDivider {
    mux: NodeId,
    units: [NodeId; 2],
}

impl LinearDivider {
    /// Mux input index of the bypass unit.
    pub const BYPASS: u8 = 0;
    /// Mux input index of the VCO unit.
    pub const VCO: u8 = 1;

    pub fn build<const N: usize>(
        schematic: &mut Schematic<N>,
        desc: &LinearDividerDesc,
    ) -> Result<Self, Error> {
        let bypass = schematic.add(desc.bypass_div.build(desc.bypass))?;
        let vco = schematic.add(desc.vco_div.build(desc.vco))?;
        let mux = schematic.add(
            desc.mux
                .build()
                .with_input(bypass, desc.mux_values[0])
                .with_input(vco, desc.mux_values[1]),
        )?;
        Ok(LinearDivider {
            mux,
            units: [bypass, vco],
        })
    }

    pub fn root(&self) -> NodeId {
        self.mux
    }

    /// Bypass and VCO divider units, in mux order.
    pub fn units(&self) -> [NodeId; 2] {
        self.units
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OneSourceDesc<'a> {
    /// Inputs of the source mux with their select values.
    pub sources: &'a [(NodeId, u32)],
    pub source_mux: MuxDesc,
    pub source_div: DivDesc,
    /// Input of the alternate divider, usually the reference clock.
    pub alt: NodeId,
    pub alt_div: DivDesc,
    pub out_mux: MuxDesc,
    /// Select values of the source and alternate paths.
    pub out_values: [u32; 2],
}

/// One-source module: a source mux feeding a divider, a second divider on
/// an alternate input, and an output mux choosing between the two dividers.
///
/// One divider keeps the output alive while the other path is being
/// retuned.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct OneSourceModule {
    source_mux: NodeId,
    source_div: NodeId,
    alt_div: NodeId,
    out_mux: NodeId,
}

impl OneSourceModule {
    pub const SOURCE: u8 = 0;
    pub const ALT: u8 = 1;

    pub fn build<const N: usize>(
        schematic: &mut Schematic<N>,
        desc: &OneSourceDesc<'_>,
    ) -> Result<Self, Error> {
        let source_mux = desc
            .sources
            .iter()
            .fold(desc.source_mux.build(), |mux, &(input, value)| {
                mux.with_input(input, value)
            });
        let source_mux = schematic.add(source_mux)?;
        let source_div = schematic.add(desc.source_div.build(source_mux))?;
        let alt_div = schematic.add(desc.alt_div.build(desc.alt))?;
        let out_mux = schematic.add(
            desc.out_mux
                .build()
                .with_input(source_div, desc.out_values[0])
                .with_input(alt_div, desc.out_values[1]),
        )?;
        Ok(OneSourceModule {
            source_mux,
            source_div,
            alt_div,
            out_mux,
        })
    }

    pub fn root(&self) -> NodeId {
        self.out_mux
    }

    pub fn source_mux(&self) -> NodeId {
        self.source_mux
    }

    pub fn source_div(&self) -> NodeId {
        self.source_div
    }

    pub fn alt_div(&self) -> NodeId {
        self.alt_div
    }
}
