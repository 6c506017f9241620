/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
/*!
A platform agnostic clock-tree engine for GPU clock generators, based on the
[`embedded-hal`] traits.

## The Clock Tree

Each clock domain is fed by a small circuit of crystals, multiplexers, linear
dividers and PLLs (some with a sigma-delta modulator or a hardware frequency
ramp). The engine keeps that circuit as a graph of nodes in a [`Schematic`]
and changes a domain's frequency in phases:

* `read` captures what the hardware is doing right now (phase 0),
* `config` plans each following phase, node by node, from the root down,
* `program` writes the registers phase by phase,
* `cleanup` powers down whatever is no longer on the path.

Switches are hot by default: a PLL whose output stays live only moves NDIV,
and a divider picks an intermediate value so the output never leaves the
allowed range while its input moves.

## Usage

Provide register access and a delay:

```no_run
use clkdag::RegisterBus;
use embedded_hal::blocking::delay::DelayUs;

struct Mmio;

impl RegisterBus for Mmio {
    type Error = ();

    fn read_word(&mut self, addr: u32) -> Result<u32, ()> {
        Ok(unsafe { core::ptr::read_volatile(addr as *const u32) })
    }

    fn write_word(&mut self, addr: u32, value: u32) -> Result<(), ()> {
        unsafe { core::ptr::write_volatile(addr as *mut u32, value) };
        Ok(())
    }
}

struct Spin;

impl DelayUs<u32> for Spin {
    fn delay_us(&mut self, _us: u32) {}
}
```

Then wire the clock tree and switch a domain:

```no_run
# use clkdag::RegisterBus;
# use embedded_hal::blocking::delay::DelayUs;
# struct Mmio;
# impl RegisterBus for Mmio {
#     type Error = ();
#     fn read_word(&mut self, _addr: u32) -> Result<u32, ()> { Ok(0) }
#     fn write_word(&mut self, _addr: u32, _value: u32) -> Result<(), ()> { Ok(()) }
# }
# struct Spin;
# impl DelayUs<u32> for Spin { fn delay_us(&mut self, _us: u32) {} }
use clkdag::node::{Mux, Pll, PllLimits, PllRegs, Xtal};
use clkdag::{Domain, Field, FreqDomain, FreqRange, Hardware, Schematic, TargetSignal};

# fn main() -> Result<(), clkdag::Error> {
let mut schematic = Schematic::<8>::new();
let xtal = schematic.add(Xtal::new(27_000))?;
let limits = PllLimits {
    min_m: 1,
    max_m: 1,
    min_n: 20,
    max_n: 255,
    min_pl: 1,
    max_pl: 31,
    vco: FreqRange::new(800_000, 1_620_000),
    update: FreqRange::new(13_000, 38_000),
    reference: FreqRange::new(13_000, 38_000),
};
let regs = PllRegs { cfg: 0x0013_7000, coeff: 0x0013_7004 };
let pll = schematic.add(Pll::new(xtal, regs, limits))?;
let mux = schematic.add(
    Mux::new(0x0013_7100, Field::new(0, 1))
        .with_input(xtal, 0)
        .with_input(pll, 1),
)?;
schematic.set_root(Domain::Gpc, mux)?;

let mut hw = Hardware::new(Mmio, Spin);
let gpc = FreqDomain::new(&schematic, Domain::Gpc)?;
let target = TargetSignal::new(1_080_000, FreqRange::tolerance(1_080_000, 5));
gpc.set_frequency(&mut schematic, &mut hw, &target)?;
# Ok(())
# }
```

With the `diagnostics` feature, `Schematic::dump` logs every node's phase
records and live registers through the `log` facade.

[`embedded-hal`]: https://github.com/japaric/embedded-hal
*/
//#![deny(missing_docs)]
#![no_std]

#[macro_use]
extern crate bitflags;
#[cfg(test)]
extern crate std;

use embedded_hal as hal;

pub mod composite;
pub mod domain;
mod error;
pub mod node;
pub mod phase;
pub mod regs;
pub mod schematic;
pub mod signal;
#[cfg(test)]
mod sim;

pub use crate::composite::{
    DivDesc, LinearDivider, LinearDividerDesc, MuxDesc, OneSourceDesc, OneSourceModule,
};
pub use crate::domain::{Domain, FreqDomain};
pub use crate::error::Error;
pub use crate::node::{ClockNode, Graph, Node, NodeId};
pub use crate::phase::{PhaseIndex, PHASE_COUNT};
pub use crate::regs::{Field, Hal, Hardware, RegisterBus};
pub use crate::schematic::Schematic;
pub use crate::signal::{FracDiv, FreqRange, Path, Signal, Source, TargetSignal};
