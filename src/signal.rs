/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Frequency values exchanged between clock nodes.
//!
//! All frequencies are in kHz.

/// Inclusive frequency range in kHz.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FreqRange {
    pub min: u32,
    pub max: u32,
}

impl FreqRange {
    /// Every representable frequency.
    pub const ANY: FreqRange = FreqRange {
        min: 0,
        max: u32::MAX,
    };

    pub const fn new(min: u32, max: u32) -> Self {
        FreqRange { min, max }
    }

    /// Exactly one frequency.
    pub const fn exact(freq_khz: u32) -> Self {
        FreqRange {
            min: freq_khz,
            max: freq_khz,
        }
    }

    /// `freq_khz` plus or minus `permille` thousandths of it.
    pub fn tolerance(freq_khz: u32, permille: u32) -> Self {
        let delta = (freq_khz as u64 * permille as u64 / 1000) as u32;
        FreqRange {
            min: freq_khz.saturating_sub(delta),
            max: freq_khz.saturating_add(delta),
        }
    }

    /// Smallest range holding both `a` and `b`.
    pub fn spanning(a: u32, b: u32) -> Self {
        FreqRange {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn contains(&self, freq_khz: u32) -> bool {
        self.min <= freq_khz && freq_khz <= self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min > self.max
    }

    pub fn intersect(&self, other: &FreqRange) -> FreqRange {
        FreqRange {
            min: self.min.max(other.min),
            max: self.max.min(other.max),
        }
    }

    pub fn hull(&self, other: &FreqRange) -> FreqRange {
        FreqRange {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// How far `freq_khz` lies outside the range, zero when inside.
    pub fn distance(&self, freq_khz: u32) -> u32 {
        if freq_khz < self.min {
            self.min - freq_khz
        } else if freq_khz > self.max {
            freq_khz - self.max
        } else {
            0
        }
    }
}

/// Fractional divide request carried by a target.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FracDiv {
    Must,
    MayNot,
    DontCare,
}

impl FracDiv {
    pub fn allows(&self, fractional: bool) -> bool {
        match *self {
            FracDiv::Must => fractional,
            FracDiv::MayNot => !fractional,
            FracDiv::DontCare => true,
        }
    }
}

/// Route through the muxes of the graph.
///
/// A stack of 4-bit input indices. The mux closest to the root owns the
/// lowest nibble; `0xF` is an indeterminate entry.
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Path(pub u32);

impl Path {
    pub const INDETERMINATE: u8 = 0xF;

    /// No route preference at any level.
    pub const ANY: Path = Path(u32::MAX);

    /// Builds a path from root-most to leaf-most mux index.
    pub fn from_indices(indices: &[u8]) -> Path {
        indices
            .iter()
            .rev()
            .fold(Path::ANY, |path, &index| path.push(index))
    }

    /// Requested index of the root-most mux, if any.
    pub fn head(&self) -> Option<u8> {
        match (self.0 & 0xF) as u8 {
            Path::INDETERMINATE => None,
            index => Some(index),
        }
    }

    /// The path seen by the input of the root-most mux.
    pub fn tail(&self) -> Path {
        Path((self.0 >> 4) | 0xF000_0000)
    }

    /// Prepends `index` as the new root-most entry.
    pub fn push(&self, index: u8) -> Path {
        Path((self.0 << 4) | (index & 0xF) as u32)
    }
}

impl core::fmt::Debug for Path {
    fn fmt(&self, f: &mut core::fmt::Formatter) -> core::fmt::Result {
        write!(f, "Path({:#010x})", self.0)
    }
}

/// Origin of a signal.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Source {
    /// No preference; never stamped on an achieved signal by a leaf.
    Any,
    Xtal,
    Sppll0,
    Sppll1,
    Pll,
    ReadOnly,
}

impl Source {
    /// Whether a node tagged `self` satisfies a request for `requested`.
    pub fn satisfies(&self, requested: Source) -> bool {
        requested == Source::Any || requested == *self
    }
}

/// What a caller asks a node to produce.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TargetSignal {
    pub freq_khz: u32,
    pub range: FreqRange,
    pub frac: FracDiv,
    pub path: Path,
    pub source: Source,
}

impl TargetSignal {
    /// A target at `freq_khz` accepting anything within `range`, with no
    /// route or source preference.
    pub fn new(freq_khz: u32, range: FreqRange) -> Self {
        TargetSignal {
            freq_khz,
            range,
            frac: FracDiv::DontCare,
            path: Path::ANY,
            source: Source::Any,
        }
    }

    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    pub fn with_frac(mut self, frac: FracDiv) -> Self {
        self.frac = frac;
        self
    }
}

/// What a node produces.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Signal {
    pub freq_khz: u32,
    pub frac: bool,
    pub path: Path,
    pub source: Source,
}

impl Signal {
    pub const fn new(freq_khz: u32, source: Source) -> Self {
        Signal {
            freq_khz,
            frac: false,
            path: Path::ANY,
            source,
        }
    }

    /// Absolute distance to `freq_khz`.
    pub fn delta(&self, freq_khz: u32) -> u32 {
        if self.freq_khz > freq_khz {
            self.freq_khz - freq_khz
        } else {
            freq_khz - self.freq_khz
        }
    }
}
