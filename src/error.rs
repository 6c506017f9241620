/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
use core::fmt;

/// Status returned by every clock node operation.
///
/// Invariant violations (a slide asked to move mdiv or pldiv, a node
/// re-entered through a cycle) are not represented here: they panic.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Error {
    /// The register bus reported a failure.
    CommunicationError,
    /// Phase index out of range, arena full, or an unknown node id.
    InvalidParameter,
    /// No coefficient or divider combination reaches the requested range.
    UnsupportedFrequency,
    /// The requested path or source cannot be produced by this node.
    InvalidSource,
    /// A PLL failed to lock, or a dynamic ramp failed to finish, in time.
    Timeout,
    /// A hot switch was planned, but its intermediate frequencies leave the
    /// required range. A divider records the plan anyway.
    RangeViolation,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::CommunicationError => write!(f, "register bus error"),
            Self::InvalidParameter => write!(f, "invalid parameter"),
            Self::UnsupportedFrequency => write!(f, "frequency not supported"),
            Self::InvalidSource => write!(f, "invalid source or path"),
            Self::Timeout => write!(f, "hardware timeout"),
            Self::RangeViolation => write!(f, "hot switch leaves the required range"),
        }
    }
}
