/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Register access.
//!
//! The engine only needs 32-bit word reads and writes plus a busy-wait delay.
//! Firmware provides them through [`RegisterBus`] and an `embedded-hal`
//! delay; [`Hardware`] bundles both behind the object-safe [`Hal`] trait the
//! nodes call.

use crate::hal::blocking::delay::DelayUs;
use crate::Error;

/// Bit field of a 32-bit register.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Field {
    pub lsb: u8,
    pub width: u8,
}

impl Field {
    pub const fn new(lsb: u8, width: u8) -> Self {
        Field { lsb, width }
    }

    pub const fn mask(&self) -> u32 {
        if self.width >= 32 {
            u32::MAX
        } else {
            ((1u32 << self.width) - 1) << self.lsb
        }
    }

    pub const fn max(&self) -> u32 {
        self.mask() >> self.lsb
    }

    pub const fn get(&self, word: u32) -> u32 {
        (word & self.mask()) >> self.lsb
    }

    /// Returns `word` with the field replaced by `value` (truncated).
    pub const fn set(&self, word: u32, value: u32) -> u32 {
        (word & !self.mask()) | ((value << self.lsb) & self.mask())
    }

    /// Reads the field as a two's complement signed value. An empty field
    /// reads as 0.
    pub const fn get_signed(&self, word: u32) -> i32 {
        if self.width == 0 {
            return 0;
        }
        if self.width >= 32 {
            return self.get(word) as i32;
        }
        let shift = 32 - self.width as u32;
        ((self.get(word) << shift) as i32) >> shift
    }

    pub const fn set_signed(&self, word: u32, value: i32) -> u32 {
        self.set(word, value as u32)
    }
}

/// Raw 32-bit register bus.
pub trait RegisterBus {
    type Error;

    fn read_word(&mut self, addr: u32) -> Result<u32, Self::Error>;
    fn write_word(&mut self, addr: u32, value: u32) -> Result<(), Self::Error>;
}

/// What clock nodes need from the platform.
pub trait Hal {
    fn read(&mut self, addr: u32) -> Result<u32, Error>;
    fn write(&mut self, addr: u32, value: u32) -> Result<(), Error>;
    fn delay_us(&mut self, us: u32);

    /// Read-modify-write: clears `clear`, then sets `set`.
    fn modify(&mut self, addr: u32, clear: u32, set: u32) -> Result<u32, Error> {
        let value = (self.read(addr)? & !clear) | set;
        self.write(addr, value)?;
        Ok(value)
    }

    fn read_field(&mut self, addr: u32, field: Field) -> Result<u32, Error> {
        Ok(field.get(self.read(addr)?))
    }

    fn write_field(&mut self, addr: u32, field: Field, value: u32) -> Result<(), Error> {
        let word = self.read(addr)?;
        self.write(addr, field.set(word, value))
    }
}

/// Spins until `done` returns true or `budget_us` has elapsed, checking
/// every `interval_us`. Returns whether `done` was observed.
pub fn poll<F>(hw: &mut dyn Hal, budget_us: u32, interval_us: u32, mut done: F) -> Result<bool, Error>
where
    F: FnMut(&mut dyn Hal) -> Result<bool, Error>,
{
    let mut waited = 0;
    loop {
        if done(hw)? {
            return Ok(true);
        }
        if waited >= budget_us {
            return Ok(false);
        }
        hw.delay_us(interval_us);
        waited += interval_us.max(1);
    }
}

fn bus_error<E>(_: E) -> Error {
    Error::CommunicationError
}

/// Register bus plus delay provider.
pub struct Hardware<B, D> {
    bus: B,
    delay: D,
}

impl<B, D> Hardware<B, D>
where
    B: RegisterBus,
    D: DelayUs<u32>,
{
    pub fn new(bus: B, delay: D) -> Self {
        Hardware { bus, delay }
    }

    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }
}

impl<B, D> Hal for Hardware<B, D>
where
    B: RegisterBus,
    D: DelayUs<u32>,
{
    fn read(&mut self, addr: u32) -> Result<u32, Error> {
        self.bus.read_word(addr).map_err(bus_error)
    }

    fn write(&mut self, addr: u32, value: u32) -> Result<(), Error> {
        self.bus.write_word(addr, value).map_err(bus_error)
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}
