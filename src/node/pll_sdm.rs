/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! PLL with a sigma-delta modulator.
//!
//! The modulator adds a signed fraction to NDIV:
//! `out = input * (NDIV * 8192 + 4096 + SDM_DIN) / (8192 * MDIV * PLDIV)`,
//! so `SDM_DIN = -4096` is the plain integer PLL.

use super::pll::{Coeffs, Pll, PllCfg, PllLimits, PllPhase, PllRegs};
use super::{ClockNode, Graph, Inputs, NodeId};
use crate::phase::{check_phase, PhaseIndex};
use crate::regs::{Field, Hal};
use crate::signal::{FreqRange, Signal, TargetSignal};
use crate::Error;
use core::cmp::Ordering;

pub const SDM_DIN: Field = Field::new(0, 13);
pub const SDM_DIN_MIN: i32 = -4096;
pub const SDM_DIN_MAX: i32 = 4095;
/// SDM units per NDIV step.
pub const SDM_STEP: i64 = 8192;

/// Output of an SDM PLL, truncated to kHz.
pub fn sdm_output_khz(input_khz: u32, coeffs: &Coeffs, sdm_din: i16) -> u32 {
    if coeffs.mdiv == 0 || coeffs.pldiv == 0 {
        return 0;
    }
    let total = sdm_total(coeffs.ndiv, sdm_din);
    if total <= 0 {
        return 0;
    }
    (input_khz as u64 * total as u64 / (SDM_STEP as u64 * coeffs.mdiv as u64 * coeffs.pldiv as u64)) as u32
}

/// NDIV and SDM_DIN as a single count of SDM units.
fn sdm_total(ndiv: u16, sdm_din: i16) -> i64 {
    ndiv as i64 * SDM_STEP + SDM_STEP / 2 + sdm_din as i64
}

/// Brings `sdm` back into the register range by trading whole NDIV steps.
pub fn normalize_sdm(ndiv: i64, sdm: i64, n_bounds: (u16, u16)) -> Result<(u16, i16), Error> {
    let (mut ndiv, mut sdm) = (ndiv, sdm);
    while sdm > SDM_DIN_MAX as i64 {
        sdm -= SDM_STEP;
        ndiv += 1;
    }
    while sdm < SDM_DIN_MIN as i64 {
        sdm += SDM_STEP;
        ndiv -= 1;
    }
    if ndiv < n_bounds.0 as i64 || ndiv > n_bounds.1 as i64 {
        return Err(Error::UnsupportedFrequency);
    }
    Ok((ndiv as u16, sdm as i16))
}

/// Solves NDIV and SDM_DIN for fixed MDIV and PLDIV.
///
/// The exact SDM count is rounded down, then stepped up while it still
/// undershoots `target` and the next count stays in range. The result is
/// split around `coeffs.ndiv`, normalized and checked against the VCO range.
pub fn solve_sdm(
    limits: &PllLimits,
    n_bounds: (u16, u16),
    input_khz: u32,
    coeffs: &Coeffs,
    target: &TargetSignal,
) -> Result<(u16, i16, u32), Error> {
    if input_khz == 0 || coeffs.mdiv == 0 || coeffs.pldiv == 0 {
        return Err(Error::UnsupportedFrequency);
    }
    let input = input_khz as u64;
    let div = SDM_STEP as u64 * coeffs.mdiv as u64 * coeffs.pldiv as u64;
    let freq_of = |total: i64| -> u32 {
        if total <= 0 {
            0
        } else {
            (input * total as u64 / div) as u32
        }
    };

    let mut total = (target.freq_khz as u64 * div / input) as i64;
    for _ in 0..SDM_STEP {
        if freq_of(total) >= target.freq_khz || !target.range.contains(freq_of(total + 1)) {
            break;
        }
        total += 1;
    }
    for _ in 0..SDM_STEP {
        if freq_of(total) <= target.range.max {
            break;
        }
        total -= 1;
    }
    let freq_khz = freq_of(total);
    if !target.range.contains(freq_khz) {
        return Err(Error::UnsupportedFrequency);
    }

    let ndiv = coeffs.ndiv as i64;
    let (ndiv, sdm_din) = normalize_sdm(ndiv, total - ndiv * SDM_STEP - SDM_STEP / 2, n_bounds)?;
    let vco = (input * sdm_total(ndiv, sdm_din) as u64 / (SDM_STEP as u64 * coeffs.mdiv as u64)) as u32;
    if !limits.vco.contains(vco) {
        return Err(Error::UnsupportedFrequency);
    }
    Ok((ndiv, sdm_din, freq_khz))
}

/// SDM_DIN to hold while NDIV slides from `prev` to `next`.
///
/// NDIV and SDM_DIN live in separate registers, so the output takes every
/// NDIV step at the held value. Holding the old value keeps those steps
/// between the two outputs as long as the modulator moves the same way as
/// NDIV. When it moves against NDIV no write order does; the midpoint halves
/// the overshoot.
pub fn slide_sdm(prev: &PllPhase, next: &PllPhase) -> i16 {
    let (from, to) = (prev.sdm_din as i32, next.sdm_din as i32);
    let against = match next.coeffs.ndiv.cmp(&prev.coeffs.ndiv) {
        Ordering::Greater => to < from,
        Ordering::Less => to > from,
        Ordering::Equal => false,
    };
    if against {
        ((from + to) / 2) as i16
    } else {
        prev.sdm_din
    }
}

/// Lowest and highest output reached while programming a hot step.
fn slide_extremes(prev: &PllPhase, next: &PllPhase) -> (u32, u32) {
    let hold = slide_sdm(prev, next);
    let input_khz = next.input_khz;
    let start = sdm_output_khz(input_khz, &prev.coeffs, hold);
    let end = sdm_output_khz(input_khz, &next.coeffs, hold);
    let prev_out = sdm_output_khz(prev.input_khz, &prev.coeffs, prev.sdm_din);
    let next_out = sdm_output_khz(input_khz, &next.coeffs, next.sdm_din);
    let lo = start.min(end).min(prev_out).min(next_out);
    let hi = start.max(end).max(prev_out).max(next_out);
    (lo, hi)
}

/// Fails with `RangeViolation` when sliding to `record` would take the live
/// output outside the previous output and the target range.
fn check_slide(
    pll: &Pll,
    phase: PhaseIndex,
    record: &PllPhase,
    target: &TargetSignal,
) -> Result<(), Error> {
    let prev = *pll.phases().prev(phase);
    let prev_out = sdm_output_khz(prev.input_khz, &prev.coeffs, prev.sdm_din);
    let required = FreqRange::exact(prev_out).hull(&target.range);
    let (lo, hi) = slide_extremes(&prev, record);
    if required.contains(lo) && required.contains(hi) {
        return Ok(());
    }
    log::warn!(
        "pll {:#x}: hot step from {} kHz passes {}..{} kHz",
        pll.regs().cfg,
        prev_out,
        lo,
        hi
    );
    Err(Error::RangeViolation)
}

/// Picks NDIV/SDM_DIN for `phase`, on top of the integer search.
///
/// The integer search runs on a range widened by one NDIV step so that a
/// target between two integer settings still finds its neighbour, then the
/// modulator trims the output into the real range. Shared by the SDM and
/// dynamic-ramp PLLs.
pub(crate) fn resolve_sdm(
    pll: &Pll,
    graph: &mut Graph<'_>,
    target: &TargetSignal,
    phase: PhaseIndex,
    hot_switch: bool,
) -> Result<(PllPhase, Signal), Error> {
    let limits = pll.limits();
    let step = limits.reference.max / limits.min_m.max(1) as u32;
    let widened = TargetSignal {
        range: FreqRange::new(
            target.range.min.saturating_sub(step),
            target.range.max.saturating_add(step),
        ),
        ..*target
    };
    let resolved = pll.resolve(graph, &widened, phase, hot_switch)?;
    let mut record = resolved.record;
    let freq_khz = match solve_sdm(limits, limits.bounds().n, record.input_khz, &record.coeffs, target) {
        Ok((ndiv, sdm_din, freq_khz)) => {
            record.coeffs.ndiv = ndiv;
            record.sdm_din = sdm_din;
            freq_khz
        }
        Err(e) => {
            if !target.range.contains(resolved.freq_khz) {
                return Err(e);
            }
            record.sdm_din = SDM_DIN_MIN as i16;
            resolved.freq_khz
        }
    };
    log::trace!(
        "pll {:#x}: N={} SDM={} = {} kHz",
        pll.regs().cfg,
        record.coeffs.ndiv,
        record.sdm_din,
        freq_khz
    );
    Ok((record, pll.signal(&resolved.input, freq_khz)))
}

/// Reads an SDM PLL; a disabled modulator reads as `SDM_DIN_MIN`.
pub(crate) fn read_sdm(
    pll: &mut Pll,
    sdm_addr: u32,
    graph: &mut Graph<'_>,
    active: bool,
) -> Result<Signal, Error> {
    let (input, mut record, cfg) = pll.read_state(graph, active)?;
    record.sdm_din = if cfg.contains(PllCfg::EN_SDM) {
        SDM_DIN.get_signed(graph.hw().read(sdm_addr)?) as i16
    } else {
        SDM_DIN_MIN as i16
    };
    pll.set_all(record, active);
    let freq_khz = if record.enabled {
        sdm_output_khz(record.input_khz, &record.coeffs, record.sdm_din)
    } else {
        0
    };
    Ok(pll.signal(&input, freq_khz))
}

pub(crate) fn write_sdm(hw: &mut dyn Hal, sdm_addr: u32, sdm_din: i16) -> Result<(), Error> {
    let word = hw.read(sdm_addr)?;
    hw.write(sdm_addr, SDM_DIN.set_signed(word, sdm_din as i32))
}

/// Analog PLL with a sigma-delta modulator.
#[derive(Debug)]
pub struct SdmPll {
    pll: Pll,
    sdm_addr: u32,
}

impl SdmPll {
    pub fn new(input: NodeId, regs: PllRegs, sdm_addr: u32, limits: PllLimits) -> Self {
        SdmPll {
            pll: Pll::new(input, regs, limits),
            sdm_addr,
        }
    }

    /// Adjusts the embedded PLL (source tag, sharing, variable input).
    pub fn map_pll<F: FnOnce(Pll) -> Pll>(mut self, f: F) -> Self {
        self.pll = f(self.pll);
        self
    }

    pub fn phase(&self, phase: PhaseIndex) -> &PllPhase {
        self.pll.phase(phase)
    }
}

impl ClockNode for SdmPll {
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        read_sdm(&mut self.pll, self.sdm_addr, graph, active)
    }

    fn config(
        &mut self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error> {
        check_phase(phase)?;
        let (record, signal) = resolve_sdm(&self.pll, graph, target, phase, hot_switch)?;
        if record.hot {
            check_slide(&self.pll, phase, &record, target)?;
        }
        self.pll.commit(phase, record);
        Ok(signal)
    }

    fn program(&mut self, graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error> {
        check_phase(phase)?;
        self.pll.wire().program_input(graph, phase)?;
        if self.pll.phases().unchanged(phase) {
            return Ok(());
        }
        let record = *self.pll.phase(phase);
        let prev = *self.pll.phases().prev(phase);
        let hw = graph.hw();
        if !record.enabled {
            return self.pll.power_down(hw);
        }
        if record.hot {
            let hold = slide_sdm(&prev, &record);
            if hold != prev.sdm_din {
                write_sdm(hw, self.sdm_addr, hold)?;
            }
            self.pll.slide(hw, &prev, &record)?;
            if hold != record.sdm_din {
                write_sdm(hw, self.sdm_addr, record.sdm_din)?;
            }
            return Ok(());
        }
        let word = SDM_DIN.set_signed(hw.read(self.sdm_addr)?, record.sdm_din as i32);
        self.pll
            .program_cold(hw, &record, Some((self.sdm_addr, word)), PllCfg::EN_SDM)
    }

    fn cleanup(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        self.pll.cleanup_common(graph, active)
    }

    fn inputs(&self) -> Inputs {
        self.pll.inputs()
    }

    fn set_active(&mut self, phase: PhaseIndex, active: bool) {
        self.pll.set_active_flag(phase, active);
    }

    fn is_active(&self, phase: PhaseIndex) -> bool {
        self.pll.is_active(phase)
    }

    #[cfg(feature = "diagnostics")]
    fn dump(&self, id: NodeId, hw: &mut dyn Hal) {
        let sdm = hw.read(self.sdm_addr).map(|w| SDM_DIN.get_signed(w)).ok();
        log::debug!("{} sdm[{:#x}] = {:?}", id, self.sdm_addr, sdm);
        self.pll.dump_regs(id, "pll-sdm", hw);
    }
}
