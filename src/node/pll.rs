/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Analog PLL.
//!
//! The output is `input * NDIV / (MDIV * PLDIV)`. A configuration is valid
//! when the input lies in the reference range, `input / MDIV` lies in the
//! update range and `input * NDIV / MDIV` lies in the VCO range.
//!
//! A PLL that stays on the live path while its output changes (a hot switch)
//! keeps MDIV and PLDIV and slides NDIV one step at a time. Anything else is
//! a cold switch: power down, write the coefficients, power up and wait for
//! lock.

use super::{ClockNode, Graph, Inputs, NodeId, Wire};
use crate::phase::{check_phase, PhaseIndex, PhaseRecord, Phases};
use crate::regs::{poll, Field, Hal};
use crate::signal::{FracDiv, FreqRange, Signal, Source, TargetSignal};
use crate::Error;

bitflags! {
    /// PLL configuration and status register.
    pub struct PllCfg: u32 {
        const ENABLE = 1 << 0;
        const IDDQ = 1 << 1;
        const SYNC_MODE = 1 << 2;
        const EN_LCKDET = 1 << 4;
        const EN_SDM = 1 << 8;
        const EN_DYNRAMP = 1 << 9;
        const LOCK = 1 << 17;
        const DYNRAMP_DONE = 1 << 24;
    }
}

pub const MDIV: Field = Field::new(0, 8);
pub const NDIV: Field = Field::new(8, 8);
pub const PLDIV: Field = Field::new(16, 6);

/// Wait after powering down, before touching the coefficients.
pub const PLL_SETTLE_DELAY_US: u32 = 5;
/// Lock budget of one attempt.
pub const PLL_LOCK_TIMEOUT_US: u32 = 300;
pub const PLL_LOCK_POLL_US: u32 = 1;
/// Lock attempts, the first one included, before giving up.
pub const PLL_LOCK_RETRIES: u32 = 3;
/// Wait after each NDIV step of a slide.
pub const PLL_SLIDE_STEP_DELAY_US: u32 = 1;

/// Register addresses of one PLL.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PllRegs {
    pub cfg: u32,
    pub coeff: u32,
}

/// Coefficient and frequency limits from the chip's PLL table.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PllLimits {
    pub min_m: u16,
    pub max_m: u16,
    pub min_n: u16,
    pub max_n: u16,
    pub min_pl: u16,
    pub max_pl: u16,
    pub vco: FreqRange,
    pub update: FreqRange,
    pub reference: FreqRange,
}

impl PllLimits {
    pub fn bounds(&self) -> CoeffBounds {
        CoeffBounds {
            m: (self.min_m.max(1), self.max_m),
            n: (self.min_n, self.max_n),
            pl: (self.min_pl.max(1), self.max_pl),
        }
    }

    /// `input / m` within the update range, without rounding.
    fn update_ok(&self, input_khz: u64, m: u64) -> bool {
        self.update.min as u64 * m <= input_khz && input_khz <= self.update.max as u64 * m
    }
}

/// Inclusive search ranges for the three coefficients.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct CoeffBounds {
    pub m: (u16, u16),
    pub n: (u16, u16),
    pub pl: (u16, u16),
}

impl CoeffBounds {
    /// Pins MDIV and PLDIV to `coeffs`, leaving only NDIV free.
    pub fn hold(self, coeffs: &Coeffs) -> Self {
        CoeffBounds {
            m: (coeffs.mdiv, coeffs.mdiv),
            pl: (coeffs.pldiv, coeffs.pldiv),
            ..self
        }
    }
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct Coeffs {
    pub mdiv: u16,
    pub ndiv: u16,
    pub pldiv: u16,
}

impl Coeffs {
    pub fn decode(word: u32) -> Self {
        Coeffs {
            mdiv: MDIV.get(word) as u16,
            ndiv: NDIV.get(word) as u16,
            pldiv: PLDIV.get(word) as u16,
        }
    }

    pub fn encode(&self, word: u32) -> u32 {
        let word = MDIV.set(word, self.mdiv as u32);
        let word = NDIV.set(word, self.ndiv as u32);
        PLDIV.set(word, self.pldiv as u32)
    }

    pub fn output_khz(&self, input_khz: u32) -> u32 {
        if self.mdiv == 0 || self.pldiv == 0 {
            return 0;
        }
        (input_khz as u64 * self.ndiv as u64 / (self.mdiv as u64 * self.pldiv as u64)) as u32
    }

    pub fn vco_khz(&self, input_khz: u32) -> u32 {
        if self.mdiv == 0 {
            return 0;
        }
        (input_khz as u64 * self.ndiv as u64 / self.mdiv as u64) as u32
    }
}

/// Per-phase PLL state.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct PllPhase {
    pub coeffs: Coeffs,
    /// Sigma-delta correction; only meaningful for SDM capable PLLs.
    pub sdm_din: i16,
    pub input_khz: u32,
    pub enabled: bool,
    /// Reached by a hot switch: MDIV and PLDIV equal the previous phase.
    pub hot: bool,
    pub active: bool,
}

impl PhaseRecord for PllPhase {
    fn active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn settings_eq(&self, other: &Self) -> bool {
        self.coeffs == other.coeffs && self.sdm_din == other.sdm_din && self.enabled == other.enabled
    }
}

fn div_ceil(num: u64, den: u64) -> u64 {
    (num + den - 1) / den
}

fn delta(a: u32, b: u32) -> u32 {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/// Finds the coefficients closest to `target` for an input that cannot
/// change.
///
/// MDIV is iterated; the NDIV range is narrowed from the VCO range and the
/// output range; PLDIV follows from the VCO to target ratio.
pub fn search_fixed(
    limits: &PllLimits,
    bounds: &CoeffBounds,
    input_khz: u32,
    target: &TargetSignal,
) -> Result<(Coeffs, u32), Error> {
    if input_khz == 0 || !limits.reference.contains(input_khz) {
        return Err(Error::UnsupportedFrequency);
    }
    let input = input_khz as u64;
    let range = target.range;
    let want = target.freq_khz.max(1) as u64;
    let (pl_lo, pl_hi) = (bounds.pl.0.max(1) as u64, bounds.pl.1 as u64);
    let mut best: Option<(u32, Coeffs, u32)> = None;

    for m in bounds.m.0.max(1) as u64..=bounds.m.1 as u64 {
        if !limits.update_ok(input, m) {
            continue;
        }
        let n_lo = div_ceil(limits.vco.min as u64 * m, input)
            .max(div_ceil(range.min as u64 * m * pl_lo, input))
            .max(bounds.n.0 as u64);
        let n_hi = (limits.vco.max as u64 * m / input)
            .min(((range.max as u64 + 1) * m * pl_hi).saturating_sub(1) / input)
            .min(bounds.n.1 as u64);

        for n in n_lo..=n_hi {
            let vco = input * n;
            let pl_floor = vco / (m * want);
            for &pl in [pl_floor, pl_floor + 1].iter() {
                let pl = pl.max(pl_lo).min(pl_hi);
                if pl == 0 {
                    continue;
                }
                let freq = (vco / (m * pl)) as u32;
                if !range.contains(freq) {
                    continue;
                }
                let diff = delta(freq, target.freq_khz);
                if best.map_or(true, |(best_diff, _, _)| diff < best_diff) {
                    let coeffs = Coeffs {
                        mdiv: m as u16,
                        ndiv: n as u16,
                        pldiv: pl as u16,
                    };
                    best = Some((diff, coeffs, freq));
                    if diff == 0 {
                        return Ok((coeffs, freq));
                    }
                }
            }
        }
    }

    best.map(|(_, coeffs, freq)| (coeffs, freq))
        .ok_or(Error::UnsupportedFrequency)
}

/// Last input request of a variable-input search and what it produced.
#[derive(Debug, Default, Copy, Clone)]
struct InputCache {
    last: Option<(TargetSignal, Result<Signal, Error>)>,
}

impl InputCache {
    /// Outcome of `request`; `config` only runs when the requested frequency
    /// differs from the previous request.
    fn lookup<F>(&mut self, request: &TargetSignal, config: F) -> Result<Signal, Error>
    where
        F: FnOnce(&TargetSignal) -> Result<Signal, Error>,
    {
        match self.last {
            Some((cached, result)) if cached.freq_khz == request.freq_khz => result,
            _ => {
                let result = config(request);
                self.last = Some((*request, result));
                result
            }
        }
    }

    /// Whether the input was last configured for exactly `request`.
    fn holds(&self, request: &TargetSignal) -> bool {
        self.last.map_or(false, |(cached, _)| cached == *request)
    }
}

/// Outcome of a coefficient search, before it is recorded.
#[derive(Debug, Copy, Clone)]
pub(crate) struct Resolved {
    pub record: PllPhase,
    pub input: Signal,
    pub freq_khz: u32,
}

/// Analog PLL node.
#[derive(Debug)]
pub struct Pll {
    wire: Wire,
    regs: PllRegs,
    limits: PllLimits,
    source: Source,
    variable_input: bool,
    shared: bool,
    phases: Phases<PllPhase>,
}

impl Pll {
    pub fn new(input: NodeId, regs: PllRegs, limits: PllLimits) -> Self {
        Pll {
            wire: Wire::new(input),
            regs,
            limits,
            source: Source::Pll,
            variable_input: false,
            shared: false,
            phases: Phases::new(PllPhase::default()),
        }
    }

    /// Tag stamped on the signals this PLL produces.
    pub fn with_source(mut self, source: Source) -> Self {
        self.source = source;
        self
    }

    /// The input can be retuned to suit this PLL (chained PLLs).
    pub fn with_variable_input(mut self) -> Self {
        self.variable_input = true;
        self
    }

    /// Used by other domains as well; never powered down by `cleanup`.
    pub fn with_shared(mut self) -> Self {
        self.shared = true;
        self
    }

    pub fn limits(&self) -> &PllLimits {
        &self.limits
    }

    pub fn regs(&self) -> &PllRegs {
        &self.regs
    }

    pub fn phase(&self, phase: PhaseIndex) -> &PllPhase {
        self.phases.get(phase)
    }

    pub(crate) fn phases(&self) -> &Phases<PllPhase> {
        &self.phases
    }

    pub(crate) fn commit(&mut self, phase: PhaseIndex, record: PllPhase) {
        self.phases.set(phase, record);
    }

    pub(crate) fn signal(&self, input: &Signal, freq_khz: u32) -> Signal {
        Signal {
            freq_khz,
            frac: false,
            path: input.path,
            source: self.source,
        }
    }

    /// Whether `config(phase, hot_switch)` must keep the output live.
    pub(crate) fn is_hot(&self, phase: PhaseIndex, hot_switch: bool) -> bool {
        let prev = self.phases.prev(phase);
        hot_switch && prev.active && prev.enabled
    }

    /// Reads the configuration registers and the input. The returned record
    /// carries no active flag.
    pub(crate) fn read_state(
        &self,
        graph: &mut Graph<'_>,
        active: bool,
    ) -> Result<(Signal, PllPhase, PllCfg), Error> {
        let cfg = PllCfg::from_bits_truncate(graph.hw().read(self.regs.cfg)?);
        let coeffs = Coeffs::decode(graph.hw().read(self.regs.coeff)?);
        let enabled = cfg.contains(PllCfg::ENABLE) && !cfg.contains(PllCfg::IDDQ);
        let input = self.wire.read_input(graph, active && enabled)?;
        let record = PllPhase {
            coeffs,
            sdm_din: 0,
            input_khz: input.freq_khz,
            enabled,
            hot: false,
            active: false,
        };
        Ok((input, record, cfg))
    }

    /// Configures the input for the frequency it had in the previous phase.
    pub(crate) fn config_fixed_input(
        &self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error> {
        let prev = self.phases.prev(phase);
        let freq_khz = if prev.input_khz != 0 {
            prev.input_khz
        } else {
            self.limits.reference.min
        };
        let input_target = TargetSignal {
            freq_khz,
            range: self.limits.reference,
            frac: FracDiv::DontCare,
            path: target.path,
            source: Source::Any,
        };
        self.wire.config_input(graph, &input_target, phase, hot_switch)
    }

    /// Runs the coefficient search for `phase` without recording it.
    pub(crate) fn resolve(
        &self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Resolved, Error> {
        if !self.source.satisfies(target.source) {
            return Err(Error::InvalidSource);
        }
        let prev = *self.phases.prev(phase);
        let hot = self.is_hot(phase, hot_switch);
        let mut bounds = self.limits.bounds();
        if hot {
            bounds = bounds.hold(&prev.coeffs);
        }

        if self.variable_input && !hot {
            return self.search_variable(graph, target, phase, &bounds);
        }

        let input = self.config_fixed_input(graph, target, phase, hot_switch)?;
        let (coeffs, freq_khz) = search_fixed(&self.limits, &bounds, input.freq_khz, target)?;
        log::trace!(
            "pll {:#x}: {} kHz -> M={} N={} PL={} = {} kHz{}",
            self.regs.cfg,
            input.freq_khz,
            coeffs.mdiv,
            coeffs.ndiv,
            coeffs.pldiv,
            freq_khz,
            if hot { " (hot)" } else { "" }
        );
        Ok(Resolved {
            record: PllPhase {
                coeffs,
                sdm_din: 0,
                input_khz: input.freq_khz,
                enabled: true,
                hot,
                active: true,
            },
            input,
            freq_khz,
        })
    }

    /// Coefficient search that retunes the input for every candidate.
    ///
    /// The last requested input frequency is cached so that candidates
    /// asking for the same input do not reconfigure it again.
    fn search_variable(
        &self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        bounds: &CoeffBounds,
    ) -> Result<Resolved, Error> {
        let want = target.freq_khz as u64;
        if want == 0 {
            return Err(Error::UnsupportedFrequency);
        }
        let range = target.range;
        let limits = &self.limits;
        let pl_lo = (bounds.pl.0 as u64).max(div_ceil(limits.vco.min as u64, want));
        let pl_hi = (bounds.pl.1 as u64).min(limits.vco.max as u64 / want);

        let mut cache = InputCache::default();
        let mut best: Option<(u32, Coeffs, TargetSignal, Signal, u32)> = None;

        'search: for m in bounds.m.0.max(1) as u64..=bounds.m.1 as u64 {
            for pl in pl_lo.max(1)..=pl_hi {
                let vco = want * pl;
                let n_lo = div_ceil(vco, limits.update.max.max(1) as u64).max(bounds.n.0 as u64);
                let n_hi = (vco / limits.update.min.max(1) as u64).min(bounds.n.1 as u64);
                for n in n_lo.max(1)..=n_hi {
                    let required = (vco * m + n / 2) / n;
                    if !limits.reference.contains(required as u32) {
                        continue;
                    }
                    let input_range = limits.reference.intersect(&FreqRange::new(
                        div_ceil(range.min as u64 * m * pl, n) as u32,
                        ((range.max as u64 * m * pl) / n).min(u32::MAX as u64) as u32,
                    ));
                    if input_range.is_empty() {
                        continue;
                    }
                    let request = TargetSignal {
                        freq_khz: required as u32,
                        range: input_range,
                        frac: FracDiv::DontCare,
                        path: target.path,
                        source: Source::Any,
                    };

                    let result = cache.lookup(&request, |request| {
                        self.wire.config_input(graph, request, phase, false)
                    });
                    let input = match result {
                        Ok(input) => input,
                        Err(_) => continue,
                    };

                    let fin = input.freq_khz as u64;
                    let coeffs = Coeffs {
                        mdiv: m as u16,
                        ndiv: n as u16,
                        pldiv: pl as u16,
                    };
                    if !limits.reference.contains(input.freq_khz)
                        || !limits.update_ok(fin, m)
                        || !limits.vco.contains(coeffs.vco_khz(input.freq_khz))
                    {
                        continue;
                    }
                    let freq = coeffs.output_khz(input.freq_khz);
                    if !range.contains(freq) {
                        continue;
                    }
                    let diff = delta(freq, target.freq_khz);
                    if best.map_or(true, |(best_diff, ..)| diff < best_diff) {
                        best = Some((diff, coeffs, request, input, freq));
                        if diff == 0 {
                            break 'search;
                        }
                    }
                }
            }
        }

        let (_, coeffs, request, mut input, mut freq_khz) = best.ok_or(Error::UnsupportedFrequency)?;
        if !cache.holds(&request) {
            input = self.wire.config_input(graph, &request, phase, false)?;
            freq_khz = coeffs.output_khz(input.freq_khz);
            if !range.contains(freq_khz) {
                return Err(Error::UnsupportedFrequency);
            }
        }
        log::trace!(
            "pll {:#x}: retuned input to {} kHz -> M={} N={} PL={} = {} kHz",
            self.regs.cfg,
            input.freq_khz,
            coeffs.mdiv,
            coeffs.ndiv,
            coeffs.pldiv,
            freq_khz
        );
        Ok(Resolved {
            record: PllPhase {
                coeffs,
                sdm_din: 0,
                input_khz: input.freq_khz,
                enabled: true,
                hot: false,
                active: true,
            },
            input,
            freq_khz,
        })
    }

    /// Disables the PLL and puts it in IDDQ.
    pub(crate) fn power_down(&self, hw: &mut dyn Hal) -> Result<(), Error> {
        hw.modify(
            self.regs.cfg,
            (PllCfg::ENABLE | PllCfg::EN_DYNRAMP).bits(),
            PllCfg::IDDQ.bits(),
        )?;
        Ok(())
    }

    fn is_locked(&self, hw: &mut dyn Hal) -> Result<bool, Error> {
        Ok(PllCfg::from_bits_truncate(hw.read(self.regs.cfg)?).contains(PllCfg::LOCK))
    }

    /// Cold programming: power down, write the coefficients (and `extra`,
    /// an additional register write), power up and wait for lock.
    ///
    /// A PLL that does not lock is power cycled and tried again, up to
    /// `PLL_LOCK_RETRIES` attempts. It is left powered down on failure.
    pub(crate) fn program_cold(
        &self,
        hw: &mut dyn Hal,
        record: &PllPhase,
        extra: Option<(u32, u32)>,
        enable_bits: PllCfg,
    ) -> Result<(), Error> {
        let cfg = self.regs.cfg;
        self.power_down(hw)?;
        hw.delay_us(PLL_SETTLE_DELAY_US);

        let coeff = record.coeffs.encode(hw.read(self.regs.coeff)?);
        hw.write(self.regs.coeff, coeff)?;
        if let Some((addr, value)) = extra {
            hw.write(addr, value)?;
        }

        for attempt in 1..=PLL_LOCK_RETRIES {
            hw.modify(cfg, PllCfg::IDDQ.bits(), 0)?;
            hw.delay_us(PLL_SETTLE_DELAY_US);
            hw.modify(cfg, 0, (PllCfg::ENABLE | PllCfg::EN_LCKDET | enable_bits).bits())?;

            if poll(hw, PLL_LOCK_TIMEOUT_US, PLL_LOCK_POLL_US, |hw| self.is_locked(hw))? {
                log::debug!(
                    "pll {:#x} locked: M={} N={} PL={}",
                    cfg,
                    record.coeffs.mdiv,
                    record.coeffs.ndiv,
                    record.coeffs.pldiv
                );
                return Ok(());
            }

            log::warn!(
                "pll {:#x} did not lock (attempt {} of {})",
                cfg,
                attempt,
                PLL_LOCK_RETRIES
            );
            self.power_down(hw)?;
            hw.delay_us(PLL_SETTLE_DELAY_US);
        }

        log::error!("pll {:#x} lock timeout", cfg);
        Err(Error::Timeout)
    }

    /// Moves NDIV from `from` to `to` one step at a time.
    pub(crate) fn slide(&self, hw: &mut dyn Hal, from: &PllPhase, to: &PllPhase) -> Result<(), Error> {
        assert!(
            from.coeffs.mdiv == to.coeffs.mdiv && from.coeffs.pldiv == to.coeffs.pldiv,
            "pll {:#x}: slide may only move NDIV",
            self.regs.cfg
        );
        let mut ndiv = from.coeffs.ndiv;
        while ndiv != to.coeffs.ndiv {
            if ndiv < to.coeffs.ndiv {
                ndiv += 1;
            } else {
                ndiv -= 1;
            }
            hw.write_field(self.regs.coeff, NDIV, ndiv as u32)?;
            hw.delay_us(PLL_SLIDE_STEP_DELAY_US);
        }
        log::debug!(
            "pll {:#x} slid NDIV {} -> {}",
            self.regs.cfg,
            from.coeffs.ndiv,
            to.coeffs.ndiv
        );
        Ok(())
    }

    /// Shared `cleanup`: powers the PLL down when it is off the final path
    /// and not shared, then collapses the phase records.
    pub(crate) fn cleanup_common(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        let mut last = *self.phases.last();
        let powered = last.enabled || self.phases.get(0).enabled;
        if !active && !self.shared && powered {
            self.power_down(graph.hw())?;
            last.enabled = false;
            log::debug!("pll {:#x} powered down", self.regs.cfg);
        }
        self.wire.cleanup_input(graph, active && last.enabled)?;
        self.phases.set_all(last, active);
        Ok(())
    }

    pub(crate) fn wire(&self) -> &Wire {
        &self.wire
    }

    pub(crate) fn set_active_flag(&mut self, phase: PhaseIndex, active: bool) {
        self.phases.set_active(phase, active);
    }

    pub(crate) fn set_all(&mut self, record: PllPhase, active: bool) {
        self.phases.set_all(record, active);
    }

    #[cfg(feature = "diagnostics")]
    pub(crate) fn dump_regs(&self, id: NodeId, kind: &str, hw: &mut dyn Hal) {
        let cfg = hw.read(self.regs.cfg).unwrap_or(0);
        let coeff = hw.read(self.regs.coeff).unwrap_or(0);
        log::debug!(
            "{} {} cfg[{:#x}]={:#010x} coeff[{:#x}]={:#010x} {:?}",
            id,
            kind,
            self.regs.cfg,
            cfg,
            self.regs.coeff,
            coeff,
            Coeffs::decode(coeff)
        );
        for (phase, record) in self.phases.iter().enumerate() {
            log::debug!("{}   phase {}: {:?}", id, phase, record);
        }
    }
}

impl ClockNode for Pll {
    fn read(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<Signal, Error> {
        let (input, record, _) = self.read_state(graph, active)?;
        self.phases.set_all(record, active);
        let freq_khz = if record.enabled {
            record.coeffs.output_khz(record.input_khz)
        } else {
            0
        };
        Ok(self.signal(&input, freq_khz))
    }

    fn config(
        &mut self,
        graph: &mut Graph<'_>,
        target: &TargetSignal,
        phase: PhaseIndex,
        hot_switch: bool,
    ) -> Result<Signal, Error> {
        check_phase(phase)?;
        let resolved = self.resolve(graph, target, phase, hot_switch)?;
        self.commit(phase, resolved.record);
        Ok(self.signal(&resolved.input, resolved.freq_khz))
    }

    fn program(&mut self, graph: &mut Graph<'_>, phase: PhaseIndex) -> Result<(), Error> {
        check_phase(phase)?;
        self.wire.program_input(graph, phase)?;
        if self.phases.unchanged(phase) {
            return Ok(());
        }
        let record = *self.phases.get(phase);
        let prev = *self.phases.prev(phase);
        let hw = graph.hw();
        if !record.enabled {
            self.power_down(hw)
        } else if record.hot {
            self.slide(hw, &prev, &record)
        } else {
            self.program_cold(hw, &record, None, PllCfg::empty())
        }
    }

    fn cleanup(&mut self, graph: &mut Graph<'_>, active: bool) -> Result<(), Error> {
        self.cleanup_common(graph, active)
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
        self.dump_regs(id, "pll", hw);
    }
}
