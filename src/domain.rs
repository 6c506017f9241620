/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Clock domains and the driver that switches their frequency.

use crate::node::NodeId;
use crate::phase::PHASE_COUNT;
use crate::regs::Hal;
use crate::schematic::Schematic;
use crate::signal::{Signal, TargetSignal};
use crate::Error;

/// Programmable clock domains.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Domain {
    Gpc,
    Xbar,
    Sys,
    Hub,
    Host,
    Disp,
    Util,
    Pwr,
    Nvd,
    Mclk,
}

impl Domain {
    pub const COUNT: usize = 10;

    pub const ALL: [Domain; Domain::COUNT] = [
        Domain::Gpc,
        Domain::Xbar,
        Domain::Sys,
        Domain::Hub,
        Domain::Host,
        Domain::Disp,
        Domain::Util,
        Domain::Pwr,
        Domain::Nvd,
        Domain::Mclk,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Runs `read → config → program → cleanup` on the root of one domain.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FreqDomain {
    domain: Domain,
    root: NodeId,
    hot_switch: bool,
}

impl FreqDomain {
    /// Driver for `domain`, which must have a root in `schematic`.
    ///
    /// Switches are hot by default.
    pub fn new<const N: usize>(schematic: &Schematic<N>, domain: Domain) -> Result<Self, Error> {
        let root = schematic.root(domain).ok_or(Error::InvalidParameter)?;
        Ok(FreqDomain {
            domain,
            root,
            hot_switch: true,
        })
    }

    pub fn with_hot_switch(mut self, hot_switch: bool) -> Self {
        self.hot_switch = hot_switch;
        self
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Current output, as configured in hardware.
    pub fn read<const N: usize>(&self, schematic: &mut Schematic<N>, hw: &mut dyn Hal) -> Result<Signal, Error> {
        schematic.read(self.root, true, hw)
    }

    pub fn set_frequency<const N: usize>(
        &self,
        schematic: &mut Schematic<N>,
        hw: &mut dyn Hal,
        target: &TargetSignal,
    ) -> Result<Signal, Error> {
        self.set_frequency_via(schematic, hw, &[*target])
    }

    /// Switches through `plan`, one phase per entry; the last entry is the
    /// final target.
    ///
    /// A phase that cannot be reached while the output stays live is
    /// configured again as a cold switch.
    pub fn set_frequency_via<const N: usize>(
        &self,
        schematic: &mut Schematic<N>,
        hw: &mut dyn Hal,
        plan: &[TargetSignal],
    ) -> Result<Signal, Error> {
        if plan.is_empty() || plan.len() >= PHASE_COUNT {
            return Err(Error::InvalidParameter);
        }

        let current = schematic.read(self.root, true, hw)?;
        log::debug!("{:?}: {} kHz -> {:?}", self.domain, current.freq_khz, plan);

        let mut signal = current;
        for (index, target) in plan.iter().enumerate() {
            let phase = index + 1;
            signal = match schematic.config(self.root, target, phase, self.hot_switch, hw) {
                Ok(signal) => signal,
                Err(e @ Error::UnsupportedFrequency) | Err(e @ Error::RangeViolation) if self.hot_switch => {
                    log::debug!("{:?} phase {}: {}, switching cold", self.domain, phase, e);
                    schematic.config(self.root, target, phase, false, hw)?
                }
                Err(e) => return Err(e),
            };
        }

        for phase in 1..=plan.len() {
            schematic.program(self.root, phase, hw)?;
        }
        schematic.cleanup(self.root, true, hw)?;
        log::debug!("{:?}: now {} kHz", self.domain, signal.freq_khz);
        Ok(signal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composite::{DivDesc, LinearDivider, LinearDividerDesc, MuxDesc};
    use crate::node::pll::tests::{limits, REGS};
    use crate::node::pll::{Coeffs, PllCfg};
    use crate::node::{Mux, Pll, Xtal};
    use crate::regs::Field;
    use crate::signal::{FreqRange, Path};
    use crate::sim::SimHal;

    fn gpc(hw: &mut SimHal) -> (Schematic<8>, FreqDomain) {
        hw.add_pll(REGS.cfg);
        let mut schematic = Schematic::new();
        let xtal = schematic.add(Xtal::new(27_000)).unwrap();
        let pll = schematic.add(Pll::new(xtal, REGS, limits())).unwrap();
        let div = DivDesc {
            addr: 0x500,
            field: Field::new(0, 6),
            max_div: 62,
        };
        let ldiv = LinearDivider::build(
            &mut schematic,
            &LinearDividerDesc {
                bypass: xtal,
                vco: pll,
                bypass_div: div,
                vco_div: DivDesc { addr: 0x504, ..div },
                mux: MuxDesc {
                    addr: 0x508,
                    field: Field::new(0, 1),
                    glitchy: false,
                },
                mux_values: [0, 1],
            },
        )
        .unwrap();
        schematic.set_root(Domain::Gpc, ldiv.root()).unwrap();
        let domain = FreqDomain::new(&schematic, Domain::Gpc).unwrap();
        (schematic, domain)
    }

    #[test]
    fn domain_needs_a_root() {
        let schematic = Schematic::<1>::new();
        assert_eq!(FreqDomain::new(&schematic, Domain::Sys), Err(Error::InvalidParameter));
        assert_eq!(Domain::ALL.len(), Domain::COUNT);
        assert!(Domain::ALL.iter().enumerate().all(|(i, d)| d.index() == i));
    }

    #[test]
    fn switch_from_reset_and_read_back() {
        let mut hw = SimHal::new();
        let (mut schematic, domain) = gpc(&mut hw);
        assert_eq!(domain.read(&mut schematic, &mut hw).unwrap().freq_khz, 27_000);

        let target = TargetSignal::new(540_000, FreqRange::tolerance(540_000, 5));
        let signal = domain.set_frequency(&mut schematic, &mut hw, &target).unwrap();
        assert!(target.range.contains(signal.freq_khz));
        assert_eq!(domain.read(&mut schematic, &mut hw).unwrap(), signal);
        let cfg = PllCfg::from_bits_truncate(hw.reg(REGS.cfg));
        assert!(cfg.contains(PllCfg::ENABLE | PllCfg::LOCK));

        // Back to the reference: the PLL is no longer needed.
        let target = TargetSignal::new(27_000, FreqRange::exact(27_000));
        domain.set_frequency(&mut schematic, &mut hw, &target).unwrap();
        let cfg = PllCfg::from_bits_truncate(hw.reg(REGS.cfg));
        assert!(cfg.contains(PllCfg::IDDQ));
        assert!(!cfg.contains(PllCfg::ENABLE));
        assert_eq!(domain.read(&mut schematic, &mut hw).unwrap().freq_khz, 27_000);
    }

    #[test]
    fn multi_phase_plan_ends_on_last_target() {
        let mut hw = SimHal::new();
        let (mut schematic, domain) = gpc(&mut hw);
        let start = TargetSignal::new(540_000, FreqRange::tolerance(540_000, 5));
        domain.set_frequency(&mut schematic, &mut hw, &start).unwrap();

        let plan = [
            TargetSignal::new(567_000, FreqRange::tolerance(567_000, 5)),
            TargetSignal::new(594_000, FreqRange::tolerance(594_000, 5)),
        ];
        let signal = domain.set_frequency_via(&mut schematic, &mut hw, &plan).unwrap();
        assert!(plan[1].range.contains(signal.freq_khz));
        assert_eq!(domain.read(&mut schematic, &mut hw).unwrap().freq_khz, signal.freq_khz);
        let coeffs = Coeffs::decode(hw.reg(REGS.coeff));
        assert_eq!(coeffs.output_khz(27_000), 594_000);
        assert_eq!(coeffs.pldiv, 2);
    }

    #[test]
    fn cold_switch_relocks_the_pll() {
        let mut hw = SimHal::new();
        let (mut schematic, domain) = gpc(&mut hw);
        let start = TargetSignal::new(540_000, FreqRange::tolerance(540_000, 5));
        domain.set_frequency(&mut schematic, &mut hw, &start).unwrap();

        hw.clear_writes();
        let cold = domain.with_hot_switch(false);
        let target = TargetSignal::new(594_000, FreqRange::tolerance(594_000, 5));
        let signal = cold.set_frequency(&mut schematic, &mut hw, &target).unwrap();
        assert!(target.range.contains(signal.freq_khz));
        let iddq = PllCfg::IDDQ.bits();
        assert!(hw.writes_to(REGS.cfg).iter().any(|v| v & iddq != 0));
        let cfg = PllCfg::from_bits_truncate(hw.reg(REGS.cfg));
        assert!(cfg.contains(PllCfg::ENABLE | PllCfg::LOCK));
    }

    #[test]
    fn routed_switch_through_glitchy_mux_goes_cold() {
        let mut hw = SimHal::new();
        let mut schematic = Schematic::<4>::new();
        let slow = schematic.add(Xtal::new(27_000)).unwrap();
        let fast = schematic.add(Xtal::new(100_000)).unwrap();
        let select = Field::new(0, 1);
        let mux = schematic
            .add(Mux::new(0x600, select).glitchy().with_input(slow, 0).with_input(fast, 1))
            .unwrap();
        schematic.set_root(Domain::Disp, mux).unwrap();
        let domain = FreqDomain::new(&schematic, Domain::Disp).unwrap();

        let target = TargetSignal::new(100_000, FreqRange::tolerance(100_000, 5))
            .with_path(Path::from_indices(&[1]));
        let signal = domain.set_frequency(&mut schematic, &mut hw, &target).unwrap();
        assert_eq!(signal.freq_khz, 100_000);
        assert_eq!(signal.path.head(), Some(1));
        assert_eq!(select.get(hw.reg(0x600)), 1);
    }

    #[test]
    fn hot_failure_falls_back_to_power_cycle() {
        let mut hw = SimHal::new();
        let (mut schematic, domain) = gpc(&mut hw);
        let start = TargetSignal::new(540_000, FreqRange::tolerance(540_000, 5));
        domain.set_frequency(&mut schematic, &mut hw, &start).unwrap();
        assert_eq!(Coeffs::decode(hw.reg(REGS.coeff)).pldiv, 2);

        // Out of reach with PLDIV held at 2.
        hw.clear_writes();
        let target = TargetSignal::new(1_350_000, FreqRange::tolerance(1_350_000, 5));
        let signal = domain.set_frequency(&mut schematic, &mut hw, &target).unwrap();
        assert_eq!(signal.freq_khz, 1_350_000);
        assert_eq!(
            Coeffs::decode(hw.reg(REGS.coeff)),
            Coeffs {
                mdiv: 1,
                ndiv: 50,
                pldiv: 1
            }
        );
        let iddq = PllCfg::IDDQ.bits();
        assert!(hw.writes_to(REGS.cfg).iter().any(|v| v & iddq != 0));
        let cfg = PllCfg::from_bits_truncate(hw.reg(REGS.cfg));
        assert!(cfg.contains(PllCfg::ENABLE | PllCfg::LOCK));
    }

    #[test]
    fn plan_length_is_bounded() {
        let mut hw = SimHal::new();
        let (mut schematic, domain) = gpc(&mut hw);
        let target = TargetSignal::new(540_000, FreqRange::ANY);
        assert_eq!(
            domain.set_frequency_via(&mut schematic, &mut hw, &[]),
            Err(Error::InvalidParameter)
        );
        assert_eq!(
            domain.set_frequency_via(&mut schematic, &mut hw, &[target; PHASE_COUNT]),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn lock_failure_surfaces() {
        let mut hw = SimHal::new();
        let (mut schematic, domain) = gpc(&mut hw);
        hw.pll_never_locks(REGS.cfg);
        let target = TargetSignal::new(540_000, FreqRange::tolerance(540_000, 5));
        assert_eq!(
            domain.set_frequency(&mut schematic, &mut hw, &target),
            Err(Error::Timeout)
        );
    }
}
