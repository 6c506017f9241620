/*
   Copyright 2018 Ilya Epifanov

   Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
   http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
   http://opensource.org/licenses/MIT>, at your option. This file may not be
   copied, modified, or distributed except according to those terms.
*/
//! Per-node phase records.
//!
//! A frequency switch is planned as a short sequence of phases. Phase 0 is
//! always the hardware state last observed by `read`; the last configured
//! phase is the final target.

use crate::Error;

/// Number of phases a transition can be planned over, phase 0 included.
pub const PHASE_COUNT: usize = 4;

pub type PhaseIndex = usize;

/// Checks that `phase` can be configured or programmed.
pub fn check_phase(phase: PhaseIndex) -> Result<(), Error> {
    if phase == 0 || phase >= PHASE_COUNT {
        Err(Error::InvalidParameter)
    } else {
        Ok(())
    }
}

/// State a node keeps for one phase.
pub trait PhaseRecord: Copy {
    fn active(&self) -> bool;
    fn set_active(&mut self, active: bool);

    /// True when both records describe the same hardware settings, whatever
    /// their active flags.
    fn settings_eq(&self, other: &Self) -> bool;
}

/// Fixed array of phase records.
#[derive(Debug, Copy, Clone)]
pub struct Phases<R> {
    records: [R; PHASE_COUNT],
}

impl<R: PhaseRecord> Phases<R> {
    pub fn new(initial: R) -> Self {
        Phases {
            records: [initial; PHASE_COUNT],
        }
    }

    /// # Panics
    ///
    /// Panics if `phase` is not below `PHASE_COUNT`; node operations check it
    /// with `check_phase` first.
    pub fn get(&self, phase: PhaseIndex) -> &R {
        &self.records[phase]
    }

    /// Record of the phase before `phase`; phase 0 has none and gets itself.
    pub fn prev(&self, phase: PhaseIndex) -> &R {
        &self.records[phase.saturating_sub(1)]
    }

    /// Record of the final phase.
    pub fn last(&self) -> &R {
        &self.records[PHASE_COUNT - 1]
    }

    pub fn iter(&self) -> core::slice::Iter<'_, R> {
        self.records.iter()
    }

    /// Stores `record` for `phase` and every later phase. Later phases keep
    /// their own active flags.
    pub fn set(&mut self, phase: PhaseIndex, record: R) {
        self.records[phase] = record;
        for later in self.records[phase + 1..].iter_mut() {
            let active = later.active();
            *later = record;
            later.set_active(active);
        }
    }

    /// Stores `record` for every phase; only phase 0 carries `active`.
    pub fn set_all(&mut self, record: R, active: bool) {
        for (phase, slot) in self.records.iter_mut().enumerate() {
            *slot = record;
            slot.set_active(phase == 0 && active);
        }
    }

    /// Forgets the intermediate steps: every phase takes the final record.
    pub fn collapse(&mut self, active: bool) {
        let last = *self.last();
        self.set_all(last, active);
    }

    /// Phases past the last one are ignored.
    pub fn set_active(&mut self, phase: PhaseIndex, active: bool) {
        if let Some(record) = self.records.get_mut(phase) {
            record.set_active(active);
        }
    }

    /// Active flag of `phase`; false for phases past the last one.
    pub fn is_active(&self, phase: PhaseIndex) -> bool {
        self.records.get(phase).map_or(false, |record| record.active())
    }

    /// Whether `phase` changes nothing compared to the phase before it.
    pub fn unchanged(&self, phase: PhaseIndex) -> bool {
        self.get(phase).settings_eq(self.prev(phase))
    }
}

/// Record of nodes that keep nothing but the active flag.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ActivePhase {
    pub active: bool,
}

impl PhaseRecord for ActivePhase {
    fn active(&self) -> bool {
        self.active
    }

    fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    fn settings_eq(&self, _other: &Self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
    struct Rec {
        value: u32,
        active: bool,
    }

    impl PhaseRecord for Rec {
        fn active(&self) -> bool {
            self.active
        }
        fn set_active(&mut self, active: bool) {
            self.active = active;
        }
        fn settings_eq(&self, other: &Self) -> bool {
            self.value == other.value
        }
    }

    #[test]
    fn set_propagates_forward_but_not_active() {
        let mut phases = Phases::new(Rec::default());
        phases.set_all(Rec { value: 1, active: false }, true);
        phases.set(1, Rec { value: 7, active: true });

        assert_eq!(*phases.get(0), Rec { value: 1, active: true });
        assert_eq!(*phases.get(1), Rec { value: 7, active: true });
        for phase in 2..PHASE_COUNT {
            assert_eq!(*phases.get(phase), Rec { value: 7, active: false });
        }
    }

    #[test]
    fn phases_past_the_last_are_inactive() {
        let mut phases = Phases::new(Rec::default());
        phases.set_all(Rec { value: 1, active: false }, true);
        assert!(phases.is_active(0));
        assert!(!phases.is_active(PHASE_COUNT));
        phases.set_active(PHASE_COUNT, true);
        assert!(!phases.is_active(PHASE_COUNT));
        assert!(!phases.is_active(PHASE_COUNT - 1));
    }

    #[test]
    fn collapse_takes_final_record() {
        let mut phases = Phases::new(Rec::default());
        phases.set(1, Rec { value: 3, active: true });
        phases.set(2, Rec { value: 4, active: true });
        phases.collapse(true);

        assert_eq!(*phases.get(0), Rec { value: 4, active: true });
        for phase in 1..PHASE_COUNT {
            assert_eq!(*phases.get(phase), Rec { value: 4, active: false });
        }
    }

    #[test]
    fn unchanged_ignores_active() {
        let mut phases = Phases::new(Rec::default());
        phases.set_all(Rec { value: 2, active: false }, true);
        phases.set(1, Rec { value: 2, active: true });
        assert!(phases.unchanged(1));
        phases.set(2, Rec { value: 5, active: true });
        assert!(!phases.unchanged(2));
        assert!(phases.unchanged(3));
    }

    #[test]
    fn phase_bounds() {
        assert_eq!(check_phase(0), Err(Error::InvalidParameter));
        assert_eq!(check_phase(1), Ok(()));
        assert_eq!(check_phase(PHASE_COUNT - 1), Ok(()));
        assert_eq!(check_phase(PHASE_COUNT), Err(Error::InvalidParameter));
    }
}
