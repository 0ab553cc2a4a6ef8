//! The cycle store's state value: history plus the active-cycle pointer.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use super::{Cycle, CycleId};

/// Ways a state value can break the store's invariants.
///
/// Only reachable through a hand-edited or corrupted snapshot; the
/// transitions never produce these.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("cycle {0} has both interrupted and finished dates")]
    DoubleTerminal(CycleId),

    #[error("cycle id {0} appears more than once")]
    DuplicateId(CycleId),

    #[error("active cycle {0} does not exist")]
    DanglingActive(CycleId),

    #[error("active cycle {0} has already ended")]
    ActiveIsTerminal(CycleId),
}

/// Ordered cycle history and the id of the running cycle, if any.
///
/// `cycles` is append-only in creation order; entries are only amended by
/// stamping a terminal timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CyclesState {
    pub cycles: Vec<Cycle>,
    pub active_cycle_id: Option<CycleId>,
}

impl CyclesState {
    pub fn find(&self, id: &CycleId) -> Option<&Cycle> {
        self.cycles.iter().find(|c| &c.id == id)
    }

    /// The cycle `active_cycle_id` points at, if it resolves.
    pub fn active_cycle(&self) -> Option<&Cycle> {
        self.active_cycle_id.as_ref().and_then(|id| self.find(id))
    }

    /// Position of the active cycle in `cycles`.
    pub(crate) fn active_index(&self) -> Option<usize> {
        let id = self.active_cycle_id.as_ref()?;
        self.cycles.iter().position(|c| &c.id == id)
    }

    /// Checks the store invariants, returning the first violation found.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let mut seen = HashSet::new();
        for cycle in &self.cycles {
            if cycle.interrupted_date.is_some() && cycle.finished_date.is_some() {
                return Err(InvariantViolation::DoubleTerminal(cycle.id.clone()));
            }
            if !seen.insert(&cycle.id) {
                return Err(InvariantViolation::DuplicateId(cycle.id.clone()));
            }
        }

        if let Some(id) = &self.active_cycle_id {
            let Some(active) = self.find(id) else {
                return Err(InvariantViolation::DanglingActive(id.clone()));
            };
            if active.is_terminal() {
                return Err(InvariantViolation::ActiveIsTerminal(id.clone()));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::Timestamp;

    fn cycle(id: &str) -> Cycle {
        Cycle {
            id: CycleId::from(id),
            task: "task".into(),
            minutes_amount: 25,
            start_date: Timestamp::new(1_700_000_000, 0).unwrap(),
            interrupted_date: None,
            finished_date: None,
        }
    }

    #[test]
    fn empty_state_is_valid() {
        assert_eq!(CyclesState::default().validate(), Ok(()));
    }

    #[test]
    fn active_cycle_resolves_by_id() {
        let state = CyclesState {
            cycles: vec![cycle("1"), cycle("2")],
            active_cycle_id: Some(CycleId::from("2")),
        };
        assert_eq!(state.active_cycle().unwrap().id.as_str(), "2");
        assert_eq!(state.active_index(), Some(1));
        assert_eq!(state.validate(), Ok(()));
    }

    #[test]
    fn dangling_active_id_is_rejected() {
        let state = CyclesState {
            cycles: vec![cycle("1")],
            active_cycle_id: Some(CycleId::from("9")),
        };
        assert!(state.active_cycle().is_none());
        assert!(matches!(
            state.validate(),
            Err(InvariantViolation::DanglingActive(_))
        ));
    }

    #[test]
    fn terminal_active_cycle_is_rejected() {
        let mut ended = cycle("1");
        ended.finished_date = Some(Timestamp::new(1_700_001_500, 0).unwrap());
        let state = CyclesState {
            cycles: vec![ended],
            active_cycle_id: Some(CycleId::from("1")),
        };
        assert!(matches!(
            state.validate(),
            Err(InvariantViolation::ActiveIsTerminal(_))
        ));
    }

    #[test]
    fn double_terminal_and_duplicate_ids_are_rejected() {
        let mut both = cycle("1");
        both.finished_date = Some(Timestamp::new(1_700_001_500, 0).unwrap());
        both.interrupted_date = Some(Timestamp::new(1_700_000_500, 0).unwrap());
        let state = CyclesState {
            cycles: vec![both],
            active_cycle_id: None,
        };
        assert!(matches!(
            state.validate(),
            Err(InvariantViolation::DoubleTerminal(_))
        ));

        let state = CyclesState {
            cycles: vec![cycle("1"), cycle("1")],
            active_cycle_id: None,
        };
        assert!(matches!(
            state.validate(),
            Err(InvariantViolation::DuplicateId(_))
        ));
    }

    #[test]
    fn serializes_null_active_id() {
        let json = serde_json::to_value(CyclesState::default()).unwrap();
        assert!(json["activeCycleId"].is_null());
        assert!(json["cycles"].as_array().unwrap().is_empty());
    }
}
