//! Cycle store snapshots: one versioned slot holding the whole state.
//!
//! # File Format
//!
//! The slot holds the state record as-is. The record's layout version lives
//! in the slot key, so a layout change moves to a new key and old slots are
//! simply not read.
//!
//! ```json
//! {
//!   "cycles": [
//!     { "id": "1700000000000", "task": "write spec", "minutesAmount": 25,
//!       "startDate": "2023-11-14T22:13:20Z", "finishedDate": "..." }
//!   ],
//!   "activeCycleId": null
//! }
//! ```
//!
//! Loading never fails: a missing, empty, unparsable, or invariant-violating
//! snapshot is treated as absent and logged.

use crate::model::CyclesState;

use super::{Result, Storage};

/// Slot key for the cycle store. The suffix is the record layout version.
pub const CYCLES_STATE_KEY: &str = "cycles-state-1.0.0";

/// Durable home for cycle store snapshots.
pub trait Snapshots {
    /// Returns the last saved state, or `None` if there is nothing usable.
    fn load(&self) -> Option<CyclesState>;

    /// Replaces the saved state.
    fn save(&self, state: &CyclesState) -> Result<()>;
}

impl Snapshots for Storage {
    fn load(&self) -> Option<CyclesState> {
        let contents = match self.read_slot(CYCLES_STATE_KEY) {
            Ok(Some(contents)) => contents,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!(error = %e, "failed to read cycle snapshot, starting empty");
                return None;
            }
        };
        decode(&contents)
    }

    fn save(&self, state: &CyclesState) -> Result<()> {
        let json = encode(state)?;
        self.write_slot(CYCLES_STATE_KEY, &json)?;
        tracing::debug!(cycles = state.cycles.len(), "cycle snapshot saved");
        Ok(())
    }
}

/// Serializes `state` as the slot's record.
pub(crate) fn encode(state: &CyclesState) -> Result<String> {
    Ok(serde_json::to_string_pretty(state)?)
}

/// Parses a snapshot, returning `None` for anything unusable.
pub(crate) fn decode(contents: &str) -> Option<CyclesState> {
    if contents.trim().is_empty() {
        tracing::warn!("empty cycle snapshot, starting empty");
        return None;
    }

    let state = match serde_json::from_str::<CyclesState>(contents) {
        Ok(state) => state,
        Err(e) => {
            tracing::warn!(error = %e, "malformed cycle snapshot, starting empty");
            return None;
        }
    };

    if let Err(violation) = state.validate() {
        tracing::warn!(%violation, "cycle snapshot breaks store invariants, starting empty");
        return None;
    }

    Some(state)
}

/// In-memory snapshots for exercising the lifecycle without a filesystem.
#[cfg(test)]
#[derive(Debug, Default)]
pub struct MemorySnapshots {
    saved: std::cell::RefCell<Option<String>>,
    pub(crate) saves: std::cell::Cell<usize>,
}

#[cfg(test)]
impl MemorySnapshots {
    pub fn with_state(state: &CyclesState) -> Self {
        let snapshots = Self::default();
        *snapshots.saved.borrow_mut() = Some(encode(state).unwrap());
        snapshots
    }
}

#[cfg(test)]
impl Snapshots for MemorySnapshots {
    fn load(&self) -> Option<CyclesState> {
        self.saved.borrow().as_deref().and_then(decode)
    }

    fn save(&self, state: &CyclesState) -> Result<()> {
        *self.saved.borrow_mut() = Some(encode(state)?);
        self.saves.set(self.saves.get() + 1);
        Ok(())
    }
}
