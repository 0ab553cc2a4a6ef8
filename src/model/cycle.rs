//! Cycle types: one timed focus session.

use std::fmt;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Identifier of a cycle.
///
/// Derived from wall-clock milliseconds at creation. Unique within a store,
/// but not guaranteed to sort by start time across clock adjustments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CycleId(String);

impl CycleId {
    /// Builds an id for a cycle started at `now` that collides with none of `existing`.
    ///
    /// When `now` in milliseconds does not exceed the largest numeric id, the
    /// candidate is bumped one past it. If that would overflow, the id falls
    /// back to a suffixed form of the ceiling.
    pub fn generate<'a>(now: Timestamp, existing: impl IntoIterator<Item = &'a CycleId>) -> Self {
        let existing: Vec<&CycleId> = existing.into_iter().collect();
        let candidate = now.as_millisecond();
        let floor = existing.iter().filter_map(|id| id.as_millis()).max();
        let millis = match floor {
            Some(floor) if candidate <= floor => floor.checked_add(1),
            _ => Some(candidate),
        };
        if let Some(millis) = millis {
            return Self(millis.to_string());
        }

        let mut suffix = 1u64;
        loop {
            let id = Self(format!("{}-{suffix}", i64::MAX));
            if !existing.contains(&&id) {
                return id;
            }
            suffix += 1;
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn as_millis(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl From<&str> for CycleId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One focus session: a task label, a requested duration, and its timestamps.
///
/// `start_date` never changes. At most one of the terminal timestamps is ever
/// set, and once set the cycle is not amended again.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cycle {
    pub id: CycleId,
    pub task: String,
    pub minutes_amount: u32,
    pub start_date: Timestamp,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupted_date: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_date: Option<Timestamp>,
}

impl Cycle {
    /// The cycle's status, read purely from which terminal timestamp is set.
    pub fn status(&self) -> CycleStatus {
        if self.finished_date.is_some() {
            CycleStatus::Finished
        } else if self.interrupted_date.is_some() {
            CycleStatus::Interrupted
        } else {
            CycleStatus::Ongoing
        }
    }

    /// Whether a terminal timestamp has been stamped.
    pub fn is_terminal(&self) -> bool {
        self.finished_date.is_some() || self.interrupted_date.is_some()
    }

    /// Target duration in seconds.
    pub fn total_seconds(&self) -> i64 {
        i64::from(self.minutes_amount) * 60
    }
}

/// Where a cycle stands, as shown in the history view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleStatus {
    /// Still running (or left dangling by an escape-hatch clear).
    Ongoing,

    /// Cancelled by the user before the target duration.
    Interrupted,

    /// Ran to the target duration.
    Finished,
}

impl CycleStatus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Ongoing => "Ongoing",
            Self::Interrupted => "Interrupted",
            Self::Finished => "Finished",
        }
    }
}
