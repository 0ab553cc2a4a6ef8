//! Elapsed-time tracking for the active cycle.
//!
//! Elapsed time is always recomputed from two wall-clock readings, never
//! accumulated from tick counts, so a suspended process catches up on its
//! next tick. The tracker owns at most one schedule; arming replaces any
//! previous schedule, and finishing disarms it so completion fires once.

use std::time::Duration;

use jiff::{SignedDuration, Timestamp};

use crate::model::{Cycle, CycleId};

/// How often an armed tracker wants to be polled.
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Whole seconds elapsed since `cycle` started, floored and never negative.
pub fn elapsed_seconds(cycle: &Cycle, now: Timestamp) -> i64 {
    now.duration_since(cycle.start_date).as_secs().max(0)
}

/// Whole seconds left before `cycle` reaches its target, never negative.
pub fn remaining_seconds(cycle: &Cycle, now: Timestamp) -> i64 {
    (cycle.total_seconds() - elapsed_seconds(cycle, now)).max(0)
}

/// What a poll observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing is armed.
    Idle,

    /// Armed, but the next tick is not due yet.
    NotDue,

    /// The cycle is still running with this many seconds elapsed.
    Elapsed { id: CycleId, seconds: i64 },

    /// The cycle reached its target. The tracker has disarmed itself.
    Finished { id: CycleId, seconds: i64 },
}

/// The single armed schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Schedule {
    id: CycleId,
    start: Timestamp,
    target_seconds: i64,
    next_due: Timestamp,
}

#[derive(Debug, Default)]
pub struct Tracker {
    schedule: Option<Schedule>,
}

impl Tracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the tracker for `cycle`, cancelling whatever was armed before.
    ///
    /// The first tick is due immediately so a restored cycle that already ran
    /// out completes on the next poll.
    pub fn arm(&mut self, cycle: &Cycle, now: Timestamp) {
        if let Some(previous) = self.schedule.take() {
            tracing::debug!(cycle = %previous.id, "cancelled previous schedule");
        }
        tracing::debug!(cycle = %cycle.id, target = cycle.total_seconds(), "tracker armed");
        self.schedule = Some(Schedule {
            id: cycle.id.clone(),
            start: cycle.start_date,
            target_seconds: cycle.total_seconds(),
            next_due: now,
        });
    }

    /// Cancels the armed schedule, if any.
    pub fn disarm(&mut self) {
        if let Some(schedule) = self.schedule.take() {
            tracing::debug!(cycle = %schedule.id, "tracker disarmed");
        }
    }

    /// The cycle the tracker is armed for.
    pub fn armed_for(&self) -> Option<&CycleId> {
        self.schedule.as_ref().map(|s| &s.id)
    }

    /// When the next tick is due, or `None` when idle.
    pub fn next_due(&self) -> Option<Timestamp> {
        self.schedule.as_ref().map(|s| s.next_due)
    }

    /// Runs one tick if it is due.
    pub fn poll(&mut self, now: Timestamp) -> Tick {
        let Some(schedule) = self.schedule.as_mut() else {
            return Tick::Idle;
        };
        if now < schedule.next_due {
            return Tick::NotDue;
        }

        let seconds = now.duration_since(schedule.start).as_secs().max(0);
        if seconds >= schedule.target_seconds {
            let id = schedule.id.clone();
            self.schedule = None;
            tracing::debug!(cycle = %id, seconds, "tracker reached target");
            return Tick::Finished { id, seconds };
        }

        schedule.next_due = advance(schedule.next_due, now);
        Tick::Elapsed {
            id: schedule.id.clone(),
            seconds,
        }
    }
}

/// Next deadline after `now`, keeping the armed cadence.
///
/// Missed ticks (for example after a suspend) are skipped, not replayed.
fn advance(due: Timestamp, now: Timestamp) -> Timestamp {
    let interval = SignedDuration::try_from(TICK_INTERVAL).unwrap_or(SignedDuration::from_secs(1));
    let mut next = due.saturating_add(interval).unwrap_or(due);
    if next <= now {
        next = now.saturating_add(interval).unwrap_or(now);
    }
    next
}
