//! Cycle store transitions.
//!
//! Every transition is a pure function of the current state and a wall-clock
//! reading. Transitions return a new state value instead of mutating in place,
//! and the "nothing is running" cases are no-ops rather than errors.

use jiff::Timestamp;

use crate::model::{Cycle, CycleId, CyclesState};

/// Errors a transition can reject with. Rejection leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("cycle {0} is still running; interrupt it first")]
    CycleAlreadyActive(CycleId),
}

pub type Result<T> = core::result::Result<T, StoreError>;

/// Transitions that act on the active cycle.
///
/// Starting a cycle carries input and can be rejected, so it goes through
/// [`start`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Stamp the active cycle as interrupted.
    Interrupt,

    /// Stamp the active cycle as finished.
    Complete,

    /// Drop the active pointer without stamping anything.
    ClearActive,
}

/// Outcome of applying a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub state: CyclesState,

    /// Whether the transition changed anything.
    pub changed: bool,
}

/// Applies `transition` to `state` as of `now`.
///
/// With nothing running every transition is a no-op, reported through
/// `changed`.
pub fn apply(state: &CyclesState, transition: Transition, now: Timestamp) -> Applied {
    let next = match transition {
        Transition::Interrupt => interrupt(state, now),
        Transition::Complete => complete(state, now),
        Transition::ClearActive => clear_active(state),
    };
    let changed = &next != state;
    Applied {
        state: next,
        changed,
    }
}

/// Starts a new cycle and makes it active.
///
/// Rejects an empty task, a zero duration, or a call while another cycle is
/// still running. Nothing is appended on rejection.
pub fn start(
    state: &CyclesState,
    task: &str,
    minutes_amount: u32,
    now: Timestamp,
) -> Result<(CyclesState, CycleId)> {
    let task = task.trim();
    if task.is_empty() {
        return Err(StoreError::InvalidInput("task must not be empty"));
    }
    if minutes_amount == 0 {
        return Err(StoreError::InvalidInput("minutes must be positive"));
    }
    if let Some(active) = state.active_cycle() {
        return Err(StoreError::CycleAlreadyActive(active.id.clone()));
    }

    let id = CycleId::generate(now, state.cycles.iter().map(|c| &c.id));
    let mut next = state.clone();
    next.cycles.push(Cycle {
        id: id.clone(),
        task: task.to_string(),
        minutes_amount,
        start_date: now,
        interrupted_date: None,
        finished_date: None,
    });
    next.active_cycle_id = Some(id.clone());
    Ok((next, id))
}

/// Stamps `interrupted_date` on the active cycle and clears the pointer.
pub fn interrupt(state: &CyclesState, now: Timestamp) -> CyclesState {
    stamp_active(state, |cycle| cycle.interrupted_date = Some(now))
}

/// Stamps `finished_date` on the active cycle and clears the pointer.
pub fn complete(state: &CyclesState, now: Timestamp) -> CyclesState {
    stamp_active(state, |cycle| cycle.finished_date = Some(now))
}

/// Clears the active pointer without stamping a terminal date.
pub fn clear_active(state: &CyclesState) -> CyclesState {
    if state.active_cycle_id.is_none() {
        return state.clone();
    }
    CyclesState {
        cycles: state.cycles.clone(),
        active_cycle_id: None,
    }
}

/// Amends the active cycle with `stamp` and clears the pointer.
///
/// No-op when there is no active id, it does not resolve, or the cycle it
/// resolves to has already ended.
fn stamp_active(state: &CyclesState, stamp: impl FnOnce(&mut Cycle)) -> CyclesState {
    let Some(index) = state.active_index() else {
        return state.clone();
    };
    if state.cycles[index].is_terminal() {
        return state.clone();
    }

    let mut next = state.clone();
    stamp(&mut next.cycles[index]);
    next.active_cycle_id = None;
    next
}
