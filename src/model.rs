//! Core data model for pomo.
//!
//! A cycle is one timed focus session. The store state is the ordered cycle
//! history plus a pointer to the cycle that is currently running.

mod cycle;
mod state;

pub use cycle::{Cycle, CycleId, CycleStatus};
pub use state::CyclesState;
