//! The lifecycle facade: the one object the CLI talks to.
//!
//! Each operation is a single step from the caller's point of view: apply a
//! store transition, save a snapshot, then re-arm or disarm the tracker, then
//! notify observers. Saving is best effort; a failed write is logged and the
//! in-memory transition still stands.

use jiff::Timestamp;

use crate::model::{Cycle, CycleId, CyclesState};
use crate::storage::Snapshots;
use crate::store::{self, StoreError, Transition};
use crate::tracker::{self, Tick, Tracker};

/// Source of wall-clock readings.
pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Something observers are told about after a step commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(CycleId),
    Interrupted(CycleId),
    Finished(CycleId),
    Cleared(CycleId),
    Elapsed {
        id: CycleId,
        elapsed: i64,
        remaining: i64,
    },
}

type Observer = Box<dyn FnMut(&Event)>;

pub struct Lifecycle<S, C = SystemClock> {
    state: CyclesState,
    tracker: Tracker,
    snapshots: S,
    clock: C,
    observers: Vec<Observer>,
}

impl<S: Snapshots, C: Clock> Lifecycle<S, C> {
    /// Restores the last saved state (or starts empty) and arms the tracker
    /// if a cycle was still running.
    pub fn restore(snapshots: S, clock: C) -> Self {
        let state = snapshots.load().unwrap_or_default();
        tracing::debug!(
            cycles = state.cycles.len(),
            active = state.active_cycle_id.as_ref().map(CycleId::as_str),
            "cycle store restored"
        );
        let mut lifecycle = Self {
            state,
            tracker: Tracker::new(),
            snapshots,
            clock,
            observers: Vec::new(),
        };
        let now = lifecycle.clock.now();
        lifecycle.sync_tracker(now);
        lifecycle
    }

    /// Registers an observer for committed events.
    pub fn subscribe(&mut self, observer: impl FnMut(&Event) + 'static) {
        self.observers.push(Box::new(observer));
    }

    // ── Transitions ──

    /// Starts a new cycle. Rejected if another cycle is still running.
    pub fn start(&mut self, task: &str, minutes_amount: u32) -> Result<CycleId, StoreError> {
        let now = self.clock.now();
        let base = self.state.clone();
        self.begin(&base, task, minutes_amount, now, Vec::new())
    }

    /// Interrupts the running cycle (if any) and starts a new one in one step.
    ///
    /// Validation happens before anything changes, so a rejected start leaves
    /// the running cycle untouched.
    pub fn start_replacing(
        &mut self,
        task: &str,
        minutes_amount: u32,
    ) -> Result<CycleId, StoreError> {
        let now = self.clock.now();
        let previous = self.running_id();
        let base = store::apply(&self.state, Transition::Interrupt, now).state;
        let events = previous.iter().cloned().map(Event::Interrupted).collect();
        let id = self.begin(&base, task, minutes_amount, now, events)?;
        if let Some(previous) = previous {
            tracing::info!(cycle = %previous, replaced_by = %id, "cycle interrupted by new start");
        }
        Ok(id)
    }

    /// Interrupts the running cycle. Returns its id, or `None` if nothing ran.
    pub fn interrupt(&mut self) -> Option<CycleId> {
        let id = self.running_id()?;
        self.step(Transition::Interrupt, Event::Interrupted(id.clone()));
        tracing::info!(cycle = %id, "cycle interrupted");
        Some(id)
    }

    /// Marks the running cycle finished. Returns its id, or `None` if nothing ran.
    pub fn mark_active_complete(&mut self) -> Option<CycleId> {
        let id = self.running_id()?;
        self.step(Transition::Complete, Event::Finished(id.clone()));
        tracing::info!(cycle = %id, "cycle finished");
        Some(id)
    }

    /// Drops the active pointer without recording an interruption.
    pub fn clear_active(&mut self) -> Option<CycleId> {
        let id = self.state.active_cycle_id.clone()?;
        self.step(Transition::ClearActive, Event::Cleared(id.clone()));
        tracing::info!(cycle = %id, "active cycle cleared");
        Some(id)
    }

    // ── Tracking ──

    /// Polls the tracker once, completing the cycle when it reaches its target.
    pub fn tick(&mut self) -> Tick {
        let now = self.clock.now();
        let tick = self.tracker.poll(now);
        match &tick {
            Tick::Idle | Tick::NotDue => {}
            Tick::Elapsed { id, seconds } => {
                let remaining = self
                    .state
                    .active_cycle()
                    .map_or(0, |c| tracker::remaining_seconds(c, now));
                self.emit(&Event::Elapsed {
                    id: id.clone(),
                    elapsed: *seconds,
                    remaining,
                });
            }
            Tick::Finished { id, seconds } => {
                if self.state.active_cycle_id.as_ref() == Some(id) {
                    self.step(Transition::Complete, Event::Finished(id.clone()));
                    tracing::info!(cycle = %id, seconds, "cycle finished");
                } else {
                    tracing::warn!(cycle = %id, "tracker finished a cycle that is no longer active");
                    self.sync_tracker(now);
                }
            }
        }
        tick
    }

    /// Re-reads the saved snapshot, picking up changes made by another process.
    ///
    /// Returns whether the in-memory state changed. An unusable snapshot keeps
    /// the current state.
    pub fn reload(&mut self) -> bool {
        let Some(loaded) = self.snapshots.load() else {
            return false;
        };
        if loaded == self.state {
            return false;
        }
        tracing::debug!("cycle store changed on disk, reloading");
        self.state = loaded;
        let now = self.clock.now();
        self.sync_tracker(now);
        true
    }

    // ── Accessors ──

    pub fn active_cycle(&self) -> Option<&Cycle> {
        self.state.active_cycle()
    }

    pub fn cycles(&self) -> &[Cycle] {
        &self.state.cycles
    }

    pub fn state(&self) -> &CyclesState {
        &self.state
    }

    /// Seconds elapsed on the running cycle, or 0 when idle.
    pub fn elapsed_seconds(&self) -> i64 {
        self.active_cycle()
            .map_or(0, |c| tracker::elapsed_seconds(c, self.clock.now()))
    }

    /// Seconds left on the running cycle, or 0 when idle.
    pub fn remaining_seconds(&self) -> i64 {
        self.active_cycle()
            .map_or(0, |c| tracker::remaining_seconds(c, self.clock.now()))
    }

    /// When the tracker next wants a tick, or `None` when nothing is running.
    pub fn next_tick_due(&self) -> Option<Timestamp> {
        self.tracker.next_due()
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    // ── Internals ──

    /// The active cycle's id when it is actually running.
    fn running_id(&self) -> Option<CycleId> {
        self.state
            .active_cycle()
            .filter(|c| !c.is_terminal())
            .map(|c| c.id.clone())
    }

    /// Starts a cycle on top of `base` and commits the result with `events`.
    fn begin(
        &mut self,
        base: &CyclesState,
        task: &str,
        minutes_amount: u32,
        now: Timestamp,
        mut events: Vec<Event>,
    ) -> Result<CycleId, StoreError> {
        let (next, id) = store::start(base, task, minutes_amount, now)?;
        tracing::info!(cycle = %id, task = task.trim(), minutes_amount, "cycle started");
        events.push(Event::Started(id.clone()));
        self.commit(next, now, events);
        Ok(id)
    }

    /// Applies a transition and commits it if anything changed.
    fn step(&mut self, transition: Transition, event: Event) {
        let now = self.clock.now();
        let applied = store::apply(&self.state, transition, now);
        if applied.changed {
            self.commit(applied.state, now, vec![event]);
        } else {
            tracing::debug!(?transition, "transition changed nothing");
        }
    }

    fn commit(&mut self, next: CyclesState, now: Timestamp, events: Vec<Event>) {
        if next == self.state {
            return;
        }
        self.state = next;
        if let Err(e) = self.snapshots.save(&self.state) {
            tracing::warn!(error = %e, "failed to save cycle snapshot");
        }
        self.sync_tracker(now);
        for event in &events {
            self.emit(event);
        }
    }

    /// Arms the tracker for the running cycle, or disarms it when idle.
    fn sync_tracker(&mut self, now: Timestamp) {
        match self.state.active_cycle() {
            Some(cycle) if !cycle.is_terminal() => {
                if self.tracker.armed_for() != Some(&cycle.id) {
                    self.tracker.arm(cycle, now);
                }
            }
            _ => self.tracker.disarm(),
        }
    }

    fn emit(&mut self, event: &Event) {
        for observer in &mut self.observers {
            observer(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use crate::model::CycleStatus;
    use crate::storage::MemorySnapshots;

    #[derive(Clone)]
    struct ManualClock(Rc<Cell<Timestamp>>);

    impl ManualClock {
        fn new() -> Self {
            Self(Rc::new(Cell::new(at(0))))
        }

        fn advance(&self, secs: i64) {
            let next = Timestamp::new(self.0.get().as_second() + secs, 0).unwrap();
            self.0.set(next);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Timestamp {
            self.0.get()
        }
    }

    fn at(secs: i64) -> Timestamp {
        Timestamp::new(1_700_000_000 + secs, 0).unwrap()
    }

    fn fresh() -> (Lifecycle<MemorySnapshots, ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let lifecycle = Lifecycle::restore(MemorySnapshots::default(), clock.clone());
        (lifecycle, clock)
    }

    fn record_events(lifecycle: &mut Lifecycle<MemorySnapshots, ManualClock>) -> Rc<RefCell<Vec<Event>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        lifecycle.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    /// Drives one tick per simulated second.
    fn run_for(lifecycle: &mut Lifecycle<MemorySnapshots, ManualClock>, clock: &ManualClock, secs: i64) {
        for _ in 0..secs {
            clock.advance(1);
            lifecycle.tick();
        }
    }

    #[test]
    fn start_activates_persists_and_arms() {
        let (mut lifecycle, _clock) = fresh();
        let id = lifecycle.start("write spec", 5).unwrap();

        assert_eq!(lifecycle.active_cycle().unwrap().id, id);
        assert_eq!(lifecycle.snapshots.saves.get(), 1);
        assert_eq!(lifecycle.next_tick_due(), Some(at(0)));
        assert_eq!(lifecycle.snapshots.load().unwrap(), *lifecycle.state());
    }

    #[test]
    fn completes_exactly_once_after_target_duration() {
        let (mut lifecycle, clock) = fresh();
        let events = record_events(&mut lifecycle);
        let id = lifecycle.start("write spec", 5).unwrap();

        run_for(&mut lifecycle, &clock, 400);

        let finished = events
            .borrow()
            .iter()
            .filter(|e| matches!(e, Event::Finished(_)))
            .count();
        assert_eq!(finished, 1);
        assert!(lifecycle.active_cycle().is_none());
        let cycle = lifecycle.state().find(&id).unwrap();
        assert_eq!(cycle.finished_date, Some(at(300)));
        assert!(cycle.interrupted_date.is_none());
        assert!(lifecycle.next_tick_due().is_none());
    }

    #[test]
    fn interrupt_stops_ticking() {
        let (mut lifecycle, clock) = fresh();
        let events = record_events(&mut lifecycle);
        let id = lifecycle.start("x", 25).unwrap();
        run_for(&mut lifecycle, &clock, 10);

        assert_eq!(lifecycle.interrupt(), Some(id.clone()));
        let before = events.borrow().len();
        run_for(&mut lifecycle, &clock, 30);

        assert_eq!(events.borrow().len(), before);
        let cycle = lifecycle.state().find(&id).unwrap();
        assert_eq!(cycle.interrupted_date, Some(at(10)));
        assert!(cycle.finished_date.is_none());
        assert!(lifecycle.active_cycle().is_none());
        assert_eq!(lifecycle.tick(), Tick::Idle);
    }

    #[test]
    fn interrupt_without_active_cycle_is_noop() {
        let (mut lifecycle, _clock) = fresh();
        let before = lifecycle.state().clone();

        assert_eq!(lifecycle.interrupt(), None);
        assert_eq!(lifecycle.mark_active_complete(), None);
        assert_eq!(lifecycle.clear_active(), None);
        assert_eq!(*lifecycle.state(), before);
        assert_eq!(lifecycle.snapshots.saves.get(), 0);
    }

    #[test]
    fn second_start_is_rejected_while_running() {
        let (mut lifecycle, _clock) = fresh();
        let first = lifecycle.start("first", 25).unwrap();

        let err = lifecycle.start("second", 25).unwrap_err();
        assert_eq!(err, StoreError::CycleAlreadyActive(first.clone()));
        assert_eq!(lifecycle.cycles().len(), 1);
        assert_eq!(lifecycle.active_cycle().unwrap().id, first);
        assert_eq!(lifecycle.snapshots.saves.get(), 1);
    }

    #[test]
    fn start_replacing_interrupts_previous_in_one_save() {
        let (mut lifecycle, clock) = fresh();
        let events = record_events(&mut lifecycle);
        let first = lifecycle.start("first", 25).unwrap();
        clock.advance(60);

        let second = lifecycle.start_replacing("second", 25).unwrap();

        assert_eq!(lifecycle.snapshots.saves.get(), 2);
        assert_eq!(
            lifecycle.state().find(&first).unwrap().status(),
            CycleStatus::Interrupted
        );
        assert_eq!(lifecycle.active_cycle().unwrap().id, second);
        assert_eq!(
            events.borrow().as_slice(),
            [
                Event::Started(first.clone()),
                Event::Interrupted(first),
                Event::Started(second)
            ]
        );
    }

    #[test]
    fn rejected_start_replacing_leaves_running_cycle() {
        let (mut lifecycle, _clock) = fresh();
        let first = lifecycle.start("first", 25).unwrap();
        let events = record_events(&mut lifecycle);
        let before = lifecycle.state().clone();

        let err = lifecycle.start_replacing("", 25).unwrap_err();
        assert!(matches!(err, StoreError::InvalidInput(_)));
        assert_eq!(lifecycle.active_cycle().unwrap().id, first);
        assert_eq!(*lifecycle.state(), before);
        assert_eq!(lifecycle.snapshots.saves.get(), 1);
        assert!(events.borrow().is_empty());
        assert!(lifecycle.next_tick_due().is_some());
    }

    #[test]
    fn invalid_start_saves_and_emits_nothing() {
        let (mut lifecycle, _clock) = fresh();
        let events = record_events(&mut lifecycle);

        assert!(matches!(
            lifecycle.start("", 25),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(matches!(
            lifecycle.start("x", 0),
            Err(StoreError::InvalidInput(_))
        ));
        assert!(lifecycle.cycles().is_empty());
        assert_eq!(lifecycle.snapshots.saves.get(), 0);
        assert!(lifecycle.snapshots.load().is_none());
        assert!(events.borrow().is_empty());
        assert!(lifecycle.next_tick_due().is_none());
    }

    #[test]
    fn start_after_restoring_id_at_numeric_ceiling() {
        let mut saved = CyclesState::default();
        saved.cycles.push(Cycle {
            id: CycleId::from(i64::MAX.to_string().as_str()),
            task: "x".into(),
            minutes_amount: 25,
            start_date: at(0),
            interrupted_date: Some(at(60)),
            finished_date: None,
        });
        let mut lifecycle = Lifecycle::restore(MemorySnapshots::with_state(&saved), ManualClock::new());

        let id = lifecycle.start("y", 25).unwrap();
        assert_eq!(lifecycle.cycles().len(), 2);
        assert_ne!(id, saved.cycles[0].id);
        assert!(lifecycle.snapshots.load().is_some());
    }

    #[test]
    fn clear_active_disarms_without_stamping() {
        let (mut lifecycle, _clock) = fresh();
        let id = lifecycle.start("x", 25).unwrap();

        assert_eq!(lifecycle.clear_active(), Some(id.clone()));
        assert!(lifecycle.next_tick_due().is_none());
        assert_eq!(
            lifecycle.state().find(&id).unwrap().status(),
            CycleStatus::Ongoing
        );
    }

    #[test]
    fn elapsed_and_remaining_follow_wall_clock() {
        let (mut lifecycle, clock) = fresh();
        assert_eq!(lifecycle.elapsed_seconds(), 0);

        lifecycle.start("x", 1).unwrap();
        clock.advance(45);
        assert_eq!(lifecycle.elapsed_seconds(), 45);
        assert_eq!(lifecycle.remaining_seconds(), 15);
    }

    #[test]
    fn restore_rearms_running_cycle_and_completes_overdue_one() {
        let clock = ManualClock::new();
        let saved = store::start(&CyclesState::default(), "x", 5, at(0))
            .unwrap()
            .0;
        clock.advance(3600);

        let mut lifecycle = Lifecycle::restore(MemorySnapshots::with_state(&saved), clock.clone());
        assert_eq!(lifecycle.next_tick_due(), Some(at(3600)));

        assert!(matches!(lifecycle.tick(), Tick::Finished { .. }));
        assert!(lifecycle.active_cycle().is_none());
        assert_eq!(lifecycle.cycles()[0].finished_date, Some(at(3600)));
    }

    #[test]
    fn reload_picks_up_external_interrupt() {
        let (mut lifecycle, clock) = fresh();
        let id = lifecycle.start("x", 25).unwrap();
        clock.advance(10);

        let external = store::interrupt(lifecycle.state(), clock.now());
        lifecycle.snapshots.save(&external).unwrap();

        assert!(lifecycle.reload());
        assert!(lifecycle.next_tick_due().is_none());
        assert_eq!(
            lifecycle.state().find(&id).unwrap().status(),
            CycleStatus::Interrupted
        );
        assert!(!lifecycle.reload());
    }

    #[test]
    fn elapsed_events_carry_remaining_time() {
        let (mut lifecycle, clock) = fresh();
        let events = record_events(&mut lifecycle);
        let id = lifecycle.start("x", 1).unwrap();

        run_for(&mut lifecycle, &clock, 20);

        assert_eq!(
            events.borrow().last(),
            Some(&Event::Elapsed {
                id,
                elapsed: 20,
                remaining: 40
            })
        );
    }
}
