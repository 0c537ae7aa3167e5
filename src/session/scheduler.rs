use std::time::{Duration, Instant};

use crate::session::input::Mode;

pub const FILE_CHECK_INTERVAL: Duration = Duration::from_secs(1);
pub const DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Poll the backing file for external changes
    FileCheck,
    /// Re-score search results after typing settles
    SearchDebounce,
    /// Re-filter the command palette after typing settles
    PaletteDebounce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedEvent {
    pub kind: EventKind,
    pub due: Instant,
    /// Mode the event was scheduled in; the handler drops it if the mode
    /// has changed since
    pub mode: Option<Mode>,
}

impl TimedEvent {
    pub fn is_stale(&self, current: Mode) -> bool {
        self.mode.is_some_and(|m| m != current)
    }
}

/// Single-threaded queue of timed events polled by the input loop
#[derive(Debug, Default)]
pub struct Scheduler {
    queue: Vec<TimedEvent>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    /// Queue `kind` after `delay`. At most one event per kind is pending;
    /// rescheduling replaces it, which is what makes debouncing work.
    pub fn schedule(&mut self, kind: EventKind, delay: Duration, now: Instant, mode: Option<Mode>) {
        self.queue.retain(|e| e.kind != kind);
        self.queue.push(TimedEvent {
            kind,
            due: now + delay,
            mode,
        });
    }

    pub fn cancel(&mut self, kind: EventKind) {
        self.queue.retain(|e| e.kind != kind);
    }

    pub fn is_pending(&self, kind: EventKind) -> bool {
        self.queue.iter().any(|e| e.kind == kind)
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.iter().map(|e| e.due).min()
    }

    /// How long the loop may block waiting for input
    pub fn timeout(&self, now: Instant) -> Duration {
        self.next_deadline()
            .map(|d| d.saturating_duration_since(now))
            .unwrap_or(FILE_CHECK_INTERVAL)
    }

    /// Remove and return every event due at `now`, earliest first
    pub fn due_events(&mut self, now: Instant) -> Vec<TimedEvent> {
        let (mut due, pending): (Vec<TimedEvent>, Vec<TimedEvent>) =
            self.queue.drain(..).partition(|e| e.due <= now);
        self.queue = pending;
        due.sort_by_key(|e| e.due);
        due
    }

    /// Remove and return pending debounce events regardless of deadline
    pub fn flush_debounces(&mut self) -> Vec<TimedEvent> {
        let (due, pending): (Vec<TimedEvent>, Vec<TimedEvent>) = self
            .queue
            .drain(..)
            .partition(|e| e.kind != EventKind::FileCheck);
        self.queue = pending;
        due
    }
}
