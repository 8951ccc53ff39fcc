//! Timer scheduling.
//!
//! The runtime never sleeps. It asks a [`Scheduler`] to deliver a [`Task`]
//! later and reacts when the host feeds the task back in. In the browser the
//! scheduler is `setTimeout`; tests use [`ManualScheduler`] and advance time
//! by hand.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Approximate length of one animation frame.
pub const FRAME: Duration = Duration::from_millis(16);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TimerId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    /// Fallback visibility pass for late-rendering widgets
    Reevaluate,
    /// Debounced filter announcement: clear the live region
    Announce,
    /// Next-frame half of an announcement: write the message
    AnnounceCommit,
    /// Move focus into a freshly opened modal
    FocusModalClose,
}

pub trait Scheduler {
    fn schedule(&mut self, delay: Duration, task: Task) -> TimerId;

    /// Schedule for the next animation frame.
    fn schedule_frame(&mut self, task: Task) -> TimerId {
        self.schedule(FRAME, task)
    }

    /// Cancel a pending timer. Unknown or already fired ids are ignored.
    fn cancel(&mut self, id: TimerId);
}

/// Cancel-and-reschedule: only the last trigger within `delay` fires.
#[derive(Debug)]
pub struct Debounce {
    delay: Duration,
    pending: Option<TimerId>,
}

impl Debounce {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn trigger<S: Scheduler>(&mut self, sched: &mut S, task: Task) -> TimerId {
        if let Some(previous) = self.pending.take() {
            sched.cancel(previous);
        }
        let id = sched.schedule(self.delay, task);
        self.pending = Some(id);
        id
    }

    /// Claim a fired timer. Returns false for a stale id.
    pub fn take(&mut self, fired: TimerId) -> bool {
        if self.pending == Some(fired) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn cancel<S: Scheduler>(&mut self, sched: &mut S) {
        if let Some(id) = self.pending.take() {
            sched.cancel(id);
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[derive(Debug, Clone)]
struct Pending {
    due: Duration,
    id: TimerId,
    task: Task,
}

/// Deterministic scheduler driven by an explicit clock.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    now: Duration,
    next_id: u64,
    pending: Vec<Pending>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_scheduled(&self, task: Task) -> bool {
        self.pending.iter().any(|p| p.task == task)
    }

    /// Pop the earliest task due at or before `until`, moving the clock to
    /// its due time. Ties fire in scheduling order.
    pub fn pop_due(&mut self, until: Duration) -> Option<(TimerId, Task)> {
        let index = self
            .pending
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= until)
            .min_by_key(|(_, p)| (p.due, p.id))
            .map(|(i, _)| i)?;
        let next = self.pending.remove(index);
        self.now = self.now.max(next.due);
        Some((next.id, next.task))
    }

    /// Move the clock without firing anything.
    pub fn set_now(&mut self, now: Duration) {
        self.now = now;
    }
}

impl Scheduler for ManualScheduler {
    fn schedule(&mut self, delay: Duration, task: Task) -> TimerId {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        self.pending.push(Pending {
            due: self.now + delay,
            id,
            task,
        });
        id
    }

    fn cancel(&mut self, id: TimerId) {
        self.pending.retain(|p| p.id != id);
    }
}
