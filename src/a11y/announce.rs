//! Debounced screen-reader announcements for filter changes.

use tracing::debug;

use crate::config::RuntimeConfig;
use crate::host::Host;
use crate::schedule::{Debounce, Scheduler, Task, TimerId};

/// Two-phase announcer. A burst of filter changes collapses into one
/// announcement; the region is cleared first and the message written on the
/// following frame so assistive technology re-reads identical text.
#[derive(Debug)]
pub struct Announcer {
    debounce: Debounce,
    commit: Option<TimerId>,
}

impl Announcer {
    pub fn new(config: &RuntimeConfig) -> Self {
        Self {
            debounce: Debounce::new(config.announce_debounce()),
            commit: None,
        }
    }

    /// A filter changed. Restarts the quiet period.
    pub fn filter_changed<S: Scheduler>(&mut self, sched: &mut S) {
        self.debounce.trigger(sched, Task::Announce);
    }

    /// Debounce elapsed: clear the region and queue the message.
    pub fn on_announce<H: Host, S: Scheduler>(
        &mut self,
        fired: TimerId,
        host: &mut H,
        sched: &mut S,
        config: &RuntimeConfig,
    ) {
        if !self.debounce.take(fired) {
            return;
        }
        if let Some(previous) = self.commit.take() {
            sched.cancel(previous);
        }
        host.set_live_text(config, "");
        self.commit = Some(sched.schedule_frame(Task::AnnounceCommit));
    }

    pub fn on_commit<H: Host>(&mut self, fired: TimerId, host: &mut H, config: &RuntimeConfig) {
        if self.commit != Some(fired) {
            return;
        }
        self.commit = None;
        debug!(message = %config.announce_message, "Announcing");
        host.set_live_text(config, &config.announce_message);
    }

    pub fn is_pending(&self) -> bool {
        self.debounce.is_pending() || self.commit.is_some()
    }

    pub fn cancel<S: Scheduler>(&mut self, sched: &mut S) {
        self.debounce.cancel(sched);
        if let Some(id) = self.commit.take() {
            sched.cancel(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dom::DomSnapshot;
    use crate::schedule::ManualScheduler;

    fn drain(
        announcer: &mut Announcer,
        doc: &mut DomSnapshot,
        sched: &mut ManualScheduler,
        config: &RuntimeConfig,
        until: Duration,
    ) {
        while let Some((id, task)) = sched.pop_due(until) {
            match task {
                Task::Announce => announcer.on_announce(id, doc, sched, config),
                Task::AnnounceCommit => announcer.on_commit(id, doc, config),
                _ => {}
            }
        }
    }

    #[test]
    fn burst_produces_single_message_after_quiet_period() {
        let config = RuntimeConfig::default();
        let mut doc = DomSnapshot::new();
        doc.ensure_live_region(&config);
        let mut sched = ManualScheduler::new();
        let mut announcer = Announcer::new(&config);

        for t in [0, 100, 200] {
            sched.set_now(Duration::from_millis(t));
            announcer.filter_changed(&mut sched);
        }
        drain(&mut announcer, &mut doc, &mut sched, &config, Duration::from_millis(699));
        assert_eq!(doc.live_text(&config), None);

        drain(&mut announcer, &mut doc, &mut sched, &config, Duration::from_millis(700));
        assert_eq!(doc.live_text(&config), Some(""));
        assert!(announcer.is_pending());

        drain(&mut announcer, &mut doc, &mut sched, &config, Duration::from_secs(1));
        assert_eq!(doc.live_text(&config), Some("Filters updated"));
        assert!(!announcer.is_pending());
    }

    #[test]
    fn cancel_drops_queued_work() {
        let config = RuntimeConfig::default();
        let mut doc = DomSnapshot::new();
        doc.ensure_live_region(&config);
        let mut sched = ManualScheduler::new();
        let mut announcer = Announcer::new(&config);

        announcer.filter_changed(&mut sched);
        announcer.cancel(&mut sched);
        assert_eq!(sched.pending(), 0);
        drain(&mut announcer, &mut doc, &mut sched, &config, Duration::from_secs(5));
        assert_eq!(doc.live_text(&config), None);
    }
}
