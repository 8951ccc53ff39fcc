//! The page controller.
//!
//! [`Runtime`] owns everything that lives for the duration of a page: the
//! configuration, the focus trap and its captured element, the announcer and
//! the fallback re-evaluation timers. The host adapter forwards browser
//! events to [`Runtime::handle`] and honours the returned [`Response`].

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::a11y::{Announcer, FocusTrap, navigate_tabs};
use crate::config::RuntimeConfig;
use crate::events::{Event, Key, Response};
use crate::host::Host;
use crate::schedule::{ManualScheduler, Scheduler, Task, TimerId};
use crate::visibility::{PassReport, run_pass};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Running,
    TornDown,
}

pub struct Runtime<H: Host> {
    config: RuntimeConfig,
    phase: Phase,
    announcer: Announcer,
    focus_trap: FocusTrap<H::Handle>,
    reevaluations: Vec<TimerId>,
    last_report: Option<PassReport>,
}

impl<H: Host> Runtime<H> {
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            announcer: Announcer::new(&config),
            focus_trap: FocusTrap::new(config.modal_focus_delay()),
            config,
            phase: Phase::Idle,
            reevaluations: Vec::new(),
            last_report: None,
        }
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn focus_trap(&self) -> &FocusTrap<H::Handle> {
        &self.focus_trap
    }

    pub fn last_report(&self) -> Option<&PassReport> {
        self.last_report.as_ref()
    }

    /// Start managing the page: create the live region, run the first pass
    /// and queue the fallback passes. Calling it while running only reruns
    /// the pass.
    pub fn init<S: Scheduler>(&mut self, host: &mut H, sched: &mut S) -> PassReport {
        if self.phase == Phase::Running {
            warn!("Runtime already started");
            return self.pass(host);
        }
        self.phase = Phase::Running;
        host.ensure_live_region(&self.config);
        let report = self.pass(host);
        self.reevaluations = self
            .config
            .reevaluate_delays()
            .map(|delay| sched.schedule(delay, Task::Reevaluate))
            .collect();
        info!(
            elements = report.elements.len(),
            fallback_passes = self.reevaluations.len(),
            "Runtime started"
        );
        report
    }

    /// Run a visibility pass now. Returns `None` unless running.
    pub fn reevaluate(&mut self, host: &mut H) -> Option<PassReport> {
        (self.phase == Phase::Running).then(|| self.pass(host))
    }

    /// Cancel every pending timer. Later events are ignored.
    pub fn teardown<S: Scheduler>(&mut self, sched: &mut S) {
        if self.phase != Phase::Running {
            return;
        }
        for id in self.reevaluations.drain(..) {
            sched.cancel(id);
        }
        self.announcer.cancel(sched);
        self.focus_trap.cancel(sched);
        self.phase = Phase::TornDown;
        info!("Runtime torn down");
    }

    pub fn handle<S: Scheduler>(
        &mut self,
        event: Event<H::Handle>,
        host: &mut H,
        sched: &mut S,
    ) -> Response {
        if self.phase != Phase::Running {
            debug!(phase = ?self.phase, "Ignoring event");
            return Response::default();
        }
        match event {
            Event::Load => Response::with_report(self.pass(host)),
            Event::Change { target } => {
                let report = self.pass(host);
                if target.is_some_and(|t| host.is_filter_control(&t, &self.config)) {
                    self.announcer.filter_changed(sched);
                }
                Response::with_report(report)
            }
            Event::KeyDown {
                key: Key::Tab,
                shift,
                ..
            } => Response {
                prevent_default: self.focus_trap.on_tab(shift, host, &self.config),
                report: None,
            },
            Event::KeyDown { target, key, .. } => Response {
                prevent_default: navigate_tabs(&target, key, host, &self.config),
                report: None,
            },
            Event::OverlayStyleChanged { visible } => {
                self.focus_trap.on_overlay_change(visible, host, sched);
                Response::default()
            }
            Event::Timer { id, task } => self.on_timer(id, task, host, sched),
        }
    }

    fn on_timer<S: Scheduler>(
        &mut self,
        id: TimerId,
        task: Task,
        host: &mut H,
        sched: &mut S,
    ) -> Response {
        match task {
            Task::Reevaluate => {
                let Some(index) = self.reevaluations.iter().position(|r| *r == id) else {
                    return Response::default();
                };
                self.reevaluations.remove(index);
                Response::with_report(self.pass(host))
            }
            Task::Announce => {
                self.announcer.on_announce(id, host, sched, &self.config);
                Response::default()
            }
            Task::AnnounceCommit => {
                self.announcer.on_commit(id, host, &self.config);
                Response::default()
            }
            Task::FocusModalClose => {
                self.focus_trap.on_focus_timer(id, host, &self.config);
                Response::default()
            }
        }
    }

    fn pass(&mut self, host: &mut H) -> PassReport {
        let report = run_pass(host, &self.config);
        self.last_report = Some(report.clone());
        report
    }

    /// Fire every task due within `by` of the scheduler's current time.
    pub fn advance(&mut self, host: &mut H, sched: &mut ManualScheduler, by: Duration) {
        let until = sched.now() + by;
        while let Some((id, task)) = sched.pop_due(until) {
            self.handle(Event::Timer { id, task }, host, sched);
        }
        sched.set_now(until);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a11y::ModalState;
    use crate::dom::{DomSnapshot, Element, NodeId};

    const GRADUATE: &str = r#"{"var":"degree","op":"eq","val":"graduate"}"#;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    fn page() -> (DomSnapshot, NodeId, NodeId) {
        let mut doc = DomSnapshot::new();
        let root = doc.root();
        let select = doc.append(
            root,
            Element::new("select").id("degree").value("bachelor"),
        );
        let target = doc.append(root, Element::new("div").attr("data-show-when", GRADUATE));
        (doc, select, target)
    }

    #[test]
    fn init_runs_pass_and_schedules_fallbacks() {
        let (mut doc, _, target) = page();
        let mut sched = ManualScheduler::new();
        let mut runtime = Runtime::new(RuntimeConfig::default());

        let report = runtime.init(&mut doc, &mut sched);
        assert_eq!(runtime.phase(), Phase::Running);
        assert_eq!(report.is_hidden(target), Some(true));
        assert!(doc.has_class(target, "dashboardr-hidden"));
        assert!(doc.by_id("dashboardr-live-region").is_some());
        assert_eq!(sched.pending(), 3);
    }

    #[test]
    fn fallback_passes_pick_up_late_changes() {
        let (mut doc, select, target) = page();
        let mut sched = ManualScheduler::new();
        let mut runtime = Runtime::new(RuntimeConfig::default());
        runtime.init(&mut doc, &mut sched);

        doc.set_value(select, "graduate");
        runtime.advance(&mut doc, &mut sched, ms(99));
        assert!(doc.has_class(target, "dashboardr-hidden"));
        runtime.advance(&mut doc, &mut sched, ms(1));
        assert!(!doc.has_class(target, "dashboardr-hidden"));
        runtime.advance(&mut doc, &mut sched, ms(5000));
        assert_eq!(sched.pending(), 0);
    }

    #[test]
    fn change_on_filter_control_announces() {
        let (mut doc, select, target) = page();
        let mut sched = ManualScheduler::new();
        let mut runtime = Runtime::new(RuntimeConfig::default());
        runtime.init(&mut doc, &mut sched);

        doc.set_value(select, "graduate");
        let response = runtime.handle(
            Event::Change {
                target: Some(select),
            },
            &mut doc,
            &mut sched,
        );
        assert!(!response.prevent_default);
        let report = response.report.unwrap();
        assert_eq!(report.is_hidden(target), Some(false));
        assert!(sched.is_scheduled(Task::Announce));

        runtime.advance(&mut doc, &mut sched, ms(600));
        assert_eq!(doc.live_text(runtime.config()), Some("Filters updated"));
    }

    #[test]
    fn change_on_plain_element_does_not_announce() {
        let (mut doc, _, _) = page();
        let text = doc.append(doc.root(), Element::new("textarea"));
        let mut sched = ManualScheduler::new();
        let mut runtime = Runtime::new(RuntimeConfig::default());
        runtime.init(&mut doc, &mut sched);

        runtime.handle(Event::Change { target: Some(text) }, &mut doc, &mut sched);
        assert!(!sched.is_scheduled(Task::Announce));
    }

    #[test]
    fn teardown_cancels_and_ignores_events() {
        let (mut doc, select, _) = page();
        let overlay = doc.append(doc.root(), Element::new("div").id("dashboardr-modal-overlay"));
        doc.append(overlay, Element::new("button").class("dashboardr-modal-close"));
        let mut sched = ManualScheduler::new();
        let mut runtime = Runtime::new(RuntimeConfig::default());
        runtime.init(&mut doc, &mut sched);

        runtime.handle(Event::Change { target: Some(select) }, &mut doc, &mut sched);
        runtime.handle(Event::OverlayStyleChanged { visible: true }, &mut doc, &mut sched);
        assert_eq!(runtime.focus_trap().state(), ModalState::Open);

        runtime.teardown(&mut sched);
        assert_eq!(runtime.phase(), Phase::TornDown);
        assert_eq!(sched.pending(), 0);
        assert_eq!(runtime.focus_trap().state(), ModalState::Closed);

        let response = runtime.handle(Event::Load, &mut doc, &mut sched);
        assert_eq!(response, Response::default());
        assert_eq!(runtime.reevaluate(&mut doc), None);
    }

    #[test]
    fn events_before_init_are_ignored() {
        let (mut doc, _, target) = page();
        let mut sched = ManualScheduler::new();
        let mut runtime = Runtime::new(RuntimeConfig::default());
        let response = runtime.handle(Event::Load, &mut doc, &mut sched);
        assert_eq!(response.report, None);
        assert!(!doc.has_class(target, "dashboardr-hidden"));
    }

    #[test]
    fn second_init_does_not_reschedule() {
        let (mut doc, _, _) = page();
        let mut sched = ManualScheduler::new();
        let mut runtime = Runtime::new(RuntimeConfig::default());
        runtime.init(&mut doc, &mut sched);
        runtime.init(&mut doc, &mut sched);
        assert_eq!(sched.pending(), 3);
    }

    #[test]
    fn configured_delays_replace_defaults() {
        let (mut doc, _, _) = page();
        let mut sched = ManualScheduler::new();
        let config = RuntimeConfig {
            reevaluate_after_ms: vec![250],
            ..RuntimeConfig::default()
        };
        let mut runtime = Runtime::new(config);
        runtime.init(&mut doc, &mut sched);
        assert_eq!(sched.pending(), 1);
    }
}
