//! Focus trap for the singleton modal overlay.

use std::time::Duration;

use tracing::debug;

use crate::config::RuntimeConfig;
use crate::host::Host;
use crate::schedule::{Scheduler, Task, TimerId};

/// Elements the browser will move focus to. Mirrors `DomSnapshot::is_focusable`.
pub const FOCUSABLE_SELECTOR: &str = "a[href], button:not([disabled]), \
     input:not([disabled]):not([type=\"hidden\"]), select:not([disabled]), \
     textarea:not([disabled]), [tabindex]:not([tabindex=\"-1\"])";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModalState {
    Closed,
    Open,
}

#[derive(Debug)]
pub struct FocusTrap<H> {
    state: ModalState,
    /// Focus owner when the modal opened, restored on close
    previous: Option<H>,
    pending_focus: Option<TimerId>,
    focus_delay: Duration,
}

impl<H: Clone + PartialEq> FocusTrap<H> {
    pub fn new(focus_delay: Duration) -> Self {
        Self {
            state: ModalState::Closed,
            previous: None,
            pending_focus: None,
            focus_delay,
        }
    }

    pub fn state(&self) -> ModalState {
        self.state
    }

    pub fn previous(&self) -> Option<&H> {
        self.previous.as_ref()
    }

    /// React to the overlay's visibility. Repeated notifications for the
    /// current state are ignored.
    pub fn on_overlay_change<T, S>(&mut self, visible: bool, host: &mut T, sched: &mut S)
    where
        T: Host<Handle = H>,
        S: Scheduler,
    {
        match (self.state, visible) {
            (ModalState::Closed, true) => {
                self.state = ModalState::Open;
                self.previous = host.active_element();
                self.pending_focus = Some(sched.schedule(self.focus_delay, Task::FocusModalClose));
                debug!("Modal opened");
            }
            (ModalState::Open, false) => {
                self.state = ModalState::Closed;
                if let Some(id) = self.pending_focus.take() {
                    sched.cancel(id);
                }
                if let Some(previous) = self.previous.take()
                    && host.can_focus(&previous)
                {
                    host.focus(&previous);
                }
                debug!("Modal closed");
            }
            _ => {}
        }
    }

    /// Delayed initial focus. Stale or post-close timers do nothing.
    pub fn on_focus_timer<T>(&mut self, fired: TimerId, host: &mut T, config: &RuntimeConfig)
    where
        T: Host<Handle = H>,
    {
        if self.pending_focus != Some(fired) {
            return;
        }
        self.pending_focus = None;
        if self.state != ModalState::Open {
            return;
        }
        if let Some(close) = host.overlay_close_control(config) {
            host.focus(&close);
        }
    }

    /// Handle Tab / Shift+Tab while open. Returns true when the default
    /// traversal must be suppressed, which only happens at the two ends of
    /// the focusable list.
    pub fn on_tab<T>(&mut self, shift: bool, host: &mut T, config: &RuntimeConfig) -> bool
    where
        T: Host<Handle = H>,
    {
        if self.state != ModalState::Open {
            return false;
        }
        let focusables = host.overlay_focusables(config);
        let (Some(first), Some(last)) = (focusables.first(), focusables.last()) else {
            return false;
        };
        let active = host.active_element();
        let wrap_to = if shift {
            (active.as_ref() == Some(first)).then_some(last)
        } else {
            (active.as_ref() == Some(last)).then_some(first)
        };
        match wrap_to {
            Some(target) => {
                host.focus(target);
                true
            }
            None => false,
        }
    }

    pub fn cancel<S: Scheduler>(&mut self, sched: &mut S) {
        if let Some(id) = self.pending_focus.take() {
            sched.cancel(id);
        }
        self.previous = None;
        self.state = ModalState::Closed;
    }
}
