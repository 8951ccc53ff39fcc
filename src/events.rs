//! Events fed into the runtime by the host adapter.

use serde::{Deserialize, Serialize};

use crate::schedule::{Task, TimerId};
use crate::visibility::PassReport;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Tab,
    ArrowRight,
    ArrowDown,
    ArrowLeft,
    ArrowUp,
    Home,
    End,
    Other,
}

impl Key {
    /// Map a `KeyboardEvent.key` value.
    pub fn from_name(name: &str) -> Self {
        match name {
            "Tab" => Self::Tab,
            "ArrowRight" | "Right" => Self::ArrowRight,
            "ArrowDown" | "Down" => Self::ArrowDown,
            "ArrowLeft" | "Left" => Self::ArrowLeft,
            "ArrowUp" | "Up" => Self::ArrowUp,
            "Home" => Self::Home,
            "End" => Self::End,
            _ => Self::Other,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event<H> {
    /// Page finished loading
    Load,
    /// A form control changed value
    Change { target: Option<H> },
    KeyDown { target: H, key: Key, shift: bool },
    /// The modal overlay's inline style changed
    OverlayStyleChanged { visible: bool },
    /// A scheduled task came due
    Timer { id: TimerId, task: Task },
}

/// What the adapter must do with the originating browser event.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Response {
    pub prevent_default: bool,
    /// Set when the event triggered a visibility pass
    pub report: Option<PassReport>,
}

impl Response {
    pub fn with_report(report: PassReport) -> Self {
        Self {
            prevent_default: false,
            report: Some(report),
        }
    }
}
