//! Client-side runtime for dashboardr pages.
//!
//! Collects filter control values, evaluates `data-show-when` conditions,
//! cascades the result through cards and grids, and keeps keyboard and
//! screen-reader users oriented (modal focus trap, tab-list arrows, live
//! region). The core works on [`dom::DomSnapshot`]; the browser adapter in
//! `wasm_api` drives the same code through `web-sys`.

pub mod a11y;
pub mod condition;
pub mod config;
pub mod css;
pub mod dom;
pub mod error;
pub mod events;
pub mod host;
pub mod inputs;
pub mod runtime;
pub mod schedule;
pub mod visibility;
#[cfg(target_arch = "wasm32")]
pub mod wasm_api;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use error::{Result, RuntimeError};

pub mod prelude {
    pub use crate::a11y::*;
    pub use crate::condition::*;
    pub use crate::config::*;
    pub use crate::css::*;
    pub use crate::dom::*;
    pub use crate::error::*;
    pub use crate::events::*;
    pub use crate::host::*;
    pub use crate::inputs::*;
    pub use crate::runtime::*;
    pub use crate::schedule::*;
    pub use crate::visibility::*;
    #[cfg(target_arch = "wasm32")]
    pub use crate::wasm_api::*;
}
