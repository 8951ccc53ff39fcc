//! The seam between the runtime and a document.
//!
//! Everything the runtime reads from or writes to a page goes through
//! [`Host`]. The browser adapter implements it over `web-sys`; the
//! in-memory implementation on [`DomSnapshot`] backs tests and the inspector.

use std::fmt;

use crate::config::RuntimeConfig;
use crate::css::SR_ONLY_CLASS;
use crate::dom::{DomSnapshot, Element, NodeId};
use crate::visibility::MarkerChange;

pub trait Host {
    /// Element handle that stays meaningful across passes
    type Handle: Clone + PartialEq + fmt::Debug;

    /// Capture the element tree. Node ids in the snapshot are valid for the
    /// next `apply_markers` call.
    fn capture(&mut self) -> DomSnapshot;

    fn apply_markers(&mut self, class: &str, changes: &[MarkerChange]);

    fn active_element(&self) -> Option<Self::Handle>;

    /// Returns false when the element could not take focus.
    fn focus(&mut self, target: &Self::Handle) -> bool;

    /// Synthetic activation, so page scripts bound to `click` run.
    fn click(&mut self, target: &Self::Handle);

    /// Still attached to the document and able to take focus.
    fn can_focus(&self, target: &Self::Handle) -> bool;

    /// Focusable elements inside the modal overlay, in document order.
    fn overlay_focusables(&self, config: &RuntimeConfig) -> Vec<Self::Handle>;

    /// The modal's initial focus target.
    fn overlay_close_control(&self, config: &RuntimeConfig) -> Option<Self::Handle>;

    /// Tabs sharing a tab list with `target`, or `None` when `target` is
    /// not a tab.
    fn tab_group(&self, target: &Self::Handle, config: &RuntimeConfig)
    -> Option<Vec<Self::Handle>>;

    /// Whether a `change` on `target` is a filter change worth announcing.
    fn is_filter_control(&self, target: &Self::Handle, config: &RuntimeConfig) -> bool;

    fn ensure_live_region(&mut self, config: &RuntimeConfig);

    fn set_live_text(&mut self, config: &RuntimeConfig, text: &str);
}

impl DomSnapshot {
    fn overlay(&self, config: &RuntimeConfig) -> Option<NodeId> {
        self.by_id(&config.overlay_id)
    }

    /// Text currently held by the live region.
    pub fn live_text(&self, config: &RuntimeConfig) -> Option<&str> {
        self.by_id(&config.live_region_id)
            .and_then(|n| self.get(n).text.as_deref())
    }

    /// Every focusable element in document order.
    pub fn focusables(&self) -> Vec<NodeId> {
        self.document_order()
            .into_iter()
            .filter(|n| self.is_focusable(*n))
            .collect()
    }
}

impl Host for DomSnapshot {
    type Handle = NodeId;

    fn capture(&mut self) -> DomSnapshot {
        self.clone()
    }

    fn apply_markers(&mut self, class: &str, changes: &[MarkerChange]) {
        for change in changes {
            self.set_class(change.node, class, change.hidden);
        }
    }

    fn active_element(&self) -> Option<NodeId> {
        self.active()
    }

    fn focus(&mut self, target: &NodeId) -> bool {
        if !self.is_focusable(*target) {
            return false;
        }
        self.set_active(Some(*target));
        true
    }

    fn click(&mut self, target: &NodeId) {
        if self.is_connected(*target) {
            self.record_click(*target);
        }
    }

    fn can_focus(&self, target: &NodeId) -> bool {
        target.0 < self.len() && self.is_focusable(*target)
    }

    fn overlay_focusables(&self, config: &RuntimeConfig) -> Vec<NodeId> {
        let Some(overlay) = self.overlay(config) else {
            return Vec::new();
        };
        self.descendants(overlay)
            .into_iter()
            .filter(|n| self.is_focusable(*n))
            .collect()
    }

    fn overlay_close_control(&self, config: &RuntimeConfig) -> Option<NodeId> {
        let overlay = self.overlay(config)?;
        self.descendants(overlay)
            .into_iter()
            .find(|n| self.has_class(*n, &config.modal_close_class))
    }

    fn tab_group(&self, target: &NodeId, config: &RuntimeConfig) -> Option<Vec<NodeId>> {
        if target.0 >= self.len() || self.get(*target).get_attr("role") != Some("tab") {
            return None;
        }
        let container = self
            .closest_ancestor(*target, |e| e.get_attr("role") == Some("tablist"))
            .or_else(|| {
                self.closest_ancestor(*target, |e| e.has_class(&config.tablist_fallback_class))
            })?;
        Some(
            self.descendants(container)
                .into_iter()
                .filter(|n| self.get(*n).get_attr("role") == Some("tab"))
                .collect(),
        )
    }

    fn is_filter_control(&self, target: &NodeId, config: &RuntimeConfig) -> bool {
        if target.0 >= self.len() {
            return false;
        }
        let el = self.get(*target);
        let is_control = el.tag == "select"
            || (el.tag == "input"
                && matches!(el.get_attr("type"), Some("radio") | Some("checkbox")));
        is_control
            || self
                .closest(*target, |e| e.attrs.contains_key(&config.filter_var_attr))
                .is_some()
    }

    fn ensure_live_region(&mut self, config: &RuntimeConfig) {
        if self.by_id(&config.live_region_id).is_some() {
            return;
        }
        let root = self.root();
        self.append(
            root,
            Element::new("div")
                .id(&config.live_region_id)
                .class(SR_ONLY_CLASS)
                .attr("role", "status")
                .attr("aria-live", "polite")
                .attr("aria-atomic", "true"),
        );
    }

    fn set_live_text(&mut self, config: &RuntimeConfig, text: &str) {
        if let Some(region) = self.by_id(&config.live_region_id) {
            self.get_mut(region).text = Some(text.to_string());
        }
    }
}
