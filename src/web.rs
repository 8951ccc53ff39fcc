//! Browser implementations of [`Host`] and [`Scheduler`] over `web-sys`.

#![cfg(target_arch = "wasm32")]

use std::collections::HashMap;
use std::rc::Rc;
use std::time::Duration;

use error_stack::Report;
use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{Document, HtmlElement, HtmlInputElement, HtmlSelectElement, HtmlTextAreaElement, Window};

use crate::a11y::FOCUSABLE_SELECTOR;
use crate::config::RuntimeConfig;
use crate::css::SR_ONLY_CLASS;
use crate::dom::{self, DomSnapshot};
use crate::error::{Result, RuntimeError};
use crate::host::Host;
use crate::schedule::{Scheduler, Task, TimerId};
use crate::visibility::MarkerChange;

pub fn window() -> Result<Window> {
    web_sys::window().ok_or_else(|| Report::new(RuntimeError::Dom("no window".to_string())))
}

pub fn document() -> Result<Document> {
    window()?
        .document()
        .ok_or_else(|| Report::new(RuntimeError::Dom("no document".to_string())))
}

fn elements(list: &web_sys::NodeList) -> Vec<web_sys::Element> {
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<web_sys::Element>().ok())
        .collect()
}

fn query_all(scope: &web_sys::Element, selector: &str) -> Vec<web_sys::Element> {
    scope
        .query_selector_all(selector)
        .map(|list| elements(&list))
        .unwrap_or_default()
}

/// Inline `display` of the overlay decides whether the modal is open.
pub fn is_overlay_visible(overlay: &web_sys::Element) -> bool {
    overlay
        .dyn_ref::<HtmlElement>()
        .and_then(|el| el.style().get_property_value("display").ok())
        .is_some_and(|display| !display.is_empty() && display != "none")
}

pub struct WebHost {
    document: Document,
    /// Elements of the last capture, indexed by `NodeId`
    captured: Vec<web_sys::Element>,
}

impl WebHost {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            captured: Vec::new(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    fn overlay(&self, config: &RuntimeConfig) -> Option<web_sys::Element> {
        self.document.get_element_by_id(&config.overlay_id)
    }

    fn record(element: &web_sys::Element) -> dom::Element {
        let mut record = dom::Element::new(&element.tag_name());
        for name in element.get_attribute_names().iter().filter_map(|n| n.as_string()) {
            let value = element.get_attribute(&name).unwrap_or_default();
            record = if name == "class" {
                record.class(&value)
            } else {
                record.attr(&name, &value)
            };
        }
        if let Some(select) = element.dyn_ref::<HtmlSelectElement>() {
            record = record.value(&select.value());
        } else if let Some(input) = element.dyn_ref::<HtmlInputElement>() {
            record = record.value(&input.value()).checked(input.checked());
        } else if let Some(area) = element.dyn_ref::<HtmlTextAreaElement>() {
            record = record.value(&area.value());
        }
        record
    }
}

impl Host for WebHost {
    type Handle = web_sys::Element;

    fn capture(&mut self) -> DomSnapshot {
        let mut snapshot = DomSnapshot::new();
        self.captured.clear();
        let Some(body) = self.document.body() else {
            return snapshot;
        };
        let body: web_sys::Element = body.into();
        self.captured.push(body.clone());

        let active = self.document.active_element();
        let mut stack = vec![(body, snapshot.root())];
        while let Some((element, id)) = stack.pop() {
            let children = element.children();
            let mut appended = Vec::new();
            for i in 0..children.length() {
                let Some(child) = children.item(i) else {
                    continue;
                };
                let child_id = snapshot.append(id, Self::record(&child));
                self.captured.push(child.clone());
                if active.as_ref() == Some(&child) {
                    snapshot.set_active(Some(child_id));
                }
                appended.push((child, child_id));
            }
            stack.extend(appended.into_iter().rev());
        }
        snapshot
    }

    fn apply_markers(&mut self, class: &str, changes: &[MarkerChange]) {
        for change in changes {
            let Some(element) = self.captured.get(change.node.0) else {
                continue;
            };
            if let Err(err) = element.class_list().toggle_with_force(class, change.hidden) {
                web_sys::console::warn_2(&"Failed to toggle marker class".into(), &err);
            }
        }
    }

    fn active_element(&self) -> Option<web_sys::Element> {
        self.document.active_element()
    }

    fn focus(&mut self, target: &web_sys::Element) -> bool {
        let Some(el) = target.dyn_ref::<HtmlElement>() else {
            return false;
        };
        el.focus().is_ok() && self.document.active_element().as_ref() == Some(target)
    }

    fn click(&mut self, target: &web_sys::Element) {
        if let Some(el) = target.dyn_ref::<HtmlElement>() {
            el.click();
        }
    }

    fn can_focus(&self, target: &web_sys::Element) -> bool {
        target.is_connected()
            && target.matches(FOCUSABLE_SELECTOR).unwrap_or(false)
            && target.closest("[hidden]").ok().flatten().is_none()
    }

    fn overlay_focusables(&self, config: &RuntimeConfig) -> Vec<web_sys::Element> {
        let Some(overlay) = self.overlay(config) else {
            return Vec::new();
        };
        query_all(&overlay, FOCUSABLE_SELECTOR)
            .into_iter()
            .filter(|el| self.can_focus(el))
            .collect()
    }

    fn overlay_close_control(&self, config: &RuntimeConfig) -> Option<web_sys::Element> {
        self.overlay(config)?
            .query_selector(&format!(".{}", config.modal_close_class))
            .ok()
            .flatten()
    }

    fn tab_group(
        &self,
        target: &web_sys::Element,
        config: &RuntimeConfig,
    ) -> Option<Vec<web_sys::Element>> {
        if target.get_attribute("role").as_deref() != Some("tab") {
            return None;
        }
        let parent = target.parent_element()?;
        let container = parent
            .closest("[role=\"tablist\"]")
            .ok()
            .flatten()
            .or_else(|| {
                parent
                    .closest(&format!(".{}", config.tablist_fallback_class))
                    .ok()
                    .flatten()
            })?;
        Some(query_all(&container, "[role=\"tab\"]"))
    }

    fn is_filter_control(&self, target: &web_sys::Element, config: &RuntimeConfig) -> bool {
        if target.dyn_ref::<HtmlSelectElement>().is_some() {
            return true;
        }
        if let Some(input) = target.dyn_ref::<HtmlInputElement>()
            && matches!(input.type_().as_str(), "radio" | "checkbox")
        {
            return true;
        }
        target
            .closest(&format!("[{}]", config.filter_var_attr))
            .ok()
            .flatten()
            .is_some()
    }

    fn ensure_live_region(&mut self, config: &RuntimeConfig) {
        if self.document.get_element_by_id(&config.live_region_id).is_some() {
            return;
        }
        let (Some(body), Ok(region)) = (self.document.body(), self.document.create_element("div"))
        else {
            return;
        };
        region.set_id(&config.live_region_id);
        region.set_class_name(SR_ONLY_CLASS);
        for (name, value) in [
            ("role", "status"),
            ("aria-live", "polite"),
            ("aria-atomic", "true"),
        ] {
            if let Err(err) = region.set_attribute(name, value) {
                web_sys::console::warn_2(&format!("Failed to set live region {name}").into(), &err);
            }
        }
        if let Err(err) = body.append_child(&region) {
            web_sys::console::warn_2(&"Failed to create live region".into(), &err);
        }
    }

    fn set_live_text(&mut self, config: &RuntimeConfig, text: &str) {
        if let Some(region) = self.document.get_element_by_id(&config.live_region_id) {
            region.set_text_content(Some(text));
        }
    }
}

#[derive(Clone, Copy, Debug)]
enum Handle {
    Timeout(i32),
    Frame(i32),
}

/// `setTimeout` / `requestAnimationFrame` scheduler. Fired tasks are handed
/// to `dispatch`, which must call [`WebScheduler::fired`].
pub struct WebScheduler {
    window: Window,
    dispatch: Rc<dyn Fn(TimerId, Task)>,
    next_id: u64,
    handles: HashMap<TimerId, Handle>,
}

impl WebScheduler {
    pub fn new(window: Window, dispatch: impl Fn(TimerId, Task) + 'static) -> Self {
        Self {
            window,
            dispatch: Rc::new(dispatch),
            next_id: 0,
            handles: HashMap::new(),
        }
    }

    /// Forget a timer the browser already ran.
    pub fn fired(&mut self, id: TimerId) {
        self.handles.remove(&id);
    }

    fn callback(&mut self, task: Task) -> (TimerId, wasm_bindgen::JsValue) {
        self.next_id += 1;
        let id = TimerId(self.next_id);
        let dispatch = Rc::clone(&self.dispatch);
        (id, Closure::once_into_js(move || dispatch(id, task)))
    }
}

impl Scheduler for WebScheduler {
    fn schedule(&mut self, delay: Duration, task: Task) -> TimerId {
        let (id, callback) = self.callback(task);
        let millis = i32::try_from(delay.as_millis()).unwrap_or(i32::MAX);
        match self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(callback.unchecked_ref(), millis)
        {
            Ok(handle) => {
                self.handles.insert(id, Handle::Timeout(handle));
            }
            Err(err) => web_sys::console::warn_2(&"setTimeout failed".into(), &err),
        }
        id
    }

    fn schedule_frame(&mut self, task: Task) -> TimerId {
        let (id, callback) = self.callback(task);
        match self.window.request_animation_frame(callback.unchecked_ref()) {
            Ok(handle) => {
                self.handles.insert(id, Handle::Frame(handle));
            }
            Err(err) => web_sys::console::warn_2(&"requestAnimationFrame failed".into(), &err),
        }
        id
    }

    fn cancel(&mut self, id: TimerId) {
        match self.handles.remove(&id) {
            Some(Handle::Timeout(handle)) => self.window.clear_timeout_with_handle(handle),
            Some(Handle::Frame(handle)) => {
                if let Err(err) = self.window.cancel_animation_frame(handle) {
                    web_sys::console::warn_2(&"cancelAnimationFrame failed".into(), &err);
                }
            }
            None => {}
        }
    }
}
