//! WASM API exports for JavaScript interop
//!
//! [`DashboardrRuntime`] attaches the runtime to the current page: it injects
//! the marker stylesheet, registers `change`/`keydown` listeners on the
//! document and a `MutationObserver` on the modal overlay, and forwards
//! everything to [`Runtime::handle`]. It is only compiled when targeting
//! wasm32.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use error_stack::Report;
use wasm_bindgen::prelude::*;
use web_sys::{Document, KeyboardEvent, MutationObserver, MutationObserverInit};

use crate::config::{CONFIG_ELEMENT_ID, RuntimeConfig};
use crate::css::hidden_marker_css;
use crate::error::{Result, RuntimeError};
use crate::events::{Event, Key, Response};
use crate::host::Host;
use crate::runtime::Runtime;
use crate::visibility::PassReport;
use crate::web::{self, WebHost, WebScheduler, is_overlay_visible};

const STYLE_ELEMENT_ID: &str = "dashboardr-runtime-css";

type Listener = Closure<dyn FnMut(web_sys::Event)>;
type ObserverCallback = Closure<dyn FnMut(js_sys::Array, MutationObserver)>;

struct Page {
    runtime: Runtime<WebHost>,
    host: WebHost,
    timers: WebScheduler,
    listeners: Vec<(&'static str, Listener)>,
    /// Style observer on the overlay
    observer: Option<(MutationObserver, ObserverCallback)>,
    /// Body observer waiting for the overlay to be inserted
    overlay_watch: Option<(MutationObserver, ObserverCallback)>,
}

/// JavaScript-accessible page runtime
#[wasm_bindgen]
pub struct DashboardrRuntime {
    page: Option<Rc<RefCell<Page>>>,
}

impl Default for DashboardrRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl DashboardrRuntime {
    #[wasm_bindgen(constructor)]
    pub fn new() -> DashboardrRuntime {
        console_error_panic_hook::set_once();
        DashboardrRuntime { page: None }
    }

    /// Attach to the page.
    ///
    /// # Arguments
    /// * `config_json` - Runtime configuration; when omitted the inline
    ///   `<script id="dashboardr-config">` element is read, then defaults apply
    #[wasm_bindgen]
    pub fn start(&mut self, config_json: Option<String>) -> std::result::Result<(), JsValue> {
        if self.page.is_some() {
            web_sys::console::warn_1(&"Runtime already started".into());
            return Ok(());
        }
        let window = web::window().map_err(to_js)?;
        let document = web::document().map_err(to_js)?;
        let config = load_config(&document, config_json).map_err(to_js)?;
        inject_css(&document, &config).map_err(to_js)?;

        let page = Rc::new_cyclic(|weak: &Weak<RefCell<Page>>| {
            let weak = weak.clone();
            let timers = WebScheduler::new(window, move |id, task| {
                dispatch(&weak, Event::Timer { id, task });
            });
            RefCell::new(Page {
                runtime: Runtime::new(config),
                host: WebHost::new(document.clone()),
                timers,
                listeners: Vec::new(),
                observer: None,
                overlay_watch: None,
            })
        });
        listen(&page, &document).map_err(to_js)?;

        if document.ready_state() == "loading" {
            let weak = Rc::downgrade(&page);
            let on_ready: Listener = Closure::new(move |_: web_sys::Event| {
                if let Some(page) = weak.upgrade() {
                    init(&page);
                }
            });
            document
                .add_event_listener_with_callback("DOMContentLoaded", on_ready.as_ref().unchecked_ref())?;
            page.borrow_mut().listeners.push(("DOMContentLoaded", on_ready));
        } else {
            init(&page);
        }
        self.page = Some(page);
        Ok(())
    }

    /// Run a visibility pass now and return its report as JSON
    #[wasm_bindgen]
    pub fn reevaluate(&self) -> std::result::Result<Option<String>, JsValue> {
        let Some(page) = &self.page else {
            return Ok(None);
        };
        let mut page = page
            .try_borrow_mut()
            .map_err(|_| JsValue::from_str("Runtime is busy"))?;
        let Page { runtime, host, .. } = &mut *page;
        let Some(report) = runtime.reevaluate(host) else {
            return Ok(None);
        };
        warn_diagnostics(&report);
        serde_json::to_string(&report)
            .map(Some)
            .map_err(|e| JsValue::from_str(&format!("Failed to serialize report: {}", e)))
    }

    /// Capture the page as snapshot JSON for offline inspection
    #[wasm_bindgen(js_name = captureSnapshot)]
    pub fn capture_snapshot(&self) -> std::result::Result<String, JsValue> {
        let mut host = WebHost::new(web::document().map_err(to_js)?);
        host.capture().to_json().map_err(to_js)
    }

    /// Cancel timers and remove every listener
    #[wasm_bindgen]
    pub fn teardown(&mut self) {
        let Some(page) = self.page.take() else {
            return;
        };
        let Ok(mut page) = page.try_borrow_mut() else {
            web_sys::console::warn_1(&"Runtime is busy, teardown skipped".into());
            return;
        };
        let Page {
            runtime,
            host,
            timers,
            listeners,
            observer,
            overlay_watch,
        } = &mut *page;
        runtime.teardown(timers);
        for (name, listener) in listeners.drain(..) {
            if let Err(err) = host
                .document()
                .remove_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
            {
                web_sys::console::warn_2(&format!("Failed to remove {name} listener").into(), &err);
            }
        }
        for (observer, _) in [observer.take(), overlay_watch.take()].into_iter().flatten() {
            observer.disconnect();
        }
    }

    #[wasm_bindgen(getter, js_name = isStarted)]
    pub fn is_started(&self) -> bool {
        self.page.is_some()
    }
}

fn to_js(report: Report<RuntimeError>) -> JsValue {
    JsValue::from_str(&format!("{report:?}"))
}

fn load_config(document: &Document, explicit: Option<String>) -> Result<RuntimeConfig> {
    if let Some(json) = explicit {
        return RuntimeConfig::from_json(&json);
    }
    match document
        .get_element_by_id(CONFIG_ELEMENT_ID)
        .and_then(|el| el.text_content())
    {
        Some(json) if !json.trim().is_empty() => RuntimeConfig::from_json(&json),
        _ => Ok(RuntimeConfig::default()),
    }
}

fn inject_css(document: &Document, config: &RuntimeConfig) -> Result<()> {
    if document.get_element_by_id(STYLE_ELEMENT_ID).is_some() {
        return Ok(());
    }
    let dom_err = |e: JsValue| Report::new(RuntimeError::Dom(format!("{e:?}")));
    let style = document.create_element("style").map_err(dom_err)?;
    style.set_id(STYLE_ELEMENT_ID);
    style.set_text_content(Some(&hidden_marker_css(config)));
    let parent: web_sys::Element = match document.head() {
        Some(head) => head.into(),
        None => document
            .body()
            .ok_or_else(|| Report::new(RuntimeError::Dom("no body".to_string())))?
            .into(),
    };
    parent.append_child(&style).map_err(dom_err)?;
    Ok(())
}

fn warn_diagnostics(report: &PassReport) {
    for diagnostic in &report.diagnostics {
        web_sys::console::warn_1(&format!("dashboardr: {}", diagnostic.message).into());
    }
}

fn dispatch(page: &Weak<RefCell<Page>>, event: Event<web_sys::Element>) -> Response {
    let Some(page) = page.upgrade() else {
        return Response::default();
    };
    let Ok(mut page) = page.try_borrow_mut() else {
        web_sys::console::warn_1(&"dashboardr: event dropped while busy".into());
        return Response::default();
    };
    let Page {
        runtime,
        host,
        timers,
        ..
    } = &mut *page;
    if let Event::Timer { id, .. } = &event {
        timers.fired(*id);
    }
    let response = runtime.handle(event, host, timers);
    if let Some(report) = &response.report {
        warn_diagnostics(report);
    }
    response
}

fn init(page: &Rc<RefCell<Page>>) {
    {
        let Ok(mut guard) = page.try_borrow_mut() else {
            return;
        };
        let Page {
            runtime,
            host,
            timers,
            ..
        } = &mut *guard;
        let report = runtime.init(host, timers);
        warn_diagnostics(&report);
    }
    if let Err(err) = observe_overlay(page) {
        web_sys::console::warn_1(&format!("{err:?}").into());
    }
}

fn listen(page: &Rc<RefCell<Page>>, document: &Document) -> Result<()> {
    let weak = Rc::downgrade(page);
    let on_change: Listener = Closure::new(move |event: web_sys::Event| {
        let target = event
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok());
        dispatch(&weak, Event::Change { target });
    });

    let weak = Rc::downgrade(page);
    let on_keydown: Listener = Closure::new(move |event: web_sys::Event| {
        let Some(keyboard) = event.dyn_ref::<KeyboardEvent>() else {
            return;
        };
        let key = Key::from_name(&keyboard.key());
        if key == Key::Other {
            return;
        }
        let Some(target) = event
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
        else {
            return;
        };
        let shift = keyboard.shift_key();
        if dispatch(&weak, Event::KeyDown { target, key, shift }).prevent_default {
            event.prevent_default();
        }
    });

    let mut guard = page.borrow_mut();
    for (name, listener) in [("change", on_change), ("keydown", on_keydown)] {
        document
            .add_event_listener_with_callback(name, listener.as_ref().unchecked_ref())
            .map_err(|e| Report::new(RuntimeError::Dom(format!("{e:?}"))))?;
        guard.listeners.push((name, listener));
    }
    Ok(())
}

/// Attach the style observer to the overlay. When the overlay is not in the
/// document yet, watch the body and attach once it is inserted.
fn observe_overlay(page: &Rc<RefCell<Page>>) -> Result<()> {
    let dom_err = |e: JsValue| Report::new(RuntimeError::Dom(format!("{e:?}")));
    let mut guard = page
        .try_borrow_mut()
        .map_err(|_| Report::new(RuntimeError::Dom("runtime is busy".to_string())))?;
    if guard.observer.is_some() {
        return Ok(());
    }
    let document = guard.host.document().clone();
    let overlay_id = guard.runtime.config().overlay_id.clone();

    let Some(overlay) = document.get_element_by_id(&overlay_id) else {
        if guard.overlay_watch.is_some() {
            return Ok(());
        }
        let Some(body) = document.body() else {
            return Err(Report::new(RuntimeError::Dom("no body".to_string())));
        };
        let weak = Rc::downgrade(page);
        let callback: ObserverCallback = Closure::new(move |_: js_sys::Array, _: MutationObserver| {
            let Some(page) = weak.upgrade() else {
                return;
            };
            if let Err(err) = observe_overlay(&page) {
                web_sys::console::warn_1(&format!("{err:?}").into());
            }
        });
        let watch = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(dom_err)?;
        let options = MutationObserverInit::new();
        options.set_child_list(true);
        options.set_subtree(true);
        watch.observe_with_options(&body, &options).map_err(dom_err)?;
        guard.overlay_watch = Some((watch, callback));
        web_sys::console::debug_1(
            &format!("dashboardr: #{overlay_id} not found, waiting for it to be inserted").into(),
        );
        return Ok(());
    };

    let weak = Rc::downgrade(page);
    let target = overlay.clone();
    let callback: ObserverCallback = Closure::new(move |_: js_sys::Array, _: MutationObserver| {
        let visible = is_overlay_visible(&target);
        dispatch(&weak, Event::OverlayStyleChanged { visible });
    });
    let observer = MutationObserver::new(callback.as_ref().unchecked_ref()).map_err(dom_err)?;
    let options = MutationObserverInit::new();
    options.set_attributes(true);
    options.set_attribute_filter(&js_sys::Array::of1(&"style".into()));
    observer
        .observe_with_options(&overlay, &options)
        .map_err(dom_err)?;
    guard.observer = Some((observer, callback));
    // Stop scanning insertions; the closure stays owned until teardown.
    if let Some((watch, _)) = &guard.overlay_watch {
        watch.disconnect();
    }
    drop(guard);

    if is_overlay_visible(&overlay) {
        dispatch(&Rc::downgrade(page), Event::OverlayStyleChanged { visible: true });
    }
    Ok(())
}
