//! Self-starting web bundle
//!
//! Compiled per site with the runtime configuration baked in at compile time
//! via include_str!. Loading the module attaches the runtime to the page.
//!
//! Note: This crate is only intended to be compiled for wasm32-unknown-unknown.

#![cfg(target_arch = "wasm32")]

use std::cell::RefCell;

use wasm_bindgen::prelude::*;

use dashboardr::config::RuntimeConfig;
use dashboardr::wasm_api::DashboardrRuntime;

/// The baked-in runtime configuration from build time
static RUNTIME_JSON: &str = include_str!(concat!(env!("OUT_DIR"), "/runtime.json"));

thread_local! {
    static RUNTIME: RefCell<Option<DashboardrRuntime>> = const { RefCell::new(None) };
}

/// Auto-start entry point when WASM module is loaded
#[wasm_bindgen(start)]
pub fn start() -> Result<(), JsValue> {
    console_error_panic_hook::set_once();

    let mut runtime = DashboardrRuntime::new();
    runtime.start(Some(RUNTIME_JSON.to_string()))?;
    RUNTIME.with(|slot| *slot.borrow_mut() = Some(runtime));
    Ok(())
}

/// Detach the auto-started runtime
#[wasm_bindgen]
pub fn stop() {
    RUNTIME.with(|slot| {
        if let Some(mut runtime) = slot.borrow_mut().take() {
            runtime.teardown();
        }
    });
}

/// Get the effective baked-in configuration as JSON (for debugging)
#[wasm_bindgen]
pub fn get_runtime_config() -> Result<String, JsValue> {
    let config: RuntimeConfig = serde_json::from_str(RUNTIME_JSON)
        .map_err(|e| JsValue::from_str(&format!("Failed to parse baked-in config: {}", e)))?;
    serde_json::to_string_pretty(&config)
        .map_err(|e| JsValue::from_str(&format!("Failed to serialize config: {}", e)))
}
