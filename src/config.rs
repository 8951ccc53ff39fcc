//! Runtime configuration
//!
//! Every field has a default matching the markup emitted by the dashboard
//! builder, so an empty JSON object (`{}`) is a valid configuration.

use std::time::Duration;

use error_stack::ResultExt;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

/// Id of the inline `<script type="application/json">` element the web
/// adapter reads configuration from.
pub const CONFIG_ELEMENT_ID: &str = "dashboardr-config";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuntimeConfig {
    /// Attribute holding the serialized condition
    pub show_when_attr: String,
    /// Attribute naming a control explicitly
    pub input_id_attr: String,
    /// Attribute mapping a control (or a group wrapper) to a filter variable
    pub filter_var_attr: String,

    /// Marker class toggled on hidden elements
    pub hidden_class: String,
    pub card_classes: Vec<String>,
    pub grid_class: String,
    /// Grid wrappers carrying one of these classes are never hidden
    pub layout_classes: Vec<String>,

    pub overlay_id: String,
    pub modal_close_class: String,
    pub tablist_fallback_class: String,

    pub live_region_id: String,
    pub announce_message: String,
    pub announce_debounce_ms: u64,
    pub modal_focus_delay_ms: u64,
    /// Extra passes after init, for widgets that render asynchronously
    pub reevaluate_after_ms: Vec<u64>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            show_when_attr: "data-show-when".to_string(),
            input_id_attr: "data-input-id".to_string(),
            filter_var_attr: "data-filter-var".to_string(),
            hidden_class: "dashboardr-hidden".to_string(),
            card_classes: vec!["card".to_string(), "bslib-card".to_string()],
            grid_class: "bslib-grid".to_string(),
            layout_classes: vec!["sidebar-content".to_string(), "sidebar-layout".to_string()],
            overlay_id: "dashboardr-modal-overlay".to_string(),
            modal_close_class: "dashboardr-modal-close".to_string(),
            tablist_fallback_class: "nav-tabs".to_string(),
            live_region_id: "dashboardr-live-region".to_string(),
            announce_message: "Filters updated".to_string(),
            announce_debounce_ms: 500,
            modal_focus_delay_ms: 100,
            reevaluate_after_ms: vec![100, 500, 2000],
        }
    }
}

impl RuntimeConfig {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .change_context(RuntimeError::Config)
            .attach("Failed to parse runtime configuration JSON")
    }

    pub fn announce_debounce(&self) -> Duration {
        Duration::from_millis(self.announce_debounce_ms)
    }

    pub fn modal_focus_delay(&self) -> Duration {
        Duration::from_millis(self.modal_focus_delay_ms)
    }

    pub fn reevaluate_delays(&self) -> impl Iterator<Item = Duration> + '_ {
        self.reevaluate_after_ms
            .iter()
            .map(|ms| Duration::from_millis(*ms))
    }

    pub fn is_card_class(&self, class: &str) -> bool {
        self.card_classes.iter().any(|c| c == class)
    }

    pub fn is_layout_class(&self, class: &str) -> bool {
        self.layout_classes.iter().any(|c| c == class)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_yields_defaults() {
        let config = RuntimeConfig::from_json("{}").unwrap();
        assert_eq!(config, RuntimeConfig::default());
    }

    #[test]
    fn partial_override_keeps_other_defaults() {
        let config =
            RuntimeConfig::from_json(r#"{"hiddenClass":"is-hidden","reevaluateAfterMs":[250]}"#)
                .unwrap();
        assert_eq!(config.hidden_class, "is-hidden");
        assert_eq!(config.reevaluate_after_ms, vec![250]);
        assert_eq!(config.grid_class, "bslib-grid");
    }

    #[test]
    fn invalid_json_is_a_config_error() {
        let err = RuntimeConfig::from_json("{hidden").unwrap_err();
        assert_eq!(err.current_context(), &RuntimeError::Config);
    }
}
