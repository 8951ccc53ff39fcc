//! Stylesheet backing the hidden marker class and the live region.

use crate::config::RuntimeConfig;

/// Visually hides the live region while keeping it in the accessibility tree.
pub const SR_ONLY_CLASS: &str = "dashboardr-sr-only";

/// CSS for the marker class. The class is doubled to outrank inline grid
/// rules, and grid children get their own rule since bslib sizes them
/// through `grid-template-*`.
pub fn hidden_marker_css(config: &RuntimeConfig) -> String {
    let class = &config.hidden_class;
    let grid = &config.grid_class;
    format!(
        ".{class}, .{class}.{class} {{
  display: none !important;
  height: 0 !important;
  min-height: 0 !important;
  margin: 0 !important;
  padding: 0 !important;
  overflow: hidden !important;
}}
.{grid} > .{class} {{
  display: none !important;
  grid-row: auto !important;
}}
.{SR_ONLY_CLASS} {{
  position: absolute !important;
  width: 1px;
  height: 1px;
  padding: 0;
  margin: -1px;
  overflow: hidden;
  clip: rect(0, 0, 0, 0);
  white-space: nowrap;
  border: 0;
}}
"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stylesheet_targets_marker_class() {
        let css = hidden_marker_css(&RuntimeConfig::default());
        assert!(css.contains(".dashboardr-hidden.dashboardr-hidden {"));
        assert!(css.contains("display: none !important;"));
        assert!(css.contains(".bslib-grid > .dashboardr-hidden"));
        assert!(css.contains(".dashboardr-sr-only {"));
    }

    #[test]
    fn custom_class_names_are_used() {
        let config = RuntimeConfig {
            hidden_class: "is-off".to_string(),
            grid_class: "layout-grid".to_string(),
            ..RuntimeConfig::default()
        };
        let css = hidden_marker_css(&config);
        assert!(css.contains(".is-off, .is-off.is-off {"));
        assert!(css.contains(".layout-grid > .is-off"));
        assert!(!css.contains("dashboardr-hidden"));
    }
}
