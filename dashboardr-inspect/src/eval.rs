//! `eval`: one visibility pass over a snapshot

use std::fmt::Write;

use dashboardr::config::RuntimeConfig;
use dashboardr::dom::DomSnapshot;
use dashboardr::inputs::collect_inputs;
use dashboardr::visibility::{NodeKind, PassReport, propagate};
use tracing::debug;

use crate::describe::describe;

/// Collect inputs, apply overrides and propagate. Empty override values
/// remove the variable.
pub fn evaluate(
    doc: &DomSnapshot,
    overrides: &[(String, String)],
    config: &RuntimeConfig,
) -> PassReport {
    let mut inputs = collect_inputs(doc, config);
    for (var, value) in overrides {
        if value.is_empty() {
            inputs.remove(var);
        } else {
            inputs.insert(var.as_str(), value.as_str());
        }
    }
    debug!(inputs = inputs.len(), overrides = overrides.len(), "Evaluating snapshot");
    propagate(doc, &inputs, config)
}

pub fn render_text(doc: &DomSnapshot, report: &PassReport, config: &RuntimeConfig) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "Inputs:");
    if report.inputs.is_empty() {
        let _ = writeln!(out, "  (none)");
    }
    for (var, value) in report.inputs.iter() {
        let _ = writeln!(out, "  {var} = {value}");
    }

    let _ = writeln!(
        out,
        "\nElements: {} visible, {} hidden",
        report.visible_count(),
        report.hidden_count()
    );
    for element in &report.elements {
        let state = match element.visible {
            Some(true) => "visible",
            Some(false) => "hidden",
            None if element.hidden => "invalid (hidden)",
            None => "invalid (visible)",
        };
        let condition = doc
            .get(element.node)
            .get_attr(&config.show_when_attr)
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "  {state:<18} {:<28} {condition}",
            describe(doc, element.node)
        );
    }

    if !report.containers.is_empty() {
        let _ = writeln!(out, "\nContainers:");
        for container in &report.containers {
            let kind = match container.kind {
                NodeKind::Card => "card",
                NodeKind::Grid => "grid",
                NodeKind::ShowWhen => "element",
            };
            let state = if container.hidden { "hidden" } else { "visible" };
            let _ = writeln!(
                out,
                "  {state:<18} {kind:<5} {}",
                describe(doc, container.node)
            );
        }
    }

    let _ = writeln!(out, "\nChanges: {}", report.changes.len());
    for diagnostic in &report.diagnostics {
        let _ = writeln!(
            out,
            "warning: {} at {}",
            diagnostic.message,
            describe(doc, diagnostic.node)
        );
    }
    out
}
