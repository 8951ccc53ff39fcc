//! `lint`: static checks over every show-when condition

use std::fmt::Write;

use dashboardr::condition::Condition;
use dashboardr::config::RuntimeConfig;
use dashboardr::dom::{DomSnapshot, NodeId};
use dashboardr::inputs::provided_variables;
use serde::Serialize;

use crate::describe::describe;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Finding {
    pub severity: Severity,
    pub node: NodeId,
    pub element: String,
    pub message: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct LintReport {
    pub conditions: usize,
    pub findings: Vec<Finding>,
}

impl LintReport {
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity == Severity::Error)
    }
}

/// Malformed JSON, unknown operators (always visible) and variables no
/// control reports are errors. Show-when elements inside a hidden subtree
/// are warnings.
pub fn lint(doc: &DomSnapshot, config: &RuntimeConfig) -> LintReport {
    let provided = provided_variables(doc, config);
    let mut report = LintReport::default();

    for node in doc.document_order() {
        let el = doc.get(node);
        let Some(source) = el.get_attr(&config.show_when_attr) else {
            continue;
        };
        report.conditions += 1;
        let mut push = |severity, message: String| {
            report.findings.push(Finding {
                severity,
                node,
                element: describe(doc, node),
                message,
            })
        };

        let condition = match Condition::parse(source) {
            Ok(condition) => condition,
            Err(err) => {
                push(Severity::Error, err.current_context().to_string());
                continue;
            }
        };
        for op in condition.unknown_operators() {
            push(
                Severity::Error,
                format!("Unknown operator '{op}' always evaluates true"),
            );
        }
        for var in condition.variables() {
            if !provided.contains(var) {
                push(
                    Severity::Error,
                    format!("No control provides variable '{var}'"),
                );
            }
        }
        if doc
            .closest(node, |e| e.attrs.contains_key("hidden"))
            .is_some()
        {
            push(
                Severity::Warning,
                "Element sits inside a `hidden` subtree".to_string(),
            );
        }
    }
    report
}

pub fn render_text(report: &LintReport) -> String {
    let mut out = String::new();
    for finding in &report.findings {
        let severity = match finding.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        let _ = writeln!(
            out,
            "{severity}: {} ({}, node {})",
            finding.message, finding.element, finding.node.0
        );
    }
    let errors = report
        .findings
        .iter()
        .filter(|f| f.severity == Severity::Error)
        .count();
    let _ = writeln!(
        out,
        "{} condition(s) checked, {} error(s), {} warning(s)",
        report.conditions,
        errors,
        report.findings.len() - errors
    );
    out
}
