//! Show/hide evaluation and container cascade.
//!
//! [`propagate`] is pure: it reads a snapshot and the collected inputs and
//! returns the marker transitions to apply. [`run_pass`] wires it to a
//! [`Host`] (capture, collect, propagate, apply).
//!
//! Order matters. Show-when elements are resolved first, then cards (by
//! nearest card ancestor), then grid wrappers from the innermost outwards so
//! that a parent grid sees its children's final state.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::condition::Condition;
use crate::config::RuntimeConfig;
use crate::dom::{DomSnapshot, NodeId};
use crate::host::Host;
use crate::inputs::{InputMap, collect_inputs};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    ShowWhen,
    Card,
    Grid,
}

/// A marker class transition on one element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkerChange {
    pub node: NodeId,
    pub kind: NodeKind,
    pub hidden: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticLevel {
    Warning,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub node: NodeId,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementOutcome {
    pub node: NodeId,
    /// `None` when the condition could not be parsed
    pub visible: Option<bool>,
    pub hidden: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerOutcome {
    pub node: NodeId,
    pub kind: NodeKind,
    pub hidden: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    pub inputs: InputMap,
    pub elements: Vec<ElementOutcome>,
    pub containers: Vec<ContainerOutcome>,
    pub changes: Vec<MarkerChange>,
    pub diagnostics: Vec<Diagnostic>,
}

impl PassReport {
    pub fn visible_count(&self) -> usize {
        self.elements.iter().filter(|e| !e.hidden).count()
    }

    pub fn hidden_count(&self) -> usize {
        self.elements.iter().filter(|e| e.hidden).count()
    }

    pub fn is_hidden(&self, node: NodeId) -> Option<bool> {
        self.elements
            .iter()
            .find(|e| e.node == node)
            .map(|e| e.hidden)
            .or_else(|| {
                self.containers
                    .iter()
                    .find(|c| c.node == node)
                    .map(|c| c.hidden)
            })
    }
}

struct MarkerState<'a> {
    class: &'a str,
    initial: HashSet<NodeId>,
    hidden: HashSet<NodeId>,
    touched: Vec<(NodeId, NodeKind)>,
}

impl<'a> MarkerState<'a> {
    fn new(doc: &DomSnapshot, class: &'a str) -> Self {
        let initial: HashSet<NodeId> = doc
            .document_order()
            .into_iter()
            .filter(|n| doc.has_class(*n, class))
            .collect();
        Self {
            class,
            hidden: initial.clone(),
            initial,
            touched: Vec::new(),
        }
    }

    fn is_hidden(&self, node: NodeId) -> bool {
        self.hidden.contains(&node)
    }

    fn set(&mut self, node: NodeId, kind: NodeKind, hidden: bool) {
        if hidden {
            self.hidden.insert(node);
        } else {
            self.hidden.remove(&node);
        }
        if !self.touched.iter().any(|(n, _)| *n == node) {
            self.touched.push((node, kind));
        }
    }

    fn changes(&self) -> Vec<MarkerChange> {
        self.touched
            .iter()
            .filter_map(|(node, kind)| {
                let hidden = self.is_hidden(*node);
                (hidden != self.initial.contains(node)).then_some(MarkerChange {
                    node: *node,
                    kind: *kind,
                    hidden,
                })
            })
            .collect()
    }
}

/// Evaluate every show-when element against `inputs` and cascade the result
/// to cards and grids. Only real transitions are listed in `changes`, so a
/// second pass over the updated snapshot yields none.
pub fn propagate(doc: &DomSnapshot, inputs: &InputMap, config: &RuntimeConfig) -> PassReport {
    let mut state = MarkerState::new(doc, &config.hidden_class);
    let mut report = PassReport {
        inputs: inputs.clone(),
        ..PassReport::default()
    };

    let order = doc.document_order();
    let show_when: Vec<NodeId> = order
        .iter()
        .copied()
        .filter(|n| doc.get(*n).attrs.contains_key(&config.show_when_attr))
        .collect();

    for &node in &show_when {
        let source = doc.get(node).get_attr(&config.show_when_attr).unwrap_or_default();
        match Condition::parse(source) {
            Ok(condition) => {
                let visible = condition.evaluate(inputs);
                state.set(node, NodeKind::ShowWhen, !visible);
                report.elements.push(ElementOutcome {
                    node,
                    visible: Some(visible),
                    hidden: !visible,
                });
            }
            Err(err) => {
                let message = format!("{}: {source}", err.current_context());
                warn!(node = node.0, "Ignoring show-when condition. {}", message);
                report.diagnostics.push(Diagnostic {
                    level: DiagnosticLevel::Warning,
                    node,
                    message,
                });
                report.elements.push(ElementOutcome {
                    node,
                    visible: None,
                    hidden: state.is_hidden(node),
                });
            }
        }
    }

    // Cards: group members by nearest card ancestor, first-seen order
    let mut card_order: Vec<NodeId> = Vec::new();
    let mut members: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for &node in &show_when {
        let Some(card) =
            doc.closest_ancestor(node, |e| e.classes.iter().any(|c| config.is_card_class(c)))
        else {
            continue;
        };
        members
            .entry(card)
            .or_insert_with(|| {
                card_order.push(card);
                Vec::new()
            })
            .push(node);
    }
    for card in card_order {
        let all_hidden = members[&card].iter().all(|m| state.is_hidden(*m));
        state.set(card, NodeKind::Card, all_hidden);
        report.containers.push(ContainerOutcome {
            node: card,
            kind: NodeKind::Card,
            hidden: all_hidden,
        });
    }

    // Grids: innermost first
    for &grid in order.iter().rev() {
        let el = doc.get(grid);
        if !el.has_class(&config.grid_class) {
            continue;
        }
        if el.classes.iter().any(|c| config.is_layout_class(c)) {
            continue;
        }
        let children = doc.children(grid);
        let hidden = !children.is_empty() && children.iter().all(|c| state.is_hidden(*c));
        state.set(grid, NodeKind::Grid, hidden);
        report.containers.push(ContainerOutcome {
            node: grid,
            kind: NodeKind::Grid,
            hidden,
        });
    }

    report.changes = state.changes();
    debug!(
        class = state.class,
        elements = report.elements.len(),
        hidden = report.hidden_count(),
        changes = report.changes.len(),
        "Visibility pass complete"
    );
    report
}

/// Capture the page, collect inputs, propagate and apply the transitions.
pub fn run_pass<H: Host>(host: &mut H, config: &RuntimeConfig) -> PassReport {
    let snapshot = host.capture();
    let inputs = collect_inputs(&snapshot, config);
    let report = propagate(&snapshot, &inputs, config);
    if !report.changes.is_empty() {
        host.apply_markers(&config.hidden_class, &report.changes);
    }
    report
}


#[cfg(test)]
mod proptest_tests {
    use super::*;
    use crate::dom::Element;
    use proptest::prelude::*;

    #[derive(Clone, Debug)]
    enum Shape {
        Leaf(bool),
        Card(Vec<Shape>),
        Grid(Vec<Shape>),
        Plain(Vec<Shape>),
    }

    fn arbitrary_shape() -> impl Strategy<Value = Shape> {
        any::<bool>()
            .prop_map(Shape::Leaf)
            .prop_recursive(4, 40, 4, |inner| {
                prop_oneof![
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Shape::Card),
                    prop::collection::vec(inner.clone(), 0..4).prop_map(Shape::Grid),
                    prop::collection::vec(inner, 0..4).prop_map(Shape::Plain),
                ]
            })
    }

    const SHOWN: &str = r#"{"var":"v","op":"eq","val":"on"}"#;
    const HIDDEN: &str = r#"{"var":"v","op":"eq","val":"off"}"#;

    fn build(doc: &mut DomSnapshot, parent: NodeId, shape: &Shape) {
        let (el, children) = match shape {
            Shape::Leaf(visible) => (
                Element::new("div").attr("data-show-when", if *visible { SHOWN } else { HIDDEN }),
                &[][..],
            ),
            Shape::Card(c) => (Element::new("div").class("card"), c.as_slice()),
            Shape::Grid(c) => (Element::new("div").class("bslib-grid"), c.as_slice()),
            Shape::Plain(c) => (Element::new("div"), c.as_slice()),
        };
        let node = doc.append(parent, el);
        for child in children {
            build(doc, node, child);
        }
    }

    fn page(shape: &Shape) -> DomSnapshot {
        let mut doc = DomSnapshot::new();
        let root = doc.root();
        build(&mut doc, root, shape);
        doc
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn pass_is_idempotent(shape in arbitrary_shape()) {
            let config = RuntimeConfig::default();
            let inputs: InputMap = [("v", "on")].into_iter().collect();
            let mut doc = page(&shape);
            let first = propagate(&doc, &inputs, &config);
            doc.apply_markers(&config.hidden_class, &first.changes);
            let after_first = doc.clone();
            let second = propagate(&doc, &inputs, &config);
            prop_assert!(second.changes.is_empty());
            doc.apply_markers(&config.hidden_class, &second.changes);
            prop_assert_eq!(doc, after_first);
        }

        #[test]
        fn card_hidden_iff_all_members_hidden(shape in arbitrary_shape()) {
            let config = RuntimeConfig::default();
            let inputs: InputMap = [("v", "on")].into_iter().collect();
            let mut doc = page(&shape);
            let report = propagate(&doc, &inputs, &config);
            doc.apply_markers(&config.hidden_class, &report.changes);

            for container in report.containers.iter().filter(|c| c.kind == NodeKind::Card) {
                let members: Vec<NodeId> = doc
                    .descendants(container.node)
                    .into_iter()
                    .filter(|n| doc.get(*n).attrs.contains_key("data-show-when"))
                    .filter(|n| {
                        doc.closest_ancestor(*n, |e| e.has_class("card")) == Some(container.node)
                    })
                    .collect();
                let all_hidden = members.iter().all(|m| doc.has_class(*m, "dashboardr-hidden"));
                prop_assert_eq!(container.hidden, all_hidden);
                prop_assert_eq!(doc.has_class(container.node, "dashboardr-hidden"), all_hidden);
            }
        }
    }
}
