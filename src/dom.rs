//! Serializable snapshot of a page's element tree.
//!
//! The visibility pass is a pure function over a [`DomSnapshot`]. The same
//! type doubles as an in-memory document: tests and the inspector build
//! snapshots by hand or load them from JSON captured in the browser.

use std::collections::BTreeMap;

use error_stack::ResultExt;
use serde::{Deserialize, Serialize};

use crate::error::{Result, RuntimeError};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Element {
    /// Lowercase tag name
    pub tag: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub classes: Vec<String>,
    /// All attributes except `class`
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attrs: BTreeMap<String, String>,
    /// Live value of a form control (may differ from the `value` attribute)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub checked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<NodeId>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            ..Self::default()
        }
    }

    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    pub fn class(mut self, class: &str) -> Self {
        for c in class.split_whitespace() {
            if !self.has_class(c) {
                self.classes.push(c.to_string());
            }
        }
        self
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        self.attrs.insert(name.to_string(), value.to_string());
        self
    }

    pub fn value(mut self, value: &str) -> Self {
        self.value = Some(value.to_string());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn get_attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    pub fn element_id(&self) -> Option<&str> {
        self.get_attr("id").filter(|id| !id.is_empty())
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.iter().any(|c| c == class)
    }

    pub fn is_disabled(&self) -> bool {
        self.attrs.contains_key("disabled")
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DomSnapshot {
    nodes: Vec<Element>,
    /// Element holding keyboard focus
    #[serde(default, skip_serializing_if = "Option::is_none")]
    active: Option<NodeId>,
    /// Elements that received a synthetic click, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    clicks: Vec<NodeId>,
}

impl Default for DomSnapshot {
    fn default() -> Self {
        Self::new()
    }
}

impl DomSnapshot {
    /// A document with an empty `<body>` root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Element::new("body")],
            active: None,
            clicks: Vec::new(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(json)
            .change_context(RuntimeError::Snapshot)
            .attach("Failed to parse page snapshot JSON")?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self)
            .change_context(RuntimeError::Snapshot)
            .attach("Failed to serialize page snapshot")
    }

    /// The arena must describe a forest: every parent/child link is
    /// mirrored on both ends, no node is listed twice and parent chains end.
    fn validate(&self) -> Result<()> {
        let invalid =
            |message: String| Err(error_stack::Report::new(RuntimeError::Snapshot).attach(message));
        let len = self.nodes.len();
        if len == 0 {
            return invalid("Snapshot has no root element".to_string());
        }
        if self.nodes[0].parent.is_some() {
            return invalid("Root element has a parent".to_string());
        }

        let mut listed_by: Vec<Option<usize>> = vec![None; len];
        for (index, node) in self.nodes.iter().enumerate() {
            if node.parent.is_some_and(|p| p.0 >= len) {
                return invalid(format!("Node {index} references a missing node"));
            }
            for child in &node.children {
                if child.0 >= len {
                    return invalid(format!("Node {index} references a missing node"));
                }
                if self.nodes[child.0].parent != Some(NodeId(index)) {
                    return invalid(format!(
                        "Node {} is a child of node {index} but names a different parent",
                        child.0
                    ));
                }
                if listed_by[child.0].replace(index).is_some() {
                    return invalid(format!("Node {} is listed as a child twice", child.0));
                }
            }
        }
        for (index, node) in self.nodes.iter().enumerate() {
            if let Some(parent) = node.parent
                && listed_by[index] != Some(parent.0)
            {
                return invalid(format!(
                    "Node {index} names node {} as parent but is not among its children",
                    parent.0
                ));
            }
        }
        for index in 0..len {
            if self.ancestors(NodeId(index)).take(len).count() == len {
                return invalid(format!("Node {index} is part of a parent cycle"));
            }
        }

        if let Some(active) = self.active
            && active.0 >= len
        {
            return invalid(format!("Active element {} is missing", active.0));
        }
        if let Some(click) = self.clicks.iter().find(|c| c.0 >= len) {
            return invalid(format!("Clicked element {} is missing", click.0));
        }
        Ok(())
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn append(&mut self, parent: NodeId, mut element: Element) -> NodeId {
        let id = NodeId(self.nodes.len());
        element.parent = Some(parent);
        element.children.clear();
        self.nodes.push(element);
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Remove a subtree from the document. Ids stay valid but the nodes are
    /// no longer connected.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|c| *c != node);
        }
        if self.active.is_some_and(|a| a == node || self.is_inclusive_ancestor(node, a)) {
            self.active = None;
        }
    }

    pub fn get(&self, node: NodeId) -> &Element {
        &self.nodes[node.0]
    }

    pub fn get_mut(&mut self, node: NodeId) -> &mut Element {
        &mut self.nodes[node.0]
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Strict ancestors, nearest first.
    pub fn ancestors(&self, node: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(node), |n| self.parent(*n))
    }

    pub fn closest_ancestor(
        &self,
        node: NodeId,
        mut pred: impl FnMut(&Element) -> bool,
    ) -> Option<NodeId> {
        self.ancestors(node).find(|n| pred(self.get(*n)))
    }

    /// Like `Element.closest()`: the node itself or its nearest matching ancestor.
    pub fn closest(&self, node: NodeId, mut pred: impl FnMut(&Element) -> bool) -> Option<NodeId> {
        if pred(self.get(node)) {
            return Some(node);
        }
        self.closest_ancestor(node, pred)
    }

    fn is_inclusive_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        node == ancestor || self.ancestors(node).any(|a| a == ancestor)
    }

    pub fn is_connected(&self, node: NodeId) -> bool {
        node.0 < self.nodes.len() && self.is_inclusive_ancestor(self.root(), node)
    }

    /// Descendants of `node` in document order, excluding `node`.
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every connected element in document order, root first.
    pub fn document_order(&self) -> Vec<NodeId> {
        let root = self.root();
        let mut out = vec![root];
        out.extend(self.descendants(root));
        out
    }

    pub fn by_id(&self, id: &str) -> Option<NodeId> {
        self.document_order()
            .into_iter()
            .find(|n| self.get(*n).element_id() == Some(id))
    }

    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.get(node).has_class(class)
    }

    pub fn set_class(&mut self, node: NodeId, class: &str, present: bool) {
        let el = self.get_mut(node);
        if present {
            if !el.has_class(class) {
                el.classes.push(class.to_string());
            }
        } else {
            el.classes.retain(|c| c != class);
        }
    }

    pub fn active(&self) -> Option<NodeId> {
        self.active
    }

    pub fn set_active(&mut self, node: Option<NodeId>) {
        self.active = node;
    }

    pub fn clicks(&self) -> &[NodeId] {
        &self.clicks
    }

    pub(crate) fn record_click(&mut self, node: NodeId) {
        self.clicks.push(node);
    }

    /// Change a control's value the way a user interaction would.
    pub fn set_value(&mut self, node: NodeId, value: &str) {
        self.get_mut(node).value = Some(value.to_string());
    }

    /// Check a radio and uncheck the others sharing its `name`.
    pub fn check_radio(&mut self, node: NodeId) {
        let name = self.get(node).get_attr("name").map(str::to_string);
        if let Some(name) = name {
            for other in self.document_order() {
                let el = self.get(other);
                if el.tag == "input"
                    && el.get_attr("type") == Some("radio")
                    && el.get_attr("name") == Some(name.as_str())
                {
                    self.get_mut(other).checked = false;
                }
            }
        }
        self.get_mut(node).checked = true;
    }

    /// Keyboard-focusable: a connected, enabled control, link or element
    /// with a non-negative tabindex, not inside a `hidden` subtree.
    pub fn is_focusable(&self, node: NodeId) -> bool {
        if !self.is_connected(node) {
            return false;
        }
        let el = self.get(node);
        let tabindex = el.get_attr("tabindex").and_then(|t| t.trim().parse::<i32>().ok());
        if tabindex.is_some_and(|t| t < 0) {
            return false;
        }
        let natively = match el.tag.as_str() {
            "input" if el.get_attr("type") == Some("hidden") => return false,
            "button" | "input" | "select" | "textarea" => !el.is_disabled(),
            "a" => el.attrs.contains_key("href"),
            _ => false,
        };
        if !natively && tabindex.is_none() {
            return false;
        }
        let hidden_subtree = std::iter::once(node)
            .chain(self.ancestors(node))
            .any(|n| self.get(n).attrs.contains_key("hidden"));
        !hidden_subtree
    }
}
