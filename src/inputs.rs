//! Input collection: current filter values read from form controls.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::config::RuntimeConfig;
use crate::dom::{DomSnapshot, Element, NodeId};

/// Filter variable name -> current value. Rebuilt on every pass.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InputMap(BTreeMap<String, String>);

impl InputMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert a non-empty value; empty values are ignored.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let value = value.into();
        if !value.is_empty() {
            self.0.insert(key.into(), value);
        }
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for InputMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// One control that contributed (or could have contributed) a value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControlReading {
    pub node: NodeId,
    pub identifier: Option<String>,
    pub filter_var: Option<String>,
    pub value: String,
}

fn is_radio(el: &Element) -> bool {
    el.tag == "input" && el.get_attr("type") == Some("radio")
}

/// Identifier and filter variable a control reports under.
fn control_keys(
    doc: &DomSnapshot,
    node: NodeId,
    config: &RuntimeConfig,
) -> (Option<String>, Option<String>) {
    let el = doc.get(node);
    let identifier = [config.input_id_attr.as_str(), "name", "id"]
        .into_iter()
        .find_map(|attr| el.get_attr(attr).filter(|v| !v.is_empty()))
        .map(str::to_string);

    let filter_var = doc
        .closest(node, |e| e.attrs.contains_key(&config.filter_var_attr))
        .and_then(|n| doc.get(n).get_attr(&config.filter_var_attr))
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    (identifier, filter_var)
}

/// Read every `<select>` and every checked radio button, in document order.
pub fn read_controls(doc: &DomSnapshot, config: &RuntimeConfig) -> Vec<ControlReading> {
    doc.document_order()
        .into_iter()
        .filter_map(|node| {
            let el = doc.get(node);
            let is_select = el.tag == "select";
            let is_checked_radio = is_radio(el) && el.checked;
            if !is_select && !is_checked_radio {
                return None;
            }

            let (identifier, filter_var) = control_keys(doc, node, config);
            let value = el
                .value
                .clone()
                .or_else(|| el.get_attr("value").map(str::to_string))
                .unwrap_or_else(|| {
                    if is_checked_radio {
                        "on".to_string()
                    } else {
                        String::new()
                    }
                });

            Some(ControlReading {
                node,
                identifier,
                filter_var,
                value,
            })
        })
        .collect()
}

/// Every key some control can report under, whether or not it currently
/// holds a value. Unchecked radios count.
pub fn provided_variables(doc: &DomSnapshot, config: &RuntimeConfig) -> BTreeSet<String> {
    doc.document_order()
        .into_iter()
        .filter(|node| {
            let el = doc.get(*node);
            el.tag == "select" || is_radio(el)
        })
        .flat_map(|node| {
            let (identifier, filter_var) = control_keys(doc, node, config);
            identifier.into_iter().chain(filter_var)
        })
        .collect()
}

/// Build the filter mapping. Each value is stored under the control
/// identifier and then under its filter variable, so the filter variable
/// wins when both name the same key.
pub fn collect_inputs(doc: &DomSnapshot, config: &RuntimeConfig) -> InputMap {
    inputs_from_readings(&read_controls(doc, config))
}

pub fn inputs_from_readings(readings: &[ControlReading]) -> InputMap {
    let mut map = InputMap::new();
    for reading in readings {
        if reading.value.is_empty() {
            continue;
        }
        if let Some(id) = &reading.identifier {
            map.insert(id.as_str(), reading.value.as_str());
        }
        if let Some(var) = &reading.filter_var {
            map.insert(var.as_str(), reading.value.as_str());
        }
    }
    map
}
