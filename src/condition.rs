//! Boolean condition language carried by `data-show-when` attributes.
//!
//! A condition is JSON. Leaves compare one filter variable against a value:
//!
//! ```json
//! {"var": "degree", "op": "eq", "val": "graduate"}
//! ```
//!
//! Composites combine other conditions:
//!
//! ```json
//! {"op": "and", "conditions": [ ... ]}
//! {"op": "not", "condition": { ... }}
//! ```
//!
//! Evaluation never fails. Numeric operators on non-numeric operands are
//! `false`, and an operator this runtime does not know is `true` so that
//! markup written for a newer runtime does not hide content.

use error_stack::Report;
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, RuntimeError};
use crate::inputs::InputMap;

#[derive(Clone, Debug, PartialEq)]
pub enum ConditionValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<ConditionValue>),
}

impl ConditionValue {
    fn from_json(value: &Value) -> Result<Self> {
        Ok(match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            Value::String(s) => Self::Text(s.clone()),
            Value::Array(items) => Self::List(
                items
                    .iter()
                    .map(Self::from_json)
                    .collect::<Result<Vec<_>>>()?,
            ),
            Value::Object(_) => return Err(malformed("`val` must be a scalar or a list")),
        })
    }

    fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if !n.is_nan() => Some(*n),
            Self::Text(s) => parse_number(s),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    In,
    Gt,
    Lt,
    Gte,
    Lte,
    /// Operator name not understood by this runtime. Evaluates to `true`.
    Unknown(String),
}

impl Operator {
    pub fn from_name(name: &str) -> Self {
        match name {
            "eq" => Self::Eq,
            "neq" => Self::Neq,
            "in" => Self::In,
            "gt" => Self::Gt,
            "lt" => Self::Lt,
            "gte" => Self::Gte,
            "lte" => Self::Lte,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::In => "in",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Gte => "gte",
            Self::Lte => "lte",
            Self::Unknown(name) => name,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(try_from = "Value")]
pub enum Condition {
    Leaf {
        var: String,
        op: Operator,
        val: ConditionValue,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    /// Parse the serialized form found in a `data-show-when` attribute.
    pub fn parse(source: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(source)
            .map_err(|e| malformed(format!("invalid JSON: {e}")))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self> {
        let Some(node) = value.as_object() else {
            return Err(malformed("condition must be a JSON object"));
        };
        let op = match node.get("op") {
            Some(Value::String(op)) => op.as_str(),
            Some(_) => return Err(malformed("`op` must be a string")),
            None => return Err(malformed("missing `op`")),
        };

        match op {
            "and" | "or" => {
                reject_leaf_fields(node, op)?;
                let children = match node.get("conditions") {
                    Some(Value::Array(items)) => items
                        .iter()
                        .map(Self::from_value)
                        .collect::<Result<Vec<_>>>()?,
                    _ => return Err(malformed(format!("`{op}` requires a `conditions` list"))),
                };
                Ok(if op == "and" {
                    Self::And(children)
                } else {
                    Self::Or(children)
                })
            }
            "not" => {
                reject_leaf_fields(node, op)?;
                let inner = node
                    .get("condition")
                    .ok_or_else(|| malformed("`not` requires a `condition`"))?;
                Ok(Self::Not(Box::new(Self::from_value(inner)?)))
            }
            op => {
                if node.contains_key("conditions") || node.contains_key("condition") {
                    return Err(malformed(format!("leaf `{op}` cannot carry nested conditions")));
                }
                let var = match node.get("var") {
                    Some(Value::String(var)) => var.clone(),
                    _ => return Err(malformed(format!("leaf `{op}` requires a string `var`"))),
                };
                let val = node
                    .get("val")
                    .map(ConditionValue::from_json)
                    .transpose()?
                    .unwrap_or(ConditionValue::Null);
                Ok(Self::Leaf {
                    var,
                    op: Operator::from_name(op),
                    val,
                })
            }
        }
    }

    pub fn evaluate(&self, inputs: &InputMap) -> bool {
        match self {
            Self::And(children) => children.iter().all(|c| c.evaluate(inputs)),
            Self::Or(children) => children.iter().any(|c| c.evaluate(inputs)),
            Self::Not(inner) => !inner.evaluate(inputs),
            Self::Leaf { var, op, val } => compare(inputs.get(var), op, val),
        }
    }

    /// Filter variables referenced anywhere in the tree, in first-seen order.
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);
        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Leaf { var, .. } => {
                if !out.contains(&var.as_str()) {
                    out.push(var);
                }
            }
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.collect_variables(out);
                }
            }
            Self::Not(inner) => inner.collect_variables(out),
        }
    }

    /// Operators in the tree that evaluate fail-open.
    pub fn unknown_operators(&self) -> Vec<&str> {
        match self {
            Self::Leaf {
                op: Operator::Unknown(name),
                ..
            } => vec![name.as_str()],
            Self::Leaf { .. } => Vec::new(),
            Self::And(children) | Self::Or(children) => children
                .iter()
                .flat_map(|c| c.unknown_operators())
                .collect(),
            Self::Not(inner) => inner.unknown_operators(),
        }
    }
}

impl TryFrom<Value> for Condition {
    type Error = String;

    fn try_from(value: Value) -> std::result::Result<Self, Self::Error> {
        Self::from_value(&value).map_err(|report| report.current_context().to_string())
    }
}

fn compare(input: Option<&str>, op: &Operator, val: &ConditionValue) -> bool {
    match op {
        Operator::Eq => strict_eq(input, val),
        Operator::Neq => !strict_eq(input, val),
        Operator::In => match (input, val) {
            (Some(input), ConditionValue::List(items)) => {
                items.iter().any(|item| item.as_text() == Some(input))
            }
            _ => false,
        },
        Operator::Gt => numeric(input, val, |a, b| a > b),
        Operator::Lt => numeric(input, val, |a, b| a < b),
        Operator::Gte => numeric(input, val, |a, b| a >= b),
        Operator::Lte => numeric(input, val, |a, b| a <= b),
        Operator::Unknown(_) => true,
    }
}

fn strict_eq(input: Option<&str>, val: &ConditionValue) -> bool {
    matches!((input, val.as_text()), (Some(a), Some(b)) if a == b)
}

fn numeric(input: Option<&str>, val: &ConditionValue, cmp: fn(f64, f64) -> bool) -> bool {
    match (input.and_then(parse_number), val.as_number()) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// Leading-prefix float parse: `"25 years"` is 25, `"abc"` is not a number.
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    if s[end..].starts_with("Infinity") {
        let n = f64::INFINITY;
        return Some(if s.starts_with('-') { -n } else { n });
    }

    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;
    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        digits += frac_end - frac_start;
        end = frac_end;
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    s[..end].parse::<f64>().ok()
}

fn reject_leaf_fields(node: &Map<String, Value>, op: &str) -> Result<()> {
    if node.contains_key("var") || node.contains_key("val") {
        return Err(malformed(format!("`{op}` cannot carry `var` or `val`")));
    }
    Ok(())
}

fn malformed(msg: impl Into<String>) -> Report<RuntimeError> {
    Report::new(RuntimeError::Condition(msg.into()))
}
