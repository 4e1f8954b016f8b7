// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parameter schemas and values.
//!
//! Every editable field on a node (a parameter, or the inline editor of a
//! data input) is described by a [`ParamSchema`]. The schema's
//! [`ParamKind`] decides how raw input is turned into a stored
//! [`ParamValue`].

use crate::keys::KeyCombo;
use serde::{Deserialize, Serialize};

/// Value stored for a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Boolean
    Bool(bool),
    /// Number
    Number(f64),
    /// Text, enum option value or image path
    Text(String),
    /// Recorded key combination
    KeyCombo(KeyCombo),
}

impl ParamValue {
    /// Numeric view of the value
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(v) => Some(*v),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Text view of the value
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Boolean view of the value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Key combination view of the value
    pub fn as_key_combo(&self) -> Option<&KeyCombo> {
        match self {
            Self::KeyCombo(k) => Some(k),
            _ => None,
        }
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<KeyCombo> for ParamValue {
    fn from(v: KeyCombo) -> Self {
        Self::KeyCombo(v)
    }
}

/// Kind of editor behind a field
#[derive(Debug, Clone, PartialEq)]
pub enum ParamKind {
    /// Number input with optional bounds
    Number {
        /// Inclusive lower bound
        min: Option<f64>,
        /// Inclusive upper bound
        max: Option<f64>,
    },
    /// Free text
    String,
    /// Checkbox
    Boolean,
    /// Drop-down. An empty option list is filled at runtime.
    Enum {
        /// Option labels
        options: Vec<String>,
    },
    /// Key combination recorder
    KeyCombo,
    /// Image picker; the path lives on the node, not in the values
    ImageReference,
}

/// Makes a field visible only while a sibling enum field holds a value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisibilityCondition {
    /// Controlling sibling field
    pub field: String,
    /// Required option value
    pub value: String,
}

/// Schema for one editable field
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSchema {
    /// Field name, used as the key in node values
    pub name: String,
    /// Editor kind
    pub kind: ParamKind,
    /// Default value
    pub default: ParamValue,
    /// Optional visibility condition
    pub condition: Option<VisibilityCondition>,
}

impl ParamSchema {
    fn new(name: impl Into<String>, kind: ParamKind, default: ParamValue) -> Self {
        Self {
            name: name.into(),
            kind,
            default,
            condition: None,
        }
    }

    /// Unbounded number field
    pub fn number(name: impl Into<String>, default: f64) -> Self {
        Self::new(
            name,
            ParamKind::Number { min: None, max: None },
            ParamValue::Number(default),
        )
    }

    /// Text field
    pub fn string(name: impl Into<String>, default: &str) -> Self {
        Self::new(name, ParamKind::String, ParamValue::from(default))
    }

    /// Checkbox field
    pub fn boolean(name: impl Into<String>, default: bool) -> Self {
        Self::new(name, ParamKind::Boolean, ParamValue::Bool(default))
    }

    /// Drop-down with fixed option labels. `default` is an option value.
    pub fn select(name: impl Into<String>, default: &str, options: &[&str]) -> Self {
        Self::new(
            name,
            ParamKind::Enum {
                options: options.iter().map(|o| (*o).to_string()).collect(),
            },
            ParamValue::from(default),
        )
    }

    /// Drop-down whose options are filled from the document
    pub fn dynamic_select(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::Enum { options: Vec::new() }, ParamValue::from(""))
    }

    /// Key combination recorder showing `placeholder` until recorded
    pub fn key_combo(name: impl Into<String>, placeholder: &str) -> Self {
        Self::new(
            name,
            ParamKind::KeyCombo,
            ParamValue::KeyCombo(KeyCombo::unset(placeholder)),
        )
    }

    /// Image picker
    pub fn image(name: impl Into<String>) -> Self {
        Self::new(name, ParamKind::ImageReference, ParamValue::from(""))
    }

    /// Set the lower bound
    pub fn with_min(mut self, min: f64) -> Self {
        if let ParamKind::Number { min: m, .. } = &mut self.kind {
            *m = Some(min);
        }
        self
    }

    /// Set the upper bound
    pub fn with_max(mut self, max: f64) -> Self {
        if let ParamKind::Number { max: m, .. } = &mut self.kind {
            *m = Some(max);
        }
        self
    }

    /// Set both bounds
    pub fn with_range(self, min: f64, max: f64) -> Self {
        self.with_min(min).with_max(max)
    }

    /// Only show this field while `field` has option value `value`
    pub fn visible_when(mut self, field: &str, value: &str) -> Self {
        self.condition = Some(VisibilityCondition {
            field: field.to_string(),
            value: value.to_string(),
        });
        self
    }

    /// Numeric bounds, if this is a bounded number field
    pub fn bounds(&self) -> Option<(Option<f64>, Option<f64>)> {
        match self.kind {
            ParamKind::Number { min, max } if min.is_some() || max.is_some() => Some((min, max)),
            _ => None,
        }
    }

    /// Whether the field keeps a value in the node's value map
    pub fn stores_value(&self) -> bool {
        !matches!(self.kind, ParamKind::ImageReference)
    }

    /// Whether a number field only accepts whole numbers.
    ///
    /// A field is whole-number when its default is integral or when it
    /// declares a non-zero integral lower bound.
    pub fn is_integral(&self) -> bool {
        let ParamKind::Number { min, .. } = self.kind else {
            return false;
        };
        let default_integral = self.default.as_number().is_some_and(|d| d.fract() == 0.0);
        default_integral || min.is_some_and(|m| m != 0.0 && m.fract() == 0.0)
    }

    /// Option values of a fixed drop-down
    pub fn option_values(&self) -> Vec<String> {
        match &self.kind {
            ParamKind::Enum { options } => options.iter().map(|o| option_value(o)).collect(),
            _ => Vec::new(),
        }
    }

    /// Turn raw editor input into the value stored for this field
    pub fn normalize(&self, raw: &ParamValue) -> ParamValue {
        match &self.kind {
            ParamKind::Number { min, max } => {
                let fallback = self.default.as_number().unwrap_or(0.0);
                let mut value = match raw.as_number() {
                    Some(v) if v.is_finite() => v,
                    _ => fallback,
                };
                if self.is_integral() {
                    value = value.trunc();
                } else {
                    value = (value * 100.0).round() / 100.0;
                }
                value = value.max(min.unwrap_or(f64::NEG_INFINITY));
                value = value.min(max.unwrap_or(f64::INFINITY));
                ParamValue::Number(value)
            }
            ParamKind::String | ParamKind::ImageReference => match raw {
                ParamValue::Text(s) => ParamValue::Text(s.clone()),
                ParamValue::Number(v) => ParamValue::Text(format_number(*v)),
                ParamValue::Bool(b) => ParamValue::Text(b.to_string()),
                ParamValue::KeyCombo(k) => ParamValue::Text(k.display.clone()),
            },
            ParamKind::Boolean => ParamValue::Bool(
                raw.as_bool()
                    .or_else(|| self.default.as_bool())
                    .unwrap_or(false),
            ),
            ParamKind::Enum { .. } => match raw {
                ParamValue::Text(s) => ParamValue::Text(s.clone()),
                ParamValue::Number(v) => ParamValue::Text(format_number(*v)),
                _ => self.default.clone(),
            },
            ParamKind::KeyCombo => match raw {
                ParamValue::KeyCombo(k) => ParamValue::KeyCombo(k.clone()),
                // Older documents stored only the display label
                ParamValue::Text(s) => ParamValue::KeyCombo(KeyCombo::unset(s)),
                _ => self.default.clone(),
            },
        }
    }
}

/// Value stored for a drop-down option label
pub fn option_value(label: &str) -> String {
    label.to_lowercase().replace(' ', "_")
}

/// Format a number the way notices show it (`5`, `0.01`, `Infinity`)
pub fn format_number(v: f64) -> String {
    if v.is_infinite() {
        if v > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{v:.0}")
    } else {
        v.to_string()
    }
}
