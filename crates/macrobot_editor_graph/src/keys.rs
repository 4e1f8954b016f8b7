// SPDX-License-Identifier: MIT OR Apache-2.0
//! Key combinations for hotkeys and key-press nodes.
//!
//! A combination has two forms: a display label (`Ctrl + Shift + A`) and a
//! machine encoding consumed by the hotkey listener and the executor
//! (`<ctrl>+<shift>+a`). Modifiers always come first, ordered
//! ctrl, shift, alt; the remaining keys follow in lexical order.

use serde::{Deserialize, Serialize};

const MODIFIERS: [&str; 3] = ["ctrl", "shift", "alt"];

const SPECIAL_KEYS: [&str; 26] = [
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "enter", "space",
    "tab", "esc", "delete", "insert", "home", "end", "page_up", "page_down", "up", "down", "left",
    "right",
];

/// A recorded key combination
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyCombo {
    /// Human readable label
    pub display: String,
    /// Machine encoding; empty when nothing was recorded
    #[serde(rename = "encodedValue", alias = "pynput", default)]
    pub encoded: String,
}

impl KeyCombo {
    /// A combination that shows `label` but encodes nothing
    pub fn unset(label: &str) -> Self {
        Self {
            display: label.to_string(),
            encoded: String::new(),
        }
    }

    /// Build a combination from normalized key names (see [`map_key`]).
    ///
    /// Returns `None` when no key was held.
    pub fn from_keys<I, S>(keys: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut sorted: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| sort_key(a).cmp(&sort_key(b)));
        sorted.dedup();

        let display = sorted
            .iter()
            .map(|k| display_key(k))
            .collect::<Vec<_>>()
            .join(" + ");
        let encoded = sorted
            .iter()
            .map(|k| {
                if MODIFIERS.contains(&k.as_str()) || SPECIAL_KEYS.contains(&k.as_str()) {
                    format!("<{k}>")
                } else {
                    k.clone()
                }
            })
            .collect::<Vec<_>>()
            .join("+");

        Some(Self { display, encoded })
    }

    /// Whether a combination was actually recorded
    pub fn is_set(&self) -> bool {
        !self.encoded.is_empty()
    }
}

fn sort_key(key: &str) -> (usize, &str) {
    match MODIFIERS.iter().position(|m| *m == key) {
        Some(rank) => (rank, ""),
        None => (MODIFIERS.len(), key),
    }
}

fn display_key(key: &str) -> String {
    match key {
        "page_up" => "Page Up".to_string(),
        "page_down" => "Page Down".to_string(),
        _ => {
            let mut chars = key.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>().replace('_', " "),
                None => String::new(),
            }
        }
    }
}

/// Normalize a key name reported by the host (`Control`, `ArrowUp`, `a`)
pub fn map_key(key: &str) -> String {
    match key {
        "Control" => "ctrl".to_string(),
        "Shift" => "shift".to_string(),
        "Alt" => "alt".to_string(),
        " " => "space".to_string(),
        "Escape" => "esc".to_string(),
        "PageUp" => "page_up".to_string(),
        "PageDown" => "page_down".to_string(),
        _ => match key.strip_prefix("Arrow") {
            Some(direction) if !direction.is_empty() => direction.to_lowercase(),
            _ => key.to_lowercase(),
        },
    }
}
