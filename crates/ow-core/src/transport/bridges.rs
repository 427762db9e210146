//! Bridge configuration.
//!
//! Bridge lines are stored as one newline-delimited string. Blank lines and
//! comment lines (`//` or `#`) never reach the launch parameters.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BridgeType {
    #[default]
    None,
    Custom,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct BridgeConfiguration {
    pub bridge_type: BridgeType,
    pub lines: Vec<String>,
}

impl BridgeConfiguration {
    /// Default, no-bridge configuration.
    pub fn none() -> Self {
        Self::default()
    }

    /// Custom bridges from raw user input; lines are filtered on the way in.
    pub fn custom(raw: &str) -> Self {
        Self {
            bridge_type: BridgeType::Custom,
            lines: parse_bridge_lines(raw),
        }
    }

    /// Rebuild from the two persisted values.
    pub fn from_persisted(use_custom_bridges: bool, raw_lines: &str) -> Self {
        if use_custom_bridges {
            Self::custom(raw_lines)
        } else {
            Self {
                bridge_type: BridgeType::None,
                lines: parse_bridge_lines(raw_lines),
            }
        }
    }

    pub fn is_custom(&self) -> bool {
        self.bridge_type == BridgeType::Custom
    }

    /// Bridge lines that go into the launch parameters. Empty unless custom.
    pub fn effective_lines(&self) -> Vec<String> {
        match self.bridge_type {
            BridgeType::None => Vec::new(),
            BridgeType::Custom => self
                .lines
                .iter()
                .filter_map(|line| effective_line(line))
                .collect(),
        }
    }

    /// Lines joined back into the persisted newline-delimited form.
    pub fn to_persisted_lines(&self) -> String {
        self.lines.join("\n")
    }

    /// Pluggable transport names (first token) used by the effective lines.
    pub fn transport_names(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for line in self.effective_lines() {
            if let Some(first) = line.split_whitespace().next() {
                if is_transport_name(first) && !names.iter().any(|n| n == first) {
                    names.push(first.to_string());
                }
            }
        }
        names
    }
}

/// Split raw input into effective, trimmed bridge lines.
pub fn parse_bridge_lines(raw: &str) -> Vec<String> {
    raw.lines().filter_map(effective_line).collect()
}

fn effective_line(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") || trimmed.starts_with('#') {
        return None;
    }
    Some(trimmed.to_string())
}

// A bridge line either starts with a transport name or directly with an address.
fn is_transport_name(token: &str) -> bool {
    !token.is_empty()
        && token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !token.chars().all(|c| c.is_ascii_digit())
}
