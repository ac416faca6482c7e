//! Turns whatever the advisory endpoint returned into an `AdvisoryResult`.
//!
//! The endpoint is loosely typed: fields may be missing, null or carry the
//! wrong JSON type, and `optional_action` arrives either as a string or a
//! list. Normalization is total and never fails.

use serde_json::Value;

use crate::types::{AdvisoryResult, RiskLevel};

pub const NO_ADVICE_FALLBACK: &str = "No specific recommendations available.";
pub const NO_ACTION_FALLBACK: &str = "No immediate action recommended";
pub const IMPACT_PREFIX: &str = "Predicted health impact: ";
pub const IMPACT_UNAVAILABLE: &str = "N/A";
pub const ERROR_RECOMMENDATION: &str =
    "Unable to get advice right now. Please check your connection and try again.";
pub const RETRY_ACTION: &str = "Please try again later";

/// Decoded shape of `optional_action`. Null list items are dropped; other
/// non-string items keep their JSON text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionField {
    Missing,
    One(String),
    Many(Vec<String>),
}

impl ActionField {
    pub fn decode(raw: Option<&Value>) -> Self {
        let raw = match raw {
            Some(v) if is_truthy(v) => v,
            _ => return ActionField::Missing,
        };
        match raw {
            Value::Array(items) => {
                let items: Vec<String> = items
                    .iter()
                    .filter(|item| !item.is_null())
                    .map(value_text)
                    .collect();
                if items.is_empty() {
                    ActionField::Missing
                } else {
                    ActionField::Many(items)
                }
            }
            other => ActionField::One(value_text(other)),
        }
    }

    pub fn into_items(self) -> Vec<String> {
        match self {
            ActionField::Missing => vec![NO_ACTION_FALLBACK.to_string()],
            ActionField::One(item) => vec![item],
            ActionField::Many(items) => items,
        }
    }
}

pub fn normalize_advice(raw: &Value) -> AdvisoryResult {
    let risk_level = match raw.get("alert_level") {
        Some(Value::String(level)) if !level.is_empty() => RiskLevel::from_wire(level),
        _ => RiskLevel::Unknown,
    };

    let recommendation = match raw.get("natural_language_tip") {
        Some(Value::String(tip)) if !tip.is_empty() => tip.clone(),
        _ => NO_ADVICE_FALLBACK.to_string(),
    };

    let action_items = ActionField::decode(raw.get("optional_action")).into_items();

    let impact = match raw.get("predicted_health_impact").and_then(Value::as_f64) {
        Some(value) => format_impact(value),
        None => impact_unavailable(),
    };

    AdvisoryResult {
        risk_level,
        recommendation,
        action_items,
        impact,
    }
}

/// `0.873` renders as `"Predicted health impact: 87.3%"`. Ties on the
/// tenth round away from zero, so `0.0625` gives `6.3%`.
pub fn format_impact(fraction: f64) -> String {
    let tenths = (fraction * 1000.0).round();
    if !tenths.is_finite() {
        return impact_unavailable();
    }
    format!("{IMPACT_PREFIX}{:.1}%", tenths / 10.0)
}

pub fn impact_unavailable() -> String {
    format!("{IMPACT_PREFIX}{IMPACT_UNAVAILABLE}")
}

fn is_truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
