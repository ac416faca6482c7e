use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::normalizer::{self, normalize_advice};

/// Severity attached to a normalized advisory outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Safe,
    Warning,
    Danger,
    Unknown,
    Error,
}

impl RiskLevel {
    /// Maps a server `alert_level` string; anything outside the closed set
    /// becomes `Unknown`.
    pub fn from_wire(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "safe" => RiskLevel::Safe,
            "warning" => RiskLevel::Warning,
            "danger" => RiskLevel::Danger,
            "error" => RiskLevel::Error,
            _ => RiskLevel::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Safe => "safe",
            RiskLevel::Warning => "warning",
            RiskLevel::Danger => "danger",
            RiskLevel::Unknown => "unknown",
            RiskLevel::Error => "error",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest reading from the live sensor context. `battery_data` is opaque here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveSnapshot {
    pub device_temp: f64,
    #[serde(default)]
    pub battery_data: Value,
}

impl LiveSnapshot {
    pub fn new(device_temp: f64, battery_data: Value) -> Self {
        Self {
            device_temp,
            battery_data,
        }
    }
}

/// Body of `POST /api/advice`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRequest {
    pub battery_temp: f64,
    pub ambient_temp: f64,
    pub device_state: String,
    pub battery_level: i64,
    pub cpu_temp: f64,
}

/// Caller-supplied fields for an advice request against live readings.
/// Missing fields are filled from the snapshot and configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveAdviceParams {
    pub battery_temp: Option<f64>,
    pub ambient_temp: f64,
    pub device_state: String,
    pub battery_level: Option<i64>,
    pub cpu_temp: Option<f64>,
}

impl AdvisoryRequest {
    pub fn from_live(
        params: LiveAdviceParams,
        snapshot: &LiveSnapshot,
        default_battery_level: i64,
    ) -> Self {
        Self {
            battery_temp: params.battery_temp.unwrap_or(snapshot.device_temp),
            ambient_temp: params.ambient_temp,
            device_state: params.device_state,
            battery_level: params.battery_level.unwrap_or(default_battery_level),
            cpu_temp: params.cpu_temp.unwrap_or(snapshot.device_temp),
        }
    }
}

/// Normalized advisory outcome. Every field is always populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryResult {
    pub risk_level: RiskLevel,
    pub recommendation: String,
    pub action_items: Vec<String>,
    pub impact: String,
}

impl AdvisoryResult {
    /// Fixed result shown when a submission fails for any reason.
    pub fn submission_error() -> Self {
        Self {
            risk_level: RiskLevel::Error,
            recommendation: normalizer::ERROR_RECOMMENDATION.to_string(),
            action_items: vec![normalizer::RETRY_ACTION.to_string()],
            impact: normalizer::impact_unavailable(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.risk_level == RiskLevel::Error
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HistoryId {
    Number(i64),
    Text(String),
}

/// A JSON `null` decodes like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One stored advisory as returned by `GET /api/advice/history`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<HistoryId>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub timestamp: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub alert_level: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub battery_temp: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub ambient_temp: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub device_state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub battery_level: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu_temp: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_health_impact: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub natural_language_tip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optional_action: Option<Value>,
}

impl HistoryEntry {
    pub fn risk_level(&self) -> RiskLevel {
        RiskLevel::from_wire(&self.alert_level)
    }

    /// Re-runs the stored advisory fields through the normalizer so history
    /// rows render with the same defaults as a live result.
    pub fn advisory(&self) -> AdvisoryResult {
        let mut raw = serde_json::Map::new();
        raw.insert("alert_level".into(), Value::String(self.alert_level.clone()));
        if let Some(tip) = &self.natural_language_tip {
            raw.insert("natural_language_tip".into(), Value::String(tip.clone()));
        }
        if let Some(action) = &self.optional_action {
            raw.insert("optional_action".into(), action.clone());
        }
        if let Some(impact) = self.predicted_health_impact {
            raw.insert("predicted_health_impact".into(), Value::from(impact));
        }
        normalize_advice(&Value::Object(raw))
    }
}

/// Envelope of the history endpoint. A missing or null `history` is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistoryResponse {
    #[serde(default)]
    pub history: Option<Vec<HistoryEntry>>,
}

impl HistoryResponse {
    pub fn into_entries(self) -> Vec<HistoryEntry> {
        self.history.unwrap_or_default()
    }
}
