use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::LiveSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Safe,
    Warning,
    Danger,
}

/// Health assessment computed by the hosting surface from live readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthData {
    pub health_score: f64,
    pub alert_level: AlertLevel,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// The always-visible "current system analysis" block: live readings next
/// to the externally computed health data, passed through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemAnalysis {
    pub device_temp: f64,
    pub battery_data: Value,
    pub health: Option<HealthData>,
}

impl SystemAnalysis {
    pub fn compose(snapshot: &LiveSnapshot, health: Option<&HealthData>) -> Self {
        Self {
            device_temp: snapshot.device_temp,
            battery_data: snapshot.battery_data.clone(),
            health: health.cloned(),
        }
    }
}
