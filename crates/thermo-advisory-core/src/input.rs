use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

use crate::types::AdvisoryRequest;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("field `{0}` is empty")]
    Empty(&'static str),
    #[error("field `{field}` is not a number: {value:?}")]
    NotANumber { field: &'static str, value: String },
    #[error("unknown device state {0:?}")]
    UnknownUsage(String),
}

/// Device usage selected in the what-if form. `Unset` is the empty choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UsageState {
    #[default]
    #[serde(rename = "")]
    Unset,
    Idle,
    Discharging,
    Charging,
}

impl UsageState {
    pub fn as_wire(&self) -> &'static str {
        match self {
            UsageState::Unset => "",
            UsageState::Idle => "idle",
            UsageState::Discharging => "discharging",
            UsageState::Charging => "charging",
        }
    }
}

impl FromStr for UsageState {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" => Ok(UsageState::Unset),
            "idle" => Ok(UsageState::Idle),
            "discharging" => Ok(UsageState::Discharging),
            "charging" => Ok(UsageState::Charging),
            other => Err(InputError::UnknownUsage(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioField {
    DeviceTemp,
    AmbientTemp,
    BatteryLevel,
}

/// Raw what-if form state. Numeric fields stay as typed text until
/// submission so half-typed values such as `"3"` or `"-"` are accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioInput {
    pub device_temp: String,
    pub ambient_temp: String,
    pub battery_level: String,
    pub usage: UsageState,
}

impl ScenarioInput {
    pub fn new(
        device_temp: impl Into<String>,
        ambient_temp: impl Into<String>,
        battery_level: impl Into<String>,
        usage: UsageState,
    ) -> Self {
        Self {
            device_temp: device_temp.into(),
            ambient_temp: ambient_temp.into(),
            battery_level: battery_level.into(),
            usage,
        }
    }

    pub fn edit(&mut self, field: ScenarioField, value: impl Into<String>) {
        let slot = match field {
            ScenarioField::DeviceTemp => &mut self.device_temp,
            ScenarioField::AmbientTemp => &mut self.ambient_temp,
            ScenarioField::BatteryLevel => &mut self.battery_level,
        };
        *slot = value.into();
    }

    pub fn set_usage(&mut self, usage: UsageState) {
        self.usage = usage;
    }

    pub fn is_complete(&self) -> bool {
        !self.device_temp.trim().is_empty()
            && !self.ambient_temp.trim().is_empty()
            && !self.battery_level.trim().is_empty()
            && self.usage != UsageState::Unset
    }

    /// Parses the form into a wire request. `cpu_temp` is always derived
    /// from the entered device temperature plus `cpu_offset_c`.
    pub fn to_request(&self, cpu_offset_c: f64) -> Result<AdvisoryRequest, InputError> {
        let device_temp = parse_float("device_temp", &self.device_temp)?;
        let ambient_temp = parse_float("ambient_temp", &self.ambient_temp)?;
        let battery_level = parse_int("battery_level", &self.battery_level)?;
        if self.usage == UsageState::Unset {
            return Err(InputError::Empty("usage"));
        }

        Ok(AdvisoryRequest {
            battery_temp: device_temp,
            ambient_temp,
            device_state: self.usage.as_wire().to_string(),
            battery_level,
            cpu_temp: device_temp + cpu_offset_c,
        })
    }
}

fn parse_float(field: &'static str, raw: &str) -> Result<f64, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty(field));
    }
    trimmed
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| InputError::NotANumber {
            field,
            value: raw.to_string(),
        })
}

fn parse_int(field: &'static str, raw: &str) -> Result<i64, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::Empty(field));
    }
    if let Ok(v) = trimmed.parse::<i64>() {
        return Ok(v);
    }
    // "80.5" is accepted and truncated toward zero, like an integer parse of
    // the leading digits.
    parse_float(field, trimmed).map(|v| v.trunc() as i64)
}
