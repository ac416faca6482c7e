use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thermo_advisory_core::LiveSnapshot;

use crate::error::TransportError;
use crate::transport::AdvisoryTransport;

/// Source of the latest live readings. Queried at request-build and render
/// time; never cached by the workflows.
pub trait SnapshotProvider: Send + Sync {
    fn latest(&self) -> LiveSnapshot;
}

impl SnapshotProvider for LiveSnapshot {
    fn latest(&self) -> LiveSnapshot {
        self.clone()
    }
}

/// Snapshot cell written by an external sensor context and read here.
#[derive(Clone)]
pub struct SharedSnapshot {
    inner: Arc<RwLock<LiveSnapshot>>,
}

impl SharedSnapshot {
    pub fn new(initial: LiveSnapshot) -> Self {
        Self {
            inner: Arc::new(RwLock::new(initial)),
        }
    }

    pub fn update(&self, next: LiveSnapshot) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Default for SharedSnapshot {
    fn default() -> Self {
        Self::new(LiveSnapshot::new(0.0, Value::Null))
    }
}

impl SnapshotProvider for SharedSnapshot {
    fn latest(&self) -> LiveSnapshot {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemperatureReading {
    #[serde(default)]
    pub cpu: Option<f64>,
    #[serde(default)]
    pub battery: Option<f64>,
    #[serde(default)]
    pub system: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

/// Body of `GET /api/sensors`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SensorReport {
    #[serde(default)]
    pub battery: Value,
    #[serde(default)]
    pub temperature: TemperatureReading,
    #[serde(default)]
    pub system: Value,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl SensorReport {
    /// Battery temperature, or the CPU reading when the host exposes no
    /// battery sensor.
    pub fn device_temp(&self) -> Option<f64> {
        self.temperature.battery.or(self.temperature.cpu)
    }
}

/// Pulls `/api/sensors` into a [`SharedSnapshot`].
pub struct HttpSensorFeed {
    transport: Arc<dyn AdvisoryTransport>,
    target: SharedSnapshot,
}

impl HttpSensorFeed {
    pub fn new(transport: Arc<dyn AdvisoryTransport>, target: SharedSnapshot) -> Self {
        Self { transport, target }
    }

    /// A report without any temperature keeps the previous device
    /// temperature and only replaces the battery data.
    pub async fn pull(&self) -> Result<LiveSnapshot, TransportError> {
        let report = self.transport.fetch_sensors().await?;
        let previous = self.target.latest();
        let device_temp = match report.device_temp() {
            Some(t) => t,
            None => {
                tracing::warn!(
                    source = report.temperature.source.as_deref().unwrap_or("unknown"),
                    "sensor report carried no temperature, keeping previous reading"
                );
                previous.device_temp
            }
        };
        let next = LiveSnapshot::new(device_temp, report.battery);
        self.target.update(next.clone());
        tracing::debug!(device_temp, "live snapshot updated");
        Ok(next)
    }
}
