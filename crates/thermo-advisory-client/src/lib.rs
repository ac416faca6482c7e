//! Client-side orchestration for the ThermoSense advisory service.
//!
//! [`AdvisoryView`] composes the scenario [`SubmissionWorkflow`], the
//! [`HistoryWorkflow`] and an injected [`SnapshotProvider`] into one
//! renderable [`ViewState`]. All network traffic goes through an
//! [`AdvisoryTransport`]; [`HttpTransport`] is the production one.

pub mod error;
pub mod events;
pub mod history;
pub mod metrics;
pub mod snapshot;
pub mod submission;
pub mod transport;
pub mod view;

#[cfg(test)]
mod tests;

pub use error::{HistoryFetchFailure, SubmissionFailure, TransportError};
pub use events::{AdvisoryEvent, EventReceiver, EventSender};
pub use history::{HistorySnapshot, HistoryWorkflow, RefreshOutcome};
pub use metrics::AdvisoryMetrics;
pub use snapshot::{
    HttpSensorFeed, SensorReport, SharedSnapshot, SnapshotProvider, TemperatureReading,
};
pub use submission::{SubmissionPhase, SubmissionWorkflow};
pub use transport::{AdvisoryTransport, HttpTransport};
pub use view::{AdvisoryView, ViewState};

pub use thermo_advisory_core as model;
