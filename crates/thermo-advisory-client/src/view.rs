use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use thermo_advisory_core::{
    normalize_advice, AdvisoryConfig, AdvisoryRequest, AdvisoryResult, HealthData, HistoryEntry,
    LiveAdviceParams, ScenarioField, ScenarioInput, SystemAnalysis, UsageState,
};
use tokio::task::JoinHandle;

use crate::error::{SubmissionFailure, TransportError};
use crate::events;
use crate::history::HistoryWorkflow;
use crate::metrics::AdvisoryMetrics;
use crate::snapshot::SnapshotProvider;
use crate::submission::{SubmissionPhase, SubmissionWorkflow};
use crate::transport::AdvisoryTransport;

/// Everything a surface needs to draw the advisory panel.
#[derive(Debug, Clone, Serialize)]
pub struct ViewState {
    pub visible: bool,
    pub analysis: SystemAnalysis,
    pub form: ScenarioInput,
    pub can_submit: bool,
    pub loading: bool,
    pub phase: SubmissionPhase,
    pub result: Option<AdvisoryResult>,
    pub history_visible: bool,
    pub history_loading: bool,
    pub history: Vec<HistoryEntry>,
}

/// Top-level coordinator. Must be created inside a tokio runtime: it spawns
/// the history listener that reacts to committed advice.
pub struct AdvisoryView {
    config: AdvisoryConfig,
    visible: bool,
    health: Option<HealthData>,
    transport: Arc<dyn AdvisoryTransport>,
    snapshot: Arc<dyn SnapshotProvider>,
    metrics: Arc<AdvisoryMetrics>,
    submission: SubmissionWorkflow,
    history: HistoryWorkflow,
    listener: JoinHandle<()>,
}

impl AdvisoryView {
    pub fn new(
        config: AdvisoryConfig,
        transport: Arc<dyn AdvisoryTransport>,
        snapshot: Arc<dyn SnapshotProvider>,
        metrics: Arc<AdvisoryMetrics>,
    ) -> Self {
        let (tx, rx) = events::channel();
        let submission = SubmissionWorkflow::new(config.cpu_temp_offset_c, tx, Arc::clone(&metrics));
        let history = HistoryWorkflow::new(
            Arc::clone(&transport),
            config.history_limit,
            Arc::clone(&metrics),
        );
        let listener = history.spawn_listener(rx);

        Self {
            config,
            visible: false,
            health: None,
            transport,
            snapshot,
            metrics,
            submission,
            history,
            listener,
        }
    }

    pub fn config(&self) -> &AdvisoryConfig {
        &self.config
    }

    pub fn metrics(&self) -> &AdvisoryMetrics {
        &self.metrics
    }

    pub fn submission(&self) -> &SubmissionWorkflow {
        &self.submission
    }

    pub fn history(&self) -> &HistoryWorkflow {
        &self.history
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Hidden → visible kicks off a history refresh; already visible is a
    /// no-op. Returns the spawned refresh, if any.
    pub fn show(&mut self) -> Option<JoinHandle<()>> {
        if self.visible {
            return None;
        }
        self.visible = true;
        tracing::debug!("advisory view shown");
        Some(self.history.spawn_refresh())
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn set_health(&mut self, health: Option<HealthData>) {
        self.health = health;
    }

    pub fn edit(&mut self, field: ScenarioField, value: impl Into<String>) {
        self.submission.edit(field, value);
    }

    pub fn set_usage(&mut self, usage: UsageState) {
        self.submission.set_usage(usage);
    }

    pub async fn submit(&mut self) -> AdvisoryResult {
        self.submission.submit(self.transport.as_ref()).await
    }

    pub fn toggle_history(&self) -> bool {
        self.history.toggle_visibility()
    }

    /// Advice for the live readings, independent of the scenario form.
    /// Missing `battery_level` and `cpu_temp` come from configuration and
    /// the snapshot respectively.
    pub async fn request_live_advice(
        &self,
        params: LiveAdviceParams,
    ) -> Result<AdvisoryResult, SubmissionFailure> {
        let snapshot = self.snapshot.latest();
        let request =
            AdvisoryRequest::from_live(params, &snapshot, self.config.default_battery_level);
        let raw = self.transport.post_advice(&request).await?;
        Ok(normalize_advice(&raw))
    }

    pub async fn statistics(&self) -> Result<Value, TransportError> {
        self.transport.fetch_statistics().await
    }

    pub fn state(&self) -> ViewState {
        let snapshot = self.snapshot.latest();
        let history = self.history.snapshot();
        ViewState {
            visible: self.visible,
            analysis: SystemAnalysis::compose(&snapshot, self.health.as_ref()),
            form: self.submission.input().clone(),
            can_submit: self.submission.can_submit(),
            loading: self.submission.loading(),
            phase: self.submission.phase(),
            result: self.submission.result(),
            history_visible: history.visible,
            history_loading: history.loading,
            history: history.entries,
        }
    }

    /// Closes the event channel and waits for the history listener to
    /// drain refreshes already triggered by committed advice.
    pub async fn shutdown(self) {
        let Self {
            submission,
            listener,
            ..
        } = self;
        drop(submission);
        if let Err(err) = listener.await {
            tracing::warn!(error = %err, "history listener ended abnormally");
        }
    }
}
