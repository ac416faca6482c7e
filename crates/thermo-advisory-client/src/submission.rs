//! What-if scenario submission.
//!
//! Lifecycle: `Idle → Submitting → {Succeeded, Failed}`. Either terminal
//! state accepts the next submission. Exclusive `&mut self` on
//! [`SubmissionWorkflow::submit`] keeps at most one request in flight.

use std::sync::Arc;

use thermo_advisory_core::{
    normalize_advice, AdvisoryResult, ScenarioField, ScenarioInput, UsageState,
};
use tokio::sync::watch;

use crate::error::SubmissionFailure;
use crate::events::{AdvisoryEvent, EventSender};
use crate::metrics::{AdvisoryMetrics, OUTCOME_FAILURE, OUTCOME_SUCCESS};
use crate::transport::AdvisoryTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionPhase {
    Idle,
    Submitting,
    Succeeded,
    Failed,
}

pub struct SubmissionWorkflow {
    input: ScenarioInput,
    result: watch::Sender<Option<AdvisoryResult>>,
    phase: watch::Sender<SubmissionPhase>,
    cpu_offset_c: f64,
    events: EventSender,
    metrics: Arc<AdvisoryMetrics>,
}

/// Resets `Submitting` back to `Idle` if the submit future is dropped before
/// reaching a terminal state.
struct SubmittingGuard<'a> {
    phase: &'a watch::Sender<SubmissionPhase>,
}

impl<'a> SubmittingGuard<'a> {
    fn enter(phase: &'a watch::Sender<SubmissionPhase>) -> Self {
        phase.send_replace(SubmissionPhase::Submitting);
        Self { phase }
    }

    fn finish(self, terminal: SubmissionPhase) {
        self.phase.send_replace(terminal);
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        self.phase.send_if_modified(|p| {
            if *p == SubmissionPhase::Submitting {
                *p = SubmissionPhase::Idle;
                true
            } else {
                false
            }
        });
    }
}

impl SubmissionWorkflow {
    pub fn new(cpu_offset_c: f64, events: EventSender, metrics: Arc<AdvisoryMetrics>) -> Self {
        let (phase, _) = watch::channel(SubmissionPhase::Idle);
        let (result, _) = watch::channel(None);
        Self {
            input: ScenarioInput::default(),
            result,
            phase,
            cpu_offset_c,
            events,
            metrics,
        }
    }

    pub fn input(&self) -> &ScenarioInput {
        &self.input
    }

    pub fn edit(&mut self, field: ScenarioField, value: impl Into<String>) {
        self.input.edit(field, value);
    }

    pub fn set_usage(&mut self, usage: UsageState) {
        self.input.set_usage(usage);
    }

    pub fn result(&self) -> Option<AdvisoryResult> {
        self.result.borrow().clone()
    }

    pub fn phase(&self) -> SubmissionPhase {
        *self.phase.borrow()
    }

    pub fn loading(&self) -> bool {
        self.phase() == SubmissionPhase::Submitting
    }

    /// Phase updates as they happen, including the `Submitting` window.
    pub fn subscribe(&self) -> watch::Receiver<SubmissionPhase> {
        self.phase.subscribe()
    }

    /// Committed result; `None` from the start of a submission until it ends.
    pub fn subscribe_result(&self) -> watch::Receiver<Option<AdvisoryResult>> {
        self.result.subscribe()
    }

    /// Whether the trigger surface should be enabled.
    pub fn can_submit(&self) -> bool {
        self.input.is_complete() && !self.loading()
    }

    /// Runs one scenario analysis and returns the committed result. Failures
    /// never escape: they commit the fixed error result instead.
    pub async fn submit(&mut self, transport: &dyn AdvisoryTransport) -> AdvisoryResult {
        self.result.send_replace(None);
        let guard = SubmittingGuard::enter(&self.phase);

        let outcome = Self::analyze(&self.input, self.cpu_offset_c, transport).await;

        let (terminal, result) = match outcome {
            Ok(result) => {
                tracing::info!(risk_level = %result.risk_level, "scenario advice received");
                (SubmissionPhase::Succeeded, result)
            }
            Err(err) => {
                tracing::error!(error = %err, "scenario submission failed");
                (SubmissionPhase::Failed, AdvisoryResult::submission_error())
            }
        };

        self.result.send_replace(Some(result.clone()));
        guard.finish(terminal);

        if terminal == SubmissionPhase::Succeeded {
            self.metrics.observe_submission(OUTCOME_SUCCESS);
            let event = AdvisoryEvent::AdviceCommitted {
                risk_level: result.risk_level,
            };
            if self.events.send(event).is_err() {
                tracing::debug!("no history listener for committed advice");
            }
        } else {
            self.metrics.observe_submission(OUTCOME_FAILURE);
        }

        result
    }

    async fn analyze(
        input: &ScenarioInput,
        cpu_offset_c: f64,
        transport: &dyn AdvisoryTransport,
    ) -> Result<AdvisoryResult, SubmissionFailure> {
        let request = input.to_request(cpu_offset_c)?;
        tracing::info!(
            battery_temp = request.battery_temp,
            ambient_temp = request.ambient_temp,
            cpu_temp = request.cpu_temp,
            battery_level = request.battery_level,
            device_state = %request.device_state,
            "submitting scenario"
        );
        let raw = transport.post_advice(&request).await?;
        Ok(normalize_advice(&raw))
    }
}
