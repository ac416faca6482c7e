use thermo_advisory_core::RiskLevel;
use tokio::sync::mpsc;

/// Notifications emitted by the submission workflow. The history listener
/// refreshes once per `AdviceCommitted`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvisoryEvent {
    AdviceCommitted { risk_level: RiskLevel },
}

pub type EventSender = mpsc::UnboundedSender<AdvisoryEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<AdvisoryEvent>;

pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
