use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use thermo_advisory_core::{
    AdvisoryConfig, AdvisoryRequest, HistoryEntry, HistoryResponse, LiveAdviceParams,
    AdvisoryResult, LiveSnapshot, RiskLevel, ScenarioField, UsageState,
};
use tokio::sync::{watch, Notify};

use crate::error::TransportError;
use crate::history::{HistoryWorkflow, RefreshOutcome};
use crate::metrics::{AdvisoryMetrics, OUTCOME_FAILURE, OUTCOME_SUCCESS};
use crate::snapshot::{HttpSensorFeed, SensorReport, SharedSnapshot, SnapshotProvider};
use crate::submission::SubmissionPhase;
use crate::view::AdvisoryView;

type Scripted<T> = Mutex<VecDeque<Result<T, u16>>>;

/// Scripted transport: pops one canned reply per call, records requests.
#[derive(Default)]
struct FakeTransport {
    advice: Scripted<Value>,
    history: Scripted<Value>,
    sensors: Scripted<Value>,
    advice_requests: Mutex<Vec<AdvisoryRequest>>,
    history_calls: AtomicUsize,
    phase_watch: Mutex<Option<watch::Receiver<SubmissionPhase>>>,
    phase_seen: Mutex<Vec<SubmissionPhase>>,
    result_watch: Mutex<Option<watch::Receiver<Option<AdvisoryResult>>>>,
    result_seen: Mutex<Vec<Option<AdvisoryResult>>>,
}

fn pop<T>(queue: &Scripted<T>, url: &str) -> Result<T, TransportError> {
    match queue.lock().unwrap().pop_front() {
        Some(Ok(v)) => Ok(v),
        Some(Err(status)) => Err(TransportError::Status {
            status,
            url: url.to_string(),
        }),
        None => Err(TransportError::Status {
            status: 404,
            url: url.to_string(),
        }),
    }
}

impl FakeTransport {
    fn advice_reply(self, reply: Result<Value, u16>) -> Self {
        self.advice.lock().unwrap().push_back(reply);
        self
    }

    fn history_reply(self, reply: Result<Value, u16>) -> Self {
        self.history.lock().unwrap().push_back(reply);
        self
    }

    fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl crate::transport::AdvisoryTransport for FakeTransport {
    async fn post_advice(&self, request: &AdvisoryRequest) -> Result<Value, TransportError> {
        self.advice_requests.lock().unwrap().push(request.clone());
        if let Some(rx) = self.phase_watch.lock().unwrap().as_ref() {
            self.phase_seen.lock().unwrap().push(*rx.borrow());
        }
        if let Some(rx) = self.result_watch.lock().unwrap().as_ref() {
            self.result_seen.lock().unwrap().push(rx.borrow().clone());
        }
        pop(&self.advice, "/api/advice")
    }

    async fn fetch_history(&self, _limit: usize) -> Result<HistoryResponse, TransportError> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        let raw = pop(&self.history, "/api/advice/history")?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn fetch_sensors(&self) -> Result<SensorReport, TransportError> {
        let raw = pop(&self.sensors, "/api/sensors")?;
        Ok(serde_json::from_value(raw)?)
    }

    async fn fetch_statistics(&self) -> Result<Value, TransportError> {
        Ok(json!({ "total": 3 }))
    }
}

fn history_row(ts: &str, level: &str) -> Value {
    json!({
        "timestamp": ts,
        "alert_level": level,
        "battery_temp": 36.0,
        "ambient_temp": 25.0,
        "device_state": "idle"
    })
}

fn metrics() -> Arc<AdvisoryMetrics> {
    Arc::new(AdvisoryMetrics::new().unwrap())
}

fn view_with(transport: Arc<FakeTransport>) -> AdvisoryView {
    AdvisoryView::new(
        AdvisoryConfig::default_local(),
        transport,
        Arc::new(LiveSnapshot::new(52.0, json!({ "level": 64 }))),
        metrics(),
    )
}

fn fill_form(view: &mut AdvisoryView) {
    view.edit(ScenarioField::DeviceTemp, "35.0");
    view.edit(ScenarioField::AmbientTemp, "30");
    view.edit(ScenarioField::BatteryLevel, "80");
    view.set_usage(UsageState::Charging);
}

#[tokio::test]
async fn scenario_uses_offset_cpu_temp_not_live_snapshot() {
    let transport = Arc::new(FakeTransport::default().advice_reply(Ok(json!({
        "alert_level": "safe",
        "natural_language_tip": "All good.",
        "optional_action": null,
        "predicted_health_impact": 0.02
    }))));
    let mut view = view_with(Arc::clone(&transport));
    fill_form(&mut view);

    let result = view.submit().await;
    assert_eq!(result.risk_level, RiskLevel::Safe);
    assert_eq!(result.impact, "Predicted health impact: 2.0%");

    let sent = transport.advice_requests.lock().unwrap().clone();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].cpu_temp, 40.0);
    assert_ne!(sent[0].cpu_temp, 52.0);
    assert_eq!(sent[0].battery_level, 80);
    assert_eq!(sent[0].device_state, "charging");
}

#[tokio::test]
async fn server_error_collapses_to_fixed_error_result() {
    let transport = Arc::new(FakeTransport::default().advice_reply(Err(500)));
    let mut view = view_with(Arc::clone(&transport));
    fill_form(&mut view);

    let result = view.submit().await;
    assert_eq!(result.risk_level, RiskLevel::Error);
    assert_eq!(result.action_items, vec!["Please try again later".to_string()]);
    assert_eq!(result.impact, "Predicted health impact: N/A");

    let state = view.state();
    assert_eq!(state.phase, SubmissionPhase::Failed);
    assert!(!state.loading);
    assert_eq!(view.metrics().submissions(OUTCOME_FAILURE), 1);

    view.shutdown().await;
    assert_eq!(transport.history_calls(), 0);
}

#[tokio::test]
async fn unparseable_form_fails_without_network() {
    let transport = Arc::new(FakeTransport::default());
    let mut view = view_with(Arc::clone(&transport));
    fill_form(&mut view);
    view.edit(ScenarioField::AmbientTemp, "warm");

    let result = view.submit().await;
    assert!(result.is_error());
    assert!(transport.advice_requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn loading_is_true_only_while_in_flight() {
    let transport = Arc::new(
        FakeTransport::default()
            .advice_reply(Ok(json!({ "alert_level": "warning" })))
            .advice_reply(Err(503)),
    );
    let mut view = view_with(Arc::clone(&transport));
    *transport.phase_watch.lock().unwrap() = Some(view.submission().subscribe());
    fill_form(&mut view);

    assert!(!view.state().loading);
    assert!(view.state().can_submit);
    view.submit().await;
    assert!(!view.state().loading);
    view.submit().await;
    assert!(!view.state().loading);

    let seen = transport.phase_seen.lock().unwrap().clone();
    assert_eq!(
        seen,
        vec![SubmissionPhase::Submitting, SubmissionPhase::Submitting]
    );
}

#[tokio::test]
async fn new_submission_clears_previous_result_while_in_flight() {
    let transport = Arc::new(
        FakeTransport::default()
            .advice_reply(Ok(json!({ "alert_level": "danger" })))
            .advice_reply(Ok(json!({ "alert_level": "safe" }))),
    );
    let mut view = view_with(Arc::clone(&transport));
    *transport.result_watch.lock().unwrap() = Some(view.submission().subscribe_result());
    fill_form(&mut view);

    view.submit().await;
    assert_eq!(view.state().result.unwrap().risk_level, RiskLevel::Danger);

    let second = view.submit().await;
    assert_eq!(second.risk_level, RiskLevel::Safe);
    assert_eq!(view.state().result, Some(second));

    let seen = transport.result_seen.lock().unwrap().clone();
    assert_eq!(seen, vec![None, None]);
}

#[tokio::test]
async fn success_triggers_exactly_one_history_refresh() {
    let transport = Arc::new(
        FakeTransport::default()
            .advice_reply(Ok(json!({ "alert_level": "danger" })))
            .history_reply(Ok(json!({
                "history": [history_row("2024-03-05T14:07:00", "danger")]
            }))),
    );
    let mut view = view_with(Arc::clone(&transport));
    fill_form(&mut view);
    let history = view.history().clone();

    view.submit().await;
    assert_eq!(view.metrics().submissions(OUTCOME_SUCCESS), 1);
    view.shutdown().await;

    assert_eq!(transport.history_calls(), 1);
    assert_eq!(history.len(), 1);
    assert!(!history.loading());
}

#[tokio::test]
async fn show_refreshes_once_per_hidden_to_visible_transition() {
    let transport = Arc::new(
        FakeTransport::default()
            .history_reply(Ok(json!({ "history": [] })))
            .history_reply(Ok(json!({ "history": [] }))),
    );
    let mut view = view_with(Arc::clone(&transport));

    view.show().unwrap().await.unwrap();
    assert!(view.show().is_none());
    view.hide();
    view.show().unwrap().await.unwrap();

    assert_eq!(transport.history_calls(), 2);
}

#[tokio::test]
async fn toggling_history_never_fetches() {
    let transport = Arc::new(FakeTransport::default());
    let view = view_with(Arc::clone(&transport));

    assert!(view.toggle_history());
    assert!(!view.toggle_history());
    assert!(view.toggle_history());
    assert!(view.state().history_visible);
    assert_eq!(transport.history_calls(), 0);
}

#[tokio::test]
async fn history_is_replaced_wholesale_and_kept_on_failure() {
    let transport = Arc::new(
        FakeTransport::default()
            .history_reply(Ok(json!({
                "history": [
                    history_row("2024-03-05T14:07:00", "danger"),
                    history_row("2024-03-05T13:00:00", "safe")
                ]
            })))
            .history_reply(Err(500))
            .history_reply(Ok(json!({
                "history": [history_row("2024-03-06T08:00:00", "warning")]
            })))
            .history_reply(Ok(json!({ "history": [] }))),
    );
    let history = HistoryWorkflow::new(transport, 20, metrics());

    assert_eq!(history.refresh().await.unwrap(), RefreshOutcome::Applied(2));
    assert!(history.refresh().await.is_err());
    assert_eq!(history.len(), 2);
    assert!(!history.loading());

    assert_eq!(history.refresh().await.unwrap(), RefreshOutcome::Applied(1));
    let entries: Vec<HistoryEntry> = history.entries();
    assert_eq!(entries[0].alert_level, "warning");

    assert_eq!(history.refresh().await.unwrap(), RefreshOutcome::Applied(0));
    assert!(history.is_empty());
}

/// Holds the first history reply until released so two refreshes overlap.
struct GatedHistory {
    gate: Notify,
    calls: AtomicUsize,
}

#[async_trait]
impl crate::transport::AdvisoryTransport for GatedHistory {
    async fn post_advice(&self, _request: &AdvisoryRequest) -> Result<Value, TransportError> {
        Ok(json!({}))
    }

    async fn fetch_history(&self, _limit: usize) -> Result<HistoryResponse, TransportError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call == 0 {
            self.gate.notified().await;
            return Ok(serde_json::from_value(json!({
                "history": [history_row("2024-01-01T00:00:00", "safe")]
            }))?);
        }
        Ok(serde_json::from_value(json!({
            "history": [
                history_row("2024-01-02T00:00:00", "danger"),
                history_row("2024-01-01T00:00:00", "safe")
            ]
        }))?)
    }

    async fn fetch_sensors(&self) -> Result<SensorReport, TransportError> {
        Ok(SensorReport::default())
    }

    async fn fetch_statistics(&self) -> Result<Value, TransportError> {
        Ok(Value::Null)
    }
}

#[tokio::test]
async fn late_response_from_older_refresh_is_discarded() {
    let transport = Arc::new(GatedHistory {
        gate: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let history = HistoryWorkflow::new(Arc::clone(&transport) as _, 20, metrics());

    let slow = history.clone();
    let first = tokio::spawn(async move { slow.refresh().await });
    while transport.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert!(history.loading());

    assert_eq!(history.refresh().await.unwrap(), RefreshOutcome::Applied(2));
    assert!(history.loading());

    transport.gate.notify_one();
    assert_eq!(first.await.unwrap().unwrap(), RefreshOutcome::Superseded);
    assert_eq!(history.len(), 2);
    assert!(!history.loading());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn loading_clears_together_with_new_entries() {
    let transport = Arc::new(GatedHistory {
        gate: Notify::new(),
        calls: AtomicUsize::new(0),
    });
    let history = HistoryWorkflow::new(Arc::clone(&transport) as _, 20, metrics());

    let worker = history.clone();
    let refresh = tokio::spawn(async move { worker.refresh().await });
    while !history.loading() {
        tokio::task::yield_now().await;
    }
    transport.gate.notify_one();

    loop {
        let snap = history.snapshot();
        if !snap.loading {
            assert_eq!(snap.entries.len(), 1);
            break;
        }
        tokio::task::yield_now().await;
    }
    assert_eq!(refresh.await.unwrap().unwrap(), RefreshOutcome::Applied(1));
}

#[tokio::test]
async fn live_advice_fills_defaults_from_snapshot() {
    let transport = Arc::new(FakeTransport::default().advice_reply(Ok(json!({
        "alert_level": "warning",
        "optional_action": ["Reduce workload", "Unplug charger"]
    }))));
    let view = view_with(Arc::clone(&transport));

    let result = view
        .request_live_advice(LiveAdviceParams {
            ambient_temp: 27.0,
            device_state: "discharging".into(),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(result.action_items.len(), 2);

    let sent = transport.advice_requests.lock().unwrap().clone();
    assert_eq!(sent[0].battery_level, 75);
    assert_eq!(sent[0].cpu_temp, 52.0);
    assert_eq!(view.statistics().await.unwrap()["total"], 3);
}

#[tokio::test]
async fn view_state_always_carries_live_summary() {
    let transport = Arc::new(FakeTransport::default());
    let mut view = view_with(transport);
    let state = view.state();
    assert!(!state.visible);
    assert_eq!(state.analysis.device_temp, 52.0);
    assert!(state.analysis.health.is_none());
    assert!(state.result.is_none());
    assert!(!state.can_submit);

    view.set_health(Some(
        serde_json::from_value(json!({
            "healthScore": 91.0,
            "alertLevel": "safe",
            "recommendations": []
        }))
        .unwrap(),
    ));
    assert_eq!(view.state().analysis.health.unwrap().health_score, 91.0);
}

#[tokio::test]
async fn sensor_feed_updates_shared_snapshot() {
    let transport = Arc::new(FakeTransport::default());
    transport.sensors.lock().unwrap().push_back(Ok(json!({
        "battery": { "level": 88, "charging": true },
        "temperature": { "cpu": 61.0, "battery": 38.5, "system": 40.0, "source": "WMI" },
        "system": { "cpu_usage": 25 },
        "timestamp": "2024-03-05T14:07:00"
    })));
    transport
        .sensors
        .lock()
        .unwrap()
        .push_back(Ok(json!({ "battery": { "level": 87 }, "temperature": {} })));

    let shared = SharedSnapshot::default();
    let feed = HttpSensorFeed::new(transport, shared.clone());

    let snap = feed.pull().await.unwrap();
    assert_eq!(snap.device_temp, 38.5);
    assert_eq!(shared.latest().battery_data["level"], 88);

    let snap = feed.pull().await.unwrap();
    assert_eq!(snap.device_temp, 38.5);
    assert_eq!(shared.latest().battery_data["level"], 87);
}
