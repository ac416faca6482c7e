use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

pub const OUTCOME_SUCCESS: &str = "success";
pub const OUTCOME_FAILURE: &str = "failure";
pub const OUTCOME_SUPERSEDED: &str = "superseded";

/// Counters for the advisory workflows, kept in a private registry so that
/// several clients can live in one process.
pub struct AdvisoryMetrics {
    registry: Registry,
    submissions: IntCounterVec,
    history_refreshes: IntCounterVec,
    history_entries: IntGauge,
}

impl AdvisoryMetrics {
    pub fn new() -> prometheus::Result<Self> {
        let registry = Registry::new();

        let submissions = IntCounterVec::new(
            Opts::new(
                "advisory_submissions_total",
                "Scenario submissions by terminal outcome",
            ),
            &["outcome"],
        )?;
        let history_refreshes = IntCounterVec::new(
            Opts::new(
                "advisory_history_refresh_total",
                "History refreshes by outcome",
            ),
            &["outcome"],
        )?;
        let history_entries = IntGauge::new(
            "advisory_history_entries",
            "Entries in the cached advisory history",
        )?;

        registry.register(Box::new(submissions.clone()))?;
        registry.register(Box::new(history_refreshes.clone()))?;
        registry.register(Box::new(history_entries.clone()))?;

        Ok(Self {
            registry,
            submissions,
            history_refreshes,
            history_entries,
        })
    }

    pub fn observe_submission(&self, outcome: &str) {
        self.submissions.with_label_values(&[outcome]).inc();
    }

    pub fn observe_history_refresh(&self, outcome: &str, cached_entries: Option<usize>) {
        self.history_refreshes.with_label_values(&[outcome]).inc();
        if let Some(n) = cached_entries {
            self.history_entries.set(n as i64);
        }
    }

    pub fn submissions(&self, outcome: &str) -> u64 {
        self.submissions.with_label_values(&[outcome]).get()
    }

    pub fn history_refreshes(&self, outcome: &str) -> u64 {
        self.history_refreshes.with_label_values(&[outcome]).get()
    }

    /// Prometheus text exposition of every advisory metric.
    pub fn render(&self) -> prometheus::Result<String> {
        let mut buf = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buf)?;
        String::from_utf8(buf).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}
