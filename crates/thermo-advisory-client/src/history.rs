//! Cached advisory history.
//!
//! The cache is replaced wholesale on every successful fetch and left alone
//! on failure. Refreshes may overlap; each one takes a ticket when issued
//! and its response is committed only if no later-issued refresh has
//! committed first.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use thermo_advisory_core::HistoryEntry;
use tokio::task::JoinHandle;

use crate::error::HistoryFetchFailure;
use crate::events::{AdvisoryEvent, EventReceiver};
use crate::metrics::{AdvisoryMetrics, OUTCOME_FAILURE, OUTCOME_SUCCESS, OUTCOME_SUPERSEDED};
use crate::transport::AdvisoryTransport;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// The response replaced the cache; carries the new entry count.
    Applied(usize),
    /// A later-issued refresh already committed; the response was dropped.
    Superseded,
}

#[derive(Debug, Default)]
struct HistoryState {
    entries: Vec<HistoryEntry>,
    visible: bool,
    in_flight: usize,
    issued: u64,
    committed: u64,
}

fn lock(state: &Mutex<HistoryState>) -> MutexGuard<'_, HistoryState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Counts one refresh as in flight until settled or dropped.
struct InFlight {
    state: Arc<Mutex<HistoryState>>,
    armed: bool,
}

impl InFlight {
    /// Releases the count under a lock the caller already holds.
    fn settle(mut self, st: &mut HistoryState) {
        st.in_flight = st.in_flight.saturating_sub(1);
        self.armed = false;
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.armed {
            let mut st = lock(&self.state);
            st.in_flight = st.in_flight.saturating_sub(1);
        }
    }
}

/// Display flags and entries read under one lock.
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    pub visible: bool,
    pub loading: bool,
    pub entries: Vec<HistoryEntry>,
}

#[derive(Clone)]
pub struct HistoryWorkflow {
    state: Arc<Mutex<HistoryState>>,
    transport: Arc<dyn AdvisoryTransport>,
    limit: usize,
    metrics: Arc<AdvisoryMetrics>,
}

impl HistoryWorkflow {
    pub fn new(
        transport: Arc<dyn AdvisoryTransport>,
        limit: usize,
        metrics: Arc<AdvisoryMetrics>,
    ) -> Self {
        Self {
            state: Arc::new(Mutex::new(HistoryState::default())),
            transport,
            limit,
            metrics,
        }
    }

    pub fn entries(&self) -> Vec<HistoryEntry> {
        lock(&self.state).entries.clone()
    }

    pub fn len(&self) -> usize {
        lock(&self.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True while any refresh is in flight.
    pub fn loading(&self) -> bool {
        lock(&self.state).in_flight > 0
    }

    pub fn visible(&self) -> bool {
        lock(&self.state).visible
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        let st = lock(&self.state);
        HistorySnapshot {
            visible: st.visible,
            loading: st.in_flight > 0,
            entries: st.entries.clone(),
        }
    }

    /// Flips the display flag. Never refetches.
    pub fn toggle_visibility(&self) -> bool {
        let mut st = lock(&self.state);
        st.visible = !st.visible;
        st.visible
    }

    pub async fn refresh(&self) -> Result<RefreshOutcome, HistoryFetchFailure> {
        let (ticket, in_flight) = {
            let mut st = lock(&self.state);
            st.issued += 1;
            st.in_flight += 1;
            (
                st.issued,
                InFlight {
                    state: Arc::clone(&self.state),
                    armed: true,
                },
            )
        };

        let fetched = self.transport.fetch_history(self.limit).await;

        let response = match fetched {
            Ok(response) => response,
            Err(err) => {
                drop(in_flight);
                tracing::error!(error = %err, ticket, "history fetch failed, keeping cached entries");
                self.metrics.observe_history_refresh(OUTCOME_FAILURE, None);
                return Err(HistoryFetchFailure(err));
            }
        };

        let mut st = lock(&self.state);
        in_flight.settle(&mut st);
        if ticket < st.committed {
            tracing::debug!(ticket, committed = st.committed, "dropping superseded history response");
            drop(st);
            self.metrics.observe_history_refresh(OUTCOME_SUPERSEDED, None);
            return Ok(RefreshOutcome::Superseded);
        }
        st.entries = response.into_entries();
        st.committed = ticket;
        let count = st.entries.len();
        drop(st);

        tracing::info!(entries = count, "advisory history refreshed");
        self.metrics.observe_history_refresh(OUTCOME_SUCCESS, Some(count));
        Ok(RefreshOutcome::Applied(count))
    }

    /// Fire-and-forget refresh on the current runtime.
    pub fn spawn_refresh(&self) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            // Failures are already logged and leave the cache untouched.
            let _ = this.refresh().await;
        })
    }

    /// Refreshes once per committed advice until every sender is dropped.
    pub fn spawn_listener(&self, mut events: EventReceiver) -> JoinHandle<()> {
        let this = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                match event {
                    AdvisoryEvent::AdviceCommitted { risk_level } => {
                        tracing::debug!(%risk_level, "advice committed, refreshing history");
                        let _ = this.refresh().await;
                    }
                }
            }
        })
    }
}
