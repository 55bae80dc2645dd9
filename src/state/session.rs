//! Coordinates remote operations against the [`ResultCache`].
//!
//! The orchestrator is the only writer of the cache. Failures never touch the
//! cached set; successes swap it atomically.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use super::cache::ResultCache;
use crate::model::types::{AggregateStats, HistoryEntry, ResultSet};
use crate::remote::{AnalysisRequest, RemoteAccessor, RemoteError};

/// Errors returned by session operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("an analysis run is already in progress")]
    RunInFlight,

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

impl SessionError {
    pub fn user_message(&self) -> String {
        match self {
            SessionError::RunInFlight => {
                "An analysis is already running; wait for it to finish.".to_string()
            }
            SessionError::Remote(err) => err.user_message(),
        }
    }
}

/// Clears the in-flight flag when the run finishes or its future is dropped.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| RunGuard(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct SessionOrchestrator<A> {
    remote: A,
    cache: Arc<ResultCache>,
    running: AtomicBool,
    invalidations: watch::Sender<u64>,
}

impl<A: RemoteAccessor> SessionOrchestrator<A> {
    pub fn new(remote: A, cache: Arc<ResultCache>) -> Self {
        let (invalidations, _rx) = watch::channel(0);
        Self {
            remote,
            cache,
            running: AtomicBool::new(false),
            invalidations,
        }
    }

    pub fn cache(&self) -> &Arc<ResultCache> {
        &self.cache
    }

    /// True while a `run_analysis` call is pending.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Bumped after every successful run; history and statistics consumers
    /// refetch when it changes.
    pub fn subscribe_invalidations(&self) -> watch::Receiver<u64> {
        self.invalidations.subscribe()
    }

    /// Run an analysis and make its output the current result set.
    ///
    /// Overlapping calls are rejected with [`SessionError::RunInFlight`]
    /// without touching the cache. The remote call is never retried.
    pub async fn run_analysis(&self, request: AnalysisRequest) -> Result<ResultSet, SessionError> {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            info!("analysis already in flight; rejecting overlapping run");
            return Err(SessionError::RunInFlight);
        };

        info!(
            scenario = request.scenario.map(|s| s.id()).unwrap_or("none"),
            refresh = request.refresh,
            "running analysis"
        );
        let records = self
            .remote
            .run_analysis(request)
            .await
            .map_err(|e| report_failure("run analysis", e))?;

        let set = ResultSet::new(records);
        self.cache.replace(set.clone());
        self.invalidations.send_modify(|generation| *generation += 1);
        info!(records = set.len(), "analysis complete");
        Ok(set)
    }

    /// Load a stored analysis and make it the current result set.
    pub async fn load_historical(&self, id: i64) -> Result<ResultSet, SessionError> {
        info!(analysis_id = id, "loading historical analysis");
        let detail = self
            .remote
            .fetch_historical_detail(id)
            .await
            .map_err(|e| report_failure("load historical analysis", e))?;

        let set = ResultSet::new(detail.results);
        self.cache.replace(set.clone());
        info!(analysis_id = id, records = set.len(), "historical analysis loaded");
        Ok(set)
    }

    pub fn clear(&self) {
        info!("clearing current result set");
        self.cache.clear();
    }

    pub async fn fetch_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, SessionError> {
        self.remote
            .fetch_history(limit)
            .await
            .map_err(|e| report_failure("fetch history", e))
    }

    pub async fn fetch_stats(&self) -> Result<AggregateStats, SessionError> {
        self.remote
            .fetch_stats()
            .await
            .map_err(|e| report_failure("fetch statistics", e))
    }
}

fn report_failure(operation: &str, err: RemoteError) -> SessionError {
    match &err {
        RemoteError::ValidationFailed {
            detail,
            payload: Some(payload),
        } => warn!(operation, detail = %detail, payload = %payload, "response failed validation"),
        _ => warn!(operation, error = %err, "remote operation failed"),
    }
    SessionError::Remote(err)
}
