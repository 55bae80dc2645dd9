//! Remote data access for the delay-risk backend.
//!
//! The [`RemoteAccessor`] trait is the seam between the session layer and the
//! transport. [`http::HttpRemote`] talks to the real backend; tests plug in an
//! in-memory accessor.

pub mod http;

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::types::{
    AggregateStats, HealthReport, HistoryEntry, ResultRecord, Scenario,
};

pub use http::HttpRemote;

/// Errors surfaced by remote operations.
///
/// Every variant is recoverable; callers turn them into a notification.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RemoteError {
    #[error("backend unreachable: {0}")]
    NetworkUnavailable(String),

    #[error("authentication rejected (HTTP {status})")]
    AuthenticationFailed { status: u16 },

    #[error("rate limited: {detail}")]
    RateLimited { detail: String },

    #[error("server fault (HTTP {status}): {detail}")]
    ServerFault { status: u16, detail: String },

    #[error("validation failed: {detail}")]
    ValidationFailed {
        detail: String,
        /// Raw body that failed to validate, when there was one.
        payload: Option<String>,
    },
}

impl RemoteError {
    /// Classify a non-success HTTP status.
    pub fn from_status(status: u16, body: &str) -> Self {
        let detail = error_detail(body);
        match status {
            401 | 403 => RemoteError::AuthenticationFailed { status },
            429 => RemoteError::RateLimited { detail },
            500..=599 => RemoteError::ServerFault { status, detail },
            _ => RemoteError::ValidationFailed {
                detail: format!("HTTP {status}: {detail}"),
                payload: Some(body.to_string()),
            },
        }
    }

    pub fn validation(detail: impl Into<String>, payload: Option<String>) -> Self {
        RemoteError::ValidationFailed {
            detail: detail.into(),
            payload,
        }
    }

    /// Short, distinct message per error class for the status line.
    pub fn user_message(&self) -> String {
        match self {
            RemoteError::NetworkUnavailable(_) => {
                "Backend unreachable. Check that the risk API is running.".to_string()
            }
            RemoteError::AuthenticationFailed { .. } => {
                "Authentication failed. Check RISK_CONSOLE_API_KEY.".to_string()
            }
            RemoteError::RateLimited { .. } => {
                "Rate limit reached. Wait a minute before running again.".to_string()
            }
            RemoteError::ServerFault { status, .. } => {
                format!("Server error ({status}). The analysis could not be completed.")
            }
            RemoteError::ValidationFailed { detail, .. } => {
                format!("Invalid request or response: {detail}")
            }
        }
    }
}

/// Pull FastAPI's `{"detail": ...}` out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").cloned())
        .map(|d| match d {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        })
        .unwrap_or_else(|| body.trim().to_string())
}

/// Parameters of one analysis run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AnalysisRequest {
    pub scenario: Option<Scenario>,
    /// Ask the backend to retrain before scoring.
    pub refresh: bool,
}

impl AnalysisRequest {
    pub fn with_scenario(scenario: Option<Scenario>) -> Self {
        Self {
            scenario,
            refresh: false,
        }
    }
}

/// Full record of one stored analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalDetail {
    #[serde(flatten)]
    pub entry: HistoryEntry,
    #[serde(default)]
    pub results: Vec<ResultRecord>,
}

/// The remote operations the console depends on.
///
/// All operations except [`RemoteAccessor::run_analysis`] are idempotent.
/// `run_analysis` has backend side effects and must never be retried
/// automatically.
pub trait RemoteAccessor: Send + Sync + 'static {
    fn check_health(&self) -> impl Future<Output = Result<HealthReport, RemoteError>> + Send;

    fn run_analysis(
        &self,
        request: AnalysisRequest,
    ) -> impl Future<Output = Result<Vec<ResultRecord>, RemoteError>> + Send;

    fn fetch_history(
        &self,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<HistoryEntry>, RemoteError>> + Send;

    fn fetch_historical_detail(
        &self,
        id: i64,
    ) -> impl Future<Output = Result<HistoricalDetail, RemoteError>> + Send;

    fn fetch_stats(&self) -> impl Future<Output = Result<AggregateStats, RemoteError>> + Send;
}
