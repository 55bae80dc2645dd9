//! reqwest-backed accessor for the risk API.

use std::time::Duration;

use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use super::{AnalysisRequest, HistoricalDetail, RemoteAccessor, RemoteError};
use crate::config::ConsoleConfig;
use crate::model::types::{AggregateStats, HealthReport, HistoryEntry, ResultRecord};

#[derive(Debug, Serialize)]
struct AnalyzeBody<'a> {
    what_if: Option<&'a str>,
}

#[derive(Debug, serde::Deserialize)]
struct AnalyzeResponse {
    results: Vec<ResultRecord>,
}

#[derive(Debug, serde::Deserialize)]
struct HistoryResponse {
    analyses: Vec<HistoryEntry>,
}

/// HTTP client for the risk backend.
#[derive(Clone)]
pub struct HttpRemote {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl HttpRemote {
    pub fn new(config: &ConsoleConfig) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(5))
            .user_agent(concat!("risk-console/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| RemoteError::NetworkUnavailable(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => builder.header("x-api-key", key),
            None => builder,
        }
    }

    /// Send once, classify the status, and decode the body.
    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> Result<T, RemoteError> {
        let response = self
            .authorize(builder)
            .send()
            .await
            .map_err(|e| transport_error(what, &e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(what, &e))?;

        if !status.is_success() {
            debug!(what, status = status.as_u16(), "backend returned error status");
            return Err(RemoteError::from_status(status.as_u16(), &body));
        }

        decode_body(what, &body)
    }
}

fn transport_error(what: &str, err: &reqwest::Error) -> RemoteError {
    if err.is_decode() {
        return RemoteError::validation(format!("{what}: {err}"), None);
    }
    RemoteError::NetworkUnavailable(format!("{what}: {err}"))
}

/// Decode a success body; shape mismatches keep the payload for diagnosis.
fn decode_body<T: DeserializeOwned>(what: &str, body: &str) -> Result<T, RemoteError> {
    serde_json::from_str(body).map_err(|e| {
        RemoteError::validation(
            format!("{what}: unexpected response shape ({e})"),
            Some(body.to_string()),
        )
    })
}

fn validate_records(what: &str, records: &[ResultRecord]) -> Result<(), RemoteError> {
    for record in records {
        record.validate().map_err(|detail| {
            RemoteError::validation(
                format!("{what}: {detail}"),
                serde_json::to_string(record).ok(),
            )
        })?;
    }
    Ok(())
}

impl RemoteAccessor for HttpRemote {
    async fn check_health(&self) -> Result<HealthReport, RemoteError> {
        self.send_json(self.client.get(self.url("/health")), "health")
            .await
    }

    async fn run_analysis(&self, request: AnalysisRequest) -> Result<Vec<ResultRecord>, RemoteError> {
        let path = if request.refresh {
            "/analyze/refresh"
        } else {
            "/analyze"
        };
        let body = AnalyzeBody {
            what_if: request.scenario.map(|s| s.id()),
        };
        let response: AnalyzeResponse = self
            .send_json(self.client.post(self.url(path)).json(&body), "analyze")
            .await?;
        validate_records("analyze", &response.results)?;
        Ok(response.results)
    }

    async fn fetch_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, RemoteError> {
        let response: HistoryResponse = self
            .send_json(
                self.client.get(self.url(&format!("/history?limit={limit}"))),
                "history",
            )
            .await?;
        Ok(response.analyses)
    }

    async fn fetch_historical_detail(&self, id: i64) -> Result<HistoricalDetail, RemoteError> {
        let detail: HistoricalDetail = self
            .send_json(
                self.client.get(self.url(&format!("/history/{id}"))),
                "history detail",
            )
            .await?;
        validate_records("history detail", &detail.results)?;
        Ok(detail)
    }

    async fn fetch_stats(&self) -> Result<AggregateStats, RemoteError> {
        self.send_json(self.client.get(self.url("/stats")), "stats")
            .await
    }
}
