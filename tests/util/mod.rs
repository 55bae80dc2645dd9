use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;
use risk_console::model::types::{
    AggregateStats, Counterfactual, HealthReport, HistoryEntry, ResultRecord, RiskLevel, Scenario,
};
use risk_console::remote::{AnalysisRequest, HistoricalDetail, RemoteAccessor, RemoteError};
use tokio::sync::Notify;

/// Captures tracing output for tests.
#[allow(dead_code)]
pub struct TestTracing {
    buffer: Arc<std::sync::Mutex<Vec<u8>>>,
}

#[allow(dead_code)]
impl TestTracing {
    pub fn new() -> Self {
        Self {
            buffer: Arc::new(std::sync::Mutex::new(Vec::new())),
        }
    }

    pub fn install(&self) -> tracing::subscriber::DefaultGuard {
        let writer = self.buffer.clone();
        let make_writer = move || TestWriter(writer.clone());
        let subscriber = tracing_subscriber::fmt()
            .with_ansi(false)
            .without_time()
            .with_writer(make_writer)
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn output(&self) -> String {
        let buf = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Assert that the captured log output contains the provided substring.
    pub fn assert_contains(&self, needle: &str) {
        let out = self.output();
        assert!(
            out.contains(needle),
            "expected logs to contain `{needle}`, got:\n{out}"
        );
    }
}

struct TestWriter(Arc<std::sync::Mutex<Vec<u8>>>);

impl std::io::Write for TestWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.0.lock().unwrap();
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
pub fn record(id: &str, level: RiskLevel, score: u8) -> ResultRecord {
    ResultRecord {
        id: id.to_string(),
        risk_level: level,
        risk_score: score,
        delay_probability: f64::from(score) / 100.0,
        reasons: vec![
            "Frequent task blocking (3+ events)".to_string(),
            "Heavy dependency constraints (2+ deps)".to_string(),
        ],
        recommended_actions: vec!["[HIGH] Allocate additional resources to this task".to_string()],
        counterfactual: None,
    }
}

#[allow(dead_code)]
pub fn record_with_what_if(id: &str, level: RiskLevel, score: u8, reduction: f64) -> ResultRecord {
    let mut rec = record(id, level, score);
    rec.counterfactual = Some(Counterfactual {
        scenario: Some(Scenario::AddResource),
        new_delay_probability: (rec.delay_probability - reduction).max(0.0),
        probability_reduction: reduction,
    });
    rec
}

/// The three-task run used across scenarios: scores 75 / 45 / 20.
#[allow(dead_code)]
pub fn three_tasks() -> Vec<ResultRecord> {
    vec![
        record("TASK-1", RiskLevel::High, 75),
        record("TASK-2", RiskLevel::Medium, 45),
        record("TASK-3", RiskLevel::Low, 20),
    ]
}

#[allow(dead_code)]
pub fn history_entry(id: i64, results: &[ResultRecord]) -> HistoricalDetail {
    let count = |level| results.iter().filter(|r| r.risk_level == level).count() as i64;
    HistoricalDetail {
        entry: HistoryEntry {
            id,
            scenario: None,
            model_type: Some("rule_based".to_string()),
            num_tasks: results.len() as i64,
            high_risk_count: count(RiskLevel::High),
            medium_risk_count: count(RiskLevel::Medium),
            low_risk_count: count(RiskLevel::Low),
            created_at: Some("2026-10-01 09:30:00".to_string()),
        },
        results: results.to_vec(),
    }
}

#[derive(Default)]
struct Inner {
    analyses: Mutex<VecDeque<Result<Vec<ResultRecord>, RemoteError>>>,
    details: Mutex<HashMap<i64, HistoricalDetail>>,
    health: Mutex<VecDeque<Result<HealthReport, RemoteError>>>,
    health_fallback: Mutex<Option<Result<HealthReport, RemoteError>>>,
    history: Mutex<Vec<HistoryEntry>>,
    requests: Mutex<Vec<AnalysisRequest>>,
    gate: Mutex<Option<Arc<Notify>>>,
    detail_gates: Mutex<HashMap<i64, Arc<Notify>>>,
    health_calls: AtomicUsize,
    detail_calls: AtomicUsize,
}

/// In-memory backend with scripted responses.
///
/// Queued responses are consumed in order. Once the health queue drains the
/// fallback answer repeats (healthy unless set otherwise).
#[derive(Clone, Default)]
pub struct FakeRemote {
    inner: Arc<Inner>,
}

#[allow(dead_code)]
impl FakeRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_analysis(&self, result: Result<Vec<ResultRecord>, RemoteError>) -> &Self {
        self.inner.analyses.lock().push_back(result);
        self
    }

    pub fn insert_detail(&self, detail: HistoricalDetail) -> &Self {
        self.inner
            .history
            .lock()
            .push(detail.entry.clone());
        self.inner.details.lock().insert(detail.entry.id, detail);
        self
    }

    pub fn push_health(&self, result: Result<HealthReport, RemoteError>) -> &Self {
        self.inner.health.lock().push_back(result);
        self
    }

    pub fn set_health_fallback(&self, result: Result<HealthReport, RemoteError>) -> &Self {
        *self.inner.health_fallback.lock() = Some(result);
        self
    }

    /// Hold every analysis call until the returned handle is notified.
    pub fn gate_analysis(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.inner.gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold fetches of analysis `id` until the returned handle is notified.
    pub fn gate_detail(&self, id: i64) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.detail_gates.lock().insert(id, Arc::clone(&gate));
        gate
    }

    /// Detail fetches that have started, gated or not.
    pub fn detail_calls(&self) -> usize {
        self.inner.detail_calls.load(Ordering::SeqCst)
    }

    pub fn health_calls(&self) -> usize {
        self.inner.health_calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<AnalysisRequest> {
        self.inner.requests.lock().clone()
    }
}

pub fn healthy() -> Result<HealthReport, RemoteError> {
    Ok(HealthReport {
        status: "ok".to_string(),
        version: "2.1.0".to_string(),
    })
}

impl RemoteAccessor for FakeRemote {
    async fn check_health(&self) -> Result<HealthReport, RemoteError> {
        self.inner.health_calls.fetch_add(1, Ordering::SeqCst);
        let queued = self.inner.health.lock().pop_front();
        queued.unwrap_or_else(|| self.inner.health_fallback.lock().clone().unwrap_or_else(healthy))
    }

    async fn run_analysis(
        &self,
        request: AnalysisRequest,
    ) -> Result<Vec<ResultRecord>, RemoteError> {
        self.inner.requests.lock().push(request);
        let gate = self.inner.gate.lock().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let next = self.inner.analyses.lock().pop_front();
        next.unwrap_or_else(|| Err(RemoteError::ServerFault {
            status: 500,
            detail: "no scripted analysis".to_string(),
        }))
    }

    async fn fetch_history(&self, limit: usize) -> Result<Vec<HistoryEntry>, RemoteError> {
        let mut entries = self.inner.history.lock().clone();
        entries.sort_by(|a, b| b.id.cmp(&a.id));
        entries.truncate(limit);
        Ok(entries)
    }

    async fn fetch_historical_detail(&self, id: i64) -> Result<HistoricalDetail, RemoteError> {
        self.inner.detail_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.inner.detail_gates.lock().get(&id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        let found = self.inner.details.lock().get(&id).cloned();
        found.ok_or_else(|| {
            RemoteError::from_status(404, r#"{"detail": "Analysis not found"}"#)
        })
    }

    async fn fetch_stats(&self) -> Result<AggregateStats, RemoteError> {
        let history = self.inner.history.lock();
        Ok(AggregateStats {
            total_analyses: Some(history.len() as i64),
            total_tasks_analyzed: Some(history.iter().map(|e| e.num_tasks).sum()),
            total_high_risk: Some(history.iter().map(|e| e.high_risk_count).sum()),
            total_medium_risk: Some(history.iter().map(|e| e.medium_risk_count).sum()),
            total_low_risk: Some(history.iter().map(|e| e.low_risk_count).sum()),
            last_analysis: history.iter().filter_map(|e| e.created_at.clone()).max(),
        })
    }
}
