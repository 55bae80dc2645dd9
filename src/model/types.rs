//! Normalized entity structs shared by the remote layer, the cache and the views.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// Risk classification assigned by the backend.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RiskLevel {
    High,
    Medium,
    Low,
}

impl RiskLevel {
    pub const ALL: [RiskLevel; 3] = [RiskLevel::High, RiskLevel::Medium, RiskLevel::Low];

    /// Severity rank; higher is more severe.
    pub fn rank(self) -> u8 {
        match self {
            RiskLevel::High => 2,
            RiskLevel::Medium => 1,
            RiskLevel::Low => 0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskLevel::High => "High",
            RiskLevel::Medium => "Medium",
            RiskLevel::Low => "Low",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What-if interventions the backend knows how to simulate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    AddResource,
    ReduceDependencies,
    ImproveProcess,
}

impl Scenario {
    pub const ALL: [Scenario; 3] = [
        Scenario::AddResource,
        Scenario::ReduceDependencies,
        Scenario::ImproveProcess,
    ];

    /// Wire identifier, as accepted by `POST /analyze`.
    pub fn id(self) -> &'static str {
        match self {
            Scenario::AddResource => "add_resource",
            Scenario::ReduceDependencies => "reduce_dependencies",
            Scenario::ImproveProcess => "improve_process",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Scenario::AddResource => "Add one resource to the project",
            Scenario::ReduceDependencies => "Reduce task coupling through refactoring",
            Scenario::ImproveProcess => "Implement quality improvements and better monitoring",
        }
    }

    /// Next scenario in the cycle `none -> add_resource -> ... -> none`.
    pub fn cycle(current: Option<Scenario>) -> Option<Scenario> {
        match current {
            None => Some(Scenario::AddResource),
            Some(Scenario::AddResource) => Some(Scenario::ReduceDependencies),
            Some(Scenario::ReduceDependencies) => Some(Scenario::ImproveProcess),
            Some(Scenario::ImproveProcess) => None,
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Scenario {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Scenario::ALL
            .into_iter()
            .find(|sc| sc.id() == s)
            .ok_or_else(|| {
                let valid: Vec<&str> = Scenario::ALL.iter().map(|sc| sc.id()).collect();
                format!("unknown scenario '{s}' (valid: {})", valid.join(", "))
            })
    }
}

/// Alternate probability estimate under a what-if intervention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Counterfactual {
    #[serde(default)]
    pub scenario: Option<Scenario>,
    pub new_delay_probability: f64,
    /// Missing or `null` on the wire; both read as no reduction.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub probability_reduction: f64,
}

fn null_as_zero<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

/// Risk assessment for a single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    #[serde(rename = "task_id")]
    pub id: String,
    pub risk_level: RiskLevel,
    pub risk_score: u8,
    pub delay_probability: f64,
    #[serde(default)]
    pub reasons: Vec<String>,
    #[serde(default)]
    pub recommended_actions: Vec<String>,
    #[serde(rename = "what_if_impact", default)]
    pub counterfactual: Option<Counterfactual>,
}

impl ResultRecord {
    /// Checks the numeric ranges the backend schema promises.
    pub fn validate(&self) -> Result<(), String> {
        if self.risk_score > 100 {
            return Err(format!(
                "task {}: risk_score {} outside 0..=100",
                self.id, self.risk_score
            ));
        }
        if !(0.0..=1.0).contains(&self.delay_probability) {
            return Err(format!(
                "task {}: delay_probability {} outside 0..=1",
                self.id, self.delay_probability
            ));
        }
        if let Some(cf) = &self.counterfactual
            && !(0.0..=1.0).contains(&cf.new_delay_probability)
        {
            return Err(format!(
                "task {}: new_delay_probability {} outside 0..=1",
                self.id, cf.new_delay_probability
            ));
        }
        Ok(())
    }
}

/// Per-level record counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl RiskCounts {
    pub fn of(records: &[ResultRecord]) -> Self {
        let mut counts = Self::default();
        for record in records {
            match record.risk_level {
                RiskLevel::High => counts.high += 1,
                RiskLevel::Medium => counts.medium += 1,
                RiskLevel::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn get(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::High => self.high,
            RiskLevel::Medium => self.medium,
            RiskLevel::Low => self.low,
        }
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Immutable, cheaply clonable snapshot of one analysis output.
///
/// Counts are computed once at construction so a reader can never see a
/// length that disagrees with its partition.
#[derive(Debug, Clone, Default)]
pub struct ResultSet {
    records: Arc<[ResultRecord]>,
    counts: RiskCounts,
}

impl ResultSet {
    pub fn new(records: Vec<ResultRecord>) -> Self {
        let counts = RiskCounts::of(&records);
        Self {
            records: records.into(),
            counts,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn counts(&self) -> RiskCounts {
        self.counts
    }

    pub fn get(&self, id: &str) -> Option<&ResultRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// True when both handles point at the same snapshot.
    pub fn same_snapshot(&self, other: &ResultSet) -> bool {
        Arc::ptr_eq(&self.records, &other.records)
    }

    /// Mean risk score, `0.0` for an empty set.
    pub fn mean_score(&self) -> f64 {
        if self.records.is_empty() {
            return 0.0;
        }
        let sum: u64 = self.records.iter().map(|r| u64::from(r.risk_score)).sum();
        sum as f64 / self.records.len() as f64
    }
}

impl From<Vec<ResultRecord>> for ResultSet {
    fn from(records: Vec<ResultRecord>) -> Self {
        Self::new(records)
    }
}

/// Summary of one past analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: i64,
    #[serde(rename = "what_if_scenario", default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub num_tasks: i64,
    #[serde(default)]
    pub high_risk_count: i64,
    #[serde(default)]
    pub medium_risk_count: i64,
    #[serde(default)]
    pub low_risk_count: i64,
    #[serde(default)]
    pub created_at: Option<String>,
}

/// Aggregate counters across every stored analysis.
///
/// Sums come back `null` when the backend store is empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateStats {
    #[serde(default)]
    pub total_analyses: Option<i64>,
    #[serde(default)]
    pub total_tasks_analyzed: Option<i64>,
    #[serde(default)]
    pub total_high_risk: Option<i64>,
    #[serde(default)]
    pub total_medium_risk: Option<i64>,
    #[serde(default)]
    pub total_low_risk: Option<i64>,
    #[serde(default)]
    pub last_analysis: Option<String>,
}

/// Backend health check payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: String,
    #[serde(default)]
    pub version: String,
}

impl HealthReport {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}
