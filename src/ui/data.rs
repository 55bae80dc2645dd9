//! View-side models and formatting helpers.

use chrono::{DateTime, NaiveDateTime};

use crate::model::types::{AggregateStats, HistoryEntry};

/// Top-level screens.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum View {
    Run,
    Results,
    History,
}

impl View {
    pub const ALL: [View; 3] = [View::Run, View::Results, View::History];

    pub fn next(self) -> Self {
        match self {
            View::Run => View::Results,
            View::Results => View::History,
            View::History => View::Run,
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            View::Run => "Run",
            View::Results => "Results",
            View::History => "History",
        }
    }

    pub fn index(self) -> usize {
        match self {
            View::Run => 0,
            View::Results => 1,
            View::History => 2,
        }
    }
}

/// Fetch state of a remote list that is refetched on demand.
#[derive(Clone, Debug, PartialEq)]
pub enum Fetch<T> {
    Idle,
    Loading,
    Loaded(T),
    Failed(String),
}

impl<T> Fetch<T> {
    pub fn loaded(&self) -> Option<&T> {
        match self {
            Fetch::Loaded(value) => Some(value),
            _ => None,
        }
    }
}

/// History screen model: the fetched entries plus a cursor.
#[derive(Clone, Debug)]
pub struct HistoryPanel {
    pub entries: Fetch<Vec<HistoryEntry>>,
    pub cursor: usize,
    /// Id of the analysis currently loaded into the result set, if any.
    pub loaded_id: Option<i64>,
}

impl Default for HistoryPanel {
    fn default() -> Self {
        Self {
            entries: Fetch::Idle,
            cursor: 0,
            loaded_id: None,
        }
    }
}

impl HistoryPanel {
    pub fn set_entries(&mut self, entries: Vec<HistoryEntry>) {
        self.cursor = self.cursor.min(entries.len().saturating_sub(1));
        self.entries = Fetch::Loaded(entries);
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let len = self.entries.loaded().map_or(0, Vec::len);
        if len == 0 {
            self.cursor = 0;
            return;
        }
        let next = self.cursor as isize + delta;
        self.cursor = next.clamp(0, len as isize - 1) as usize;
    }

    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.loaded().and_then(|e| e.get(self.cursor))
    }
}

pub fn history_row(entry: &HistoryEntry) -> String {
    format!(
        "#{:<4} {:<19} {:<20} {:>3} tasks  H{:<3} M{:<3} L{:<3}",
        entry.id,
        entry
            .created_at
            .as_deref()
            .map(format_created_at)
            .unwrap_or_else(|| "-".to_string()),
        entry.scenario.as_deref().unwrap_or("baseline"),
        entry.num_tasks,
        entry.high_risk_count,
        entry.medium_risk_count,
        entry.low_risk_count,
    )
}

pub fn stats_lines(stats: &AggregateStats) -> Vec<String> {
    let n = |v: Option<i64>| v.unwrap_or(0);
    vec![
        format!("analyses: {}", n(stats.total_analyses)),
        format!("tasks analyzed: {}", n(stats.total_tasks_analyzed)),
        format!(
            "high / medium / low: {} / {} / {}",
            n(stats.total_high_risk),
            n(stats.total_medium_risk),
            n(stats.total_low_risk)
        ),
        format!(
            "last analysis: {}",
            stats
                .last_analysis
                .as_deref()
                .map(format_created_at)
                .unwrap_or_else(|| "never".to_string())
        ),
    ]
}

pub fn format_probability(p: f64) -> String {
    format!("{:.0}%", p * 100.0)
}

/// Render a backend timestamp (SQLite `CURRENT_TIMESTAMP`, UTC) for display.
///
/// RFC 3339 input is accepted too; anything else is shown verbatim.
pub fn format_created_at(raw: &str) -> String {
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return ts.format("%Y-%m-%d %H:%M UTC").to_string();
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return ts.naive_utc().format("%Y-%m-%d %H:%M UTC").to_string();
    }
    raw.to_string()
}
