//! Detail view model for one selected result.
//!
//! Reasons and recommended actions are regrouped by a fixed keyword
//! classifier so the most severe items come first. Grouping is stable: items
//! in the same bucket keep the order the backend sent them in.

use crate::model::types::{ResultRecord, Scenario};

/// Reductions at or above this probability delta are flagged significant.
pub const SIGNIFICANT_REDUCTION: f64 = 0.05;

const CRITICAL_KEYWORDS: &[&str] = &[
    "block",
    "insufficient",
    "no resource",
    "critical",
    "overdue",
    "missed deadline",
];

const WARNING_KEYWORDS: &[&str] = &[
    "dependenc",
    "rework",
    "stagnation",
    "delay",
    "gap",
    "slow",
];

const HIGH_PRIORITY_KEYWORDS: &[&str] = &[
    "allocate",
    "root cause",
    "escalate",
    "immediately",
    "urgent",
];

const MEDIUM_PRIORITY_KEYWORDS: &[&str] = &[
    "review",
    "reduce",
    "investigate",
    "increase monitoring",
    "enforce",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ReasonSeverity {
    Critical,
    Warning,
    Info,
}

impl ReasonSeverity {
    pub fn label(self) -> &'static str {
        match self {
            ReasonSeverity::Critical => "critical",
            ReasonSeverity::Warning => "warning",
            ReasonSeverity::Info => "info",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum ActionPriority {
    High,
    Medium,
    Low,
}

impl ActionPriority {
    pub fn label(self) -> &'static str {
        match self {
            ActionPriority::High => "HIGH",
            ActionPriority::Medium => "MEDIUM",
            ActionPriority::Low => "LOW",
        }
    }

    fn from_tag(tag: &str) -> Option<Self> {
        match tag.trim().to_ascii_uppercase().as_str() {
            "HIGH" => Some(ActionPriority::High),
            "MEDIUM" => Some(ActionPriority::Medium),
            "LOW" => Some(ActionPriority::Low),
            _ => None,
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    let lower = text.to_lowercase();
    keywords.iter().any(|k| lower.contains(k))
}

pub fn classify_reason(text: &str) -> ReasonSeverity {
    if contains_any(text, CRITICAL_KEYWORDS) {
        ReasonSeverity::Critical
    } else if contains_any(text, WARNING_KEYWORDS) {
        ReasonSeverity::Warning
    } else {
        ReasonSeverity::Info
    }
}

/// Classify an action, returning its priority and display text.
///
/// A leading `[HIGH]`/`[MEDIUM]`/`[LOW]` tag wins over the keywords and is
/// stripped from the text.
pub fn classify_action(text: &str) -> (ActionPriority, &str) {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix('[')
        && let Some((tag, body)) = rest.split_once(']')
        && let Some(priority) = ActionPriority::from_tag(tag)
    {
        return (priority, body.trim_start());
    }

    let priority = if contains_any(text, HIGH_PRIORITY_KEYWORDS) {
        ActionPriority::High
    } else if contains_any(text, MEDIUM_PRIORITY_KEYWORDS) {
        ActionPriority::Medium
    } else {
        ActionPriority::Low
    };
    (priority, text)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedReason {
    pub text: String,
    pub severity: ReasonSeverity,
    pub primary_driver: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedAction {
    pub text: String,
    pub priority: ActionPriority,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CounterfactualSummary {
    pub scenario: Option<Scenario>,
    pub baseline_probability: f64,
    pub new_delay_probability: f64,
    pub reduction_percent: f64,
    pub significant: bool,
}

pub struct DetailInspector {
    record: ResultRecord,
    reasons: Vec<ClassifiedReason>,
    actions: Vec<ClassifiedAction>,
    reasons_collapsed: bool,
    actions_collapsed: bool,
}

impl DetailInspector {
    pub fn new(record: ResultRecord) -> Self {
        let mut reasons: Vec<ClassifiedReason> = record
            .reasons
            .iter()
            .enumerate()
            .map(|(idx, text)| {
                let severity = classify_reason(text);
                ClassifiedReason {
                    text: text.clone(),
                    severity,
                    primary_driver: idx == 0 && severity == ReasonSeverity::Critical,
                }
            })
            .collect();
        reasons.sort_by_key(|r| r.severity);

        let mut actions: Vec<ClassifiedAction> = record
            .recommended_actions
            .iter()
            .map(|text| {
                let (priority, display) = classify_action(text);
                ClassifiedAction {
                    text: display.to_string(),
                    priority,
                }
            })
            .collect();
        actions.sort_by_key(|a| a.priority);

        Self {
            record,
            reasons,
            actions,
            reasons_collapsed: false,
            actions_collapsed: false,
        }
    }

    pub fn record(&self) -> &ResultRecord {
        &self.record
    }

    /// Reasons, critical first.
    pub fn reasons(&self) -> &[ClassifiedReason] {
        &self.reasons
    }

    /// Actions, high priority first.
    pub fn actions(&self) -> &[ClassifiedAction] {
        &self.actions
    }

    pub fn primary_driver(&self) -> Option<&ClassifiedReason> {
        self.reasons.iter().find(|r| r.primary_driver)
    }

    pub fn reasons_expanded(&self) -> bool {
        !self.reasons_collapsed
    }

    pub fn actions_expanded(&self) -> bool {
        !self.actions_collapsed
    }

    pub fn toggle_reasons(&mut self) {
        self.reasons_collapsed = !self.reasons_collapsed;
    }

    pub fn toggle_actions(&mut self) {
        self.actions_collapsed = !self.actions_collapsed;
    }

    pub fn counterfactual(&self) -> Option<CounterfactualSummary> {
        self.record.counterfactual.as_ref().map(|cf| CounterfactualSummary {
            scenario: cf.scenario,
            baseline_probability: self.record.delay_probability,
            new_delay_probability: cf.new_delay_probability,
            reduction_percent: cf.probability_reduction * 100.0,
            significant: cf.probability_reduction >= SIGNIFICANT_REDUCTION,
        })
    }
}
