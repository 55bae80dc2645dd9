//! The single "current result set" shared by every view.

use tokio::sync::watch;
use tracing::debug;

use crate::model::types::ResultSet;

/// In-memory store for the current analysis result set.
///
/// Replacement swaps the whole snapshot; subscribers see either the old or
/// the new set, never a mix. The change is published before `replace`
/// returns.
#[derive(Debug)]
pub struct ResultCache {
    tx: watch::Sender<ResultSet>,
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultCache {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ResultSet::empty());
        Self { tx }
    }

    /// Current snapshot; empty when nothing has been loaded.
    pub fn current(&self) -> ResultSet {
        self.tx.borrow().clone()
    }

    pub fn replace(&self, set: ResultSet) {
        debug!(
            records = set.len(),
            high = set.counts().high,
            medium = set.counts().medium,
            low = set.counts().low,
            "replacing current result set"
        );
        self.tx.send_replace(set);
    }

    pub fn clear(&self) {
        self.replace(ResultSet::empty());
    }

    pub fn subscribe(&self) -> watch::Receiver<ResultSet> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::{ResultRecord, RiskLevel};

    fn record(id: &str, level: RiskLevel) -> ResultRecord {
        ResultRecord {
            id: id.into(),
            risk_level: level,
            risk_score: 40,
            delay_probability: 0.4,
            reasons: vec![],
            recommended_actions: vec![],
            counterfactual: None,
        }
    }

    #[test]
    fn starts_empty() {
        let cache = ResultCache::new();
        assert!(cache.current().is_empty());
    }

    #[test]
    fn replace_is_visible_to_subscribers_before_return() {
        let cache = ResultCache::new();
        let mut rx = cache.subscribe();
        cache.replace(ResultSet::new(vec![record("a", RiskLevel::High)]));
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);
    }

    #[test]
    fn clear_empties_the_set() {
        let cache = ResultCache::new();
        cache.replace(ResultSet::new(vec![record("a", RiskLevel::Low)]));
        cache.clear();
        assert!(cache.current().is_empty());
        assert_eq!(cache.current().counts().total(), 0);
    }

    #[test]
    fn replace_works_without_subscribers() {
        let cache = ResultCache::new();
        cache.replace(ResultSet::new(vec![record("a", RiskLevel::Medium)]));
        assert_eq!(cache.current().len(), 1);
    }
}
