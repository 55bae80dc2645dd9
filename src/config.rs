//! Console configuration.
//!
//! Defaults are overridden by environment variables (a `.env` file is honoured
//! through `dotenvy`), which are in turn overridden by command-line flags.

use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:8000";

/// Runtime settings for the console.
#[derive(Debug, Clone, PartialEq)]
pub struct ConsoleConfig {
    /// Base URL of the risk API.
    pub api_url: String,
    /// Sent as `x-api-key` when set.
    pub api_key: Option<String>,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Interval between health polls.
    pub health_interval: Duration,
    /// Attempts per health poll before reporting disconnected.
    pub health_attempts: u32,
    /// Number of history entries to request.
    pub history_limit: usize,
    /// Duration of numeric transitions in the views.
    pub tween_duration: Duration,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(30),
            health_interval: Duration::from_secs(30),
            health_attempts: 2,
            history_limit: 20,
            tween_duration: Duration::from_millis(800),
        }
    }
}

impl ConsoleConfig {
    /// Load config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build config from an arbitrary key lookup; unparsable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();

        if let Some(url) = lookup("RISK_CONSOLE_API_URL")
            && !url.trim().is_empty()
        {
            cfg.api_url = url.trim().trim_end_matches('/').to_string();
        }

        if let Some(key) = lookup("RISK_CONSOLE_API_KEY")
            && !key.is_empty()
        {
            cfg.api_key = Some(key);
        }

        if let Some(ms) = lookup("RISK_CONSOLE_TIMEOUT_MS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.request_timeout = Duration::from_millis(ms);
        }

        if let Some(secs) = lookup("RISK_CONSOLE_HEALTH_INTERVAL_SECS")
            .and_then(|v| v.parse::<u64>().ok())
            .filter(|s| *s > 0)
        {
            cfg.health_interval = Duration::from_secs(secs);
        }

        if let Some(attempts) = lookup("RISK_CONSOLE_HEALTH_ATTEMPTS")
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|a| *a > 0)
        {
            cfg.health_attempts = attempts;
        }

        if let Some(limit) = lookup("RISK_CONSOLE_HISTORY_LIMIT").and_then(|v| v.parse().ok()) {
            cfg.history_limit = limit;
        }

        if let Some(ms) = lookup("RISK_CONSOLE_TWEEN_MS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.tween_duration = Duration::from_millis(ms);
        }

        cfg
    }

    /// Health snapshots older than this are reported stale.
    pub fn health_max_age(&self) -> Duration {
        self.health_interval * 2
    }

    pub fn with_api_url(mut self, url: Option<String>) -> Self {
        if let Some(url) = url {
            self.api_url = url.trim_end_matches('/').to_string();
        }
        self
    }

    pub fn with_api_key(mut self, key: Option<String>) -> Self {
        if key.is_some() {
            self.api_key = key;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_cadence() {
        let cfg = ConsoleConfig::from_lookup(|_| None);
        assert_eq!(cfg.health_interval, Duration::from_secs(30));
        assert_eq!(cfg.health_attempts, 2);
        assert_eq!(cfg.api_url, DEFAULT_API_URL);
        assert_eq!(cfg.health_max_age(), Duration::from_secs(60));
    }

    #[test]
    fn env_values_override_defaults() {
        let cfg = ConsoleConfig::from_lookup(lookup_from(&[
            ("RISK_CONSOLE_API_URL", "http://risk.internal:9000/"),
            ("RISK_CONSOLE_API_KEY", "secret"),
            ("RISK_CONSOLE_TIMEOUT_MS", "1500"),
            ("RISK_CONSOLE_HEALTH_ATTEMPTS", "4"),
        ]));
        assert_eq!(cfg.api_url, "http://risk.internal:9000");
        assert_eq!(cfg.api_key.as_deref(), Some("secret"));
        assert_eq!(cfg.request_timeout, Duration::from_millis(1500));
        assert_eq!(cfg.health_attempts, 4);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let cfg = ConsoleConfig::from_lookup(lookup_from(&[
            ("RISK_CONSOLE_HEALTH_INTERVAL_SECS", "0"),
            ("RISK_CONSOLE_HEALTH_ATTEMPTS", "many"),
        ]));
        assert_eq!(cfg.health_interval, Duration::from_secs(30));
        assert_eq!(cfg.health_attempts, 2);
    }

    #[test]
    fn cli_flags_take_precedence() {
        let cfg = ConsoleConfig::default()
            .with_api_url(Some("http://other:1/".into()))
            .with_api_key(None);
        assert_eq!(cfg.api_url, "http://other:1");
        assert_eq!(cfg.api_key, None);
    }
}
