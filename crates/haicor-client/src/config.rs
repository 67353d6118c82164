//! Client configuration from the environment.

use crate::job::JobKind;
use crate::poll::{PollPolicy, RetryPolicy};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3001";

/// Backend location and polling limits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_url: String,
    /// Overrides the per-kind poll interval when set.
    pub poll_interval: Option<Duration>,
    pub max_wait: Option<Duration>,
    pub max_polls: Option<u32>,
    pub retry: RetryPolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: None,
            max_wait: None,
            max_polls: None,
            retry: RetryPolicy::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Read `HAICOR_API_URL`, `HAICOR_POLL_INTERVAL_MS`, `HAICOR_POLL_MAX_WAIT_SECS`,
    /// `HAICOR_POLL_MAX_POLLS`, `HAICOR_RETRY_MAX` and `HAICOR_RETRY_BASE_MS`.
    /// Unset or unparsable values keep their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let num = |key: &str| get(key).and_then(|v| v.trim().parse::<u64>().ok());
        let mut config = Self::default();
        if let Some(url) = get("HAICOR_API_URL") {
            config.api_url = url;
        }
        config.poll_interval = num("HAICOR_POLL_INTERVAL_MS").map(Duration::from_millis);
        config.max_wait = num("HAICOR_POLL_MAX_WAIT_SECS").map(Duration::from_secs);
        config.max_polls = num("HAICOR_POLL_MAX_POLLS").and_then(|n| u32::try_from(n).ok());
        if let Some(n) = num("HAICOR_RETRY_MAX").and_then(|n| u32::try_from(n).ok()) {
            config.retry.max_retries = n;
        }
        if let Some(ms) = num("HAICOR_RETRY_BASE_MS") {
            config.retry.base_delay = Duration::from_millis(ms);
        }
        config
    }

    /// Poll policy for job kind `K` under this configuration.
    pub fn poll_policy<K: JobKind>(&self) -> PollPolicy {
        PollPolicy {
            interval: self.poll_interval.unwrap_or(K::DEFAULT_INTERVAL),
            max_wait: self.max_wait,
            max_polls: self.max_polls,
            retry: self.retry.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{GraphJob, StepJob};
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let c = ClientConfig::from_lookup(lookup(&[]));
        assert_eq!(c, ClientConfig::default());
        assert_eq!(c.poll_policy::<StepJob>().interval, Duration::from_millis(500));
        assert_eq!(c.poll_policy::<GraphJob>().interval, Duration::from_millis(200));
        assert_eq!(c.poll_policy::<GraphJob>().max_polls, None);
    }

    #[test]
    fn env_overrides() {
        let c = ClientConfig::from_lookup(lookup(&[
            ("HAICOR_API_URL", "http://reasoner:9000"),
            ("HAICOR_POLL_INTERVAL_MS", "50"),
            ("HAICOR_POLL_MAX_WAIT_SECS", "30"),
            ("HAICOR_POLL_MAX_POLLS", "100"),
            ("HAICOR_RETRY_MAX", "2"),
            ("HAICOR_RETRY_BASE_MS", "10"),
        ]));
        assert_eq!(c.api_url, "http://reasoner:9000");
        let p = c.poll_policy::<StepJob>();
        assert_eq!(p.interval, Duration::from_millis(50));
        assert_eq!(p.max_wait, Some(Duration::from_secs(30)));
        assert_eq!(p.max_polls, Some(100));
        assert_eq!(p.retry.max_retries, 2);
        assert_eq!(p.retry.base_delay, Duration::from_millis(10));
    }

    #[test]
    fn unparsable_values_are_ignored() {
        let c = ClientConfig::from_lookup(lookup(&[("HAICOR_POLL_MAX_POLLS", "lots")]));
        assert_eq!(c.max_polls, None);
    }
}
