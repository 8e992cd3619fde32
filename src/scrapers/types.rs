use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Page-load condition to wait for before reading content
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaitUntil {
    /// Navigation finished
    Load,
    /// Navigation finished and a `<body>` element exists. Scripts may still
    /// be fetching data.
    #[default]
    BodyReady,
}

/// Options for a single rate-limited navigation
#[derive(Debug, Clone, Copy)]
pub struct NavigateOptions {
    pub wait_until: WaitUntil,
    /// Upper bound on the navigation itself
    pub timeout: Duration,
    /// Unconditional pause after navigation, before the next request may start
    pub delay_after: Duration,
}

impl Default for NavigateOptions {
    fn default() -> Self {
        Self {
            wait_until: WaitUntil::BodyReady,
            timeout: Duration::from_secs(30),
            delay_after: Duration::from_secs(1),
        }
    }
}

/// Fixed-delay retry policy: `retries` extra attempts, `delay` between each
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub retries: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn attempts(&self) -> u32 {
        self.retries + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            retries: 2,
            delay: Duration::from_secs(2),
        }
    }
}

/// How a source reacts when fetching or extracting fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Re-attempt under the crawl's retry policy; exhaustion is reported as a source failure
    Retry,
    /// Log and contribute nothing
    Tolerant,
}

/// Fetch settings shared by every source in a cycle
#[derive(Debug, Clone, Copy, Default)]
pub struct FetchSettings {
    pub navigate: NavigateOptions,
    pub retry: RetryPolicy,
}
