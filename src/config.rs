use crate::scrapers::types::{FetchSettings, NavigateOptions, RetryPolicy};
use anyhow::{bail, Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// How pages are loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    Chrome,
    Http,
}

impl FromStr for LoaderKind {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_lowercase().as_str() {
            "chrome" => Ok(LoaderKind::Chrome),
            "http" => Ok(LoaderKind::Http),
            other => bail!("unknown loader {other:?}, expected \"chrome\" or \"http\""),
        }
    }
}

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// JSON store root; `None` runs in local mode with an in-memory store
    pub store_dir: Option<PathBuf>,
    /// Push gateway; `None` logs notifications instead
    pub notify_url: Option<String>,
    pub loader: LoaderKind,
    pub interval: Duration,
    pub fetch: FetchSettings,
    pub run_once: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_dir: None,
            notify_url: None,
            loader: LoaderKind::Chrome,
            interval: Duration::from_secs(30 * 60),
            fetch: FetchSettings::default(),
            run_once: false,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from any key lookup; unset keys take defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Config::default();
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let millis = |key: &str, default: Duration| -> Result<Duration> {
            match get(key) {
                Some(value) => Ok(Duration::from_millis(
                    value.trim().parse().with_context(|| format!("{key} must be a number of milliseconds"))?,
                )),
                None => Ok(default),
            }
        };

        let interval = match get("SCOUT_INTERVAL_MINS") {
            Some(value) => {
                let mins: u64 = value
                    .trim()
                    .parse()
                    .context("SCOUT_INTERVAL_MINS must be a number of minutes")?;
                if mins == 0 {
                    bail!("SCOUT_INTERVAL_MINS must be at least 1");
                }
                Duration::from_secs(mins * 60)
            }
            None => defaults.interval,
        };

        let retries = match get("SCOUT_RETRIES") {
            Some(value) => value.trim().parse().context("SCOUT_RETRIES must be a whole number")?,
            None => defaults.fetch.retry.retries,
        };

        let loader = match get("SCOUT_LOADER") {
            Some(value) => value.parse().context("SCOUT_LOADER is invalid")?,
            None => defaults.loader,
        };

        let run_once = match get("SCOUT_RUN_ONCE") {
            Some(value) => parse_flag(&value).context("SCOUT_RUN_ONCE must be true or false")?,
            None => defaults.run_once,
        };

        let nav = defaults.fetch.navigate;
        Ok(Self {
            store_dir: get("SCOUT_STORE_DIR").map(PathBuf::from),
            notify_url: get("SCOUT_NOTIFY_URL"),
            loader,
            interval,
            fetch: FetchSettings {
                navigate: NavigateOptions {
                    wait_until: nav.wait_until,
                    timeout: millis("SCOUT_NAV_TIMEOUT_MS", nav.timeout)?,
                    delay_after: millis("SCOUT_REQUEST_DELAY_MS", nav.delay_after)?,
                },
                retry: RetryPolicy {
                    retries,
                    delay: millis("SCOUT_RETRY_DELAY_MS", defaults.fetch.retry.delay)?,
                },
            },
            run_once,
        })
    }
}

fn parse_flag(value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => bail!("not a flag: {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn unset_variables_take_defaults() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.interval, Duration::from_secs(1800));
        assert_eq!(cfg.fetch.retry.retries, 2);
        assert_eq!(cfg.fetch.retry.delay, Duration::from_millis(2000));
        assert_eq!(cfg.fetch.navigate.timeout, Duration::from_millis(30_000));
        assert_eq!(cfg.fetch.navigate.delay_after, Duration::from_millis(1000));
        assert_eq!(cfg.loader, LoaderKind::Chrome);
        assert!(cfg.store_dir.is_none());
        assert!(!cfg.run_once);
    }

    #[test]
    fn variables_override_defaults() {
        let cfg = config(&[
            ("SCOUT_STORE_DIR", "/var/lib/scout"),
            ("SCOUT_LOADER", "HTTP"),
            ("SCOUT_INTERVAL_MINS", "10"),
            ("SCOUT_RETRIES", "0"),
            ("SCOUT_REQUEST_DELAY_MS", "250"),
            ("SCOUT_RUN_ONCE", "yes"),
        ])
        .unwrap();

        assert_eq!(cfg.store_dir, Some(PathBuf::from("/var/lib/scout")));
        assert_eq!(cfg.loader, LoaderKind::Http);
        assert_eq!(cfg.interval, Duration::from_secs(600));
        assert_eq!(cfg.fetch.retry.retries, 0);
        assert_eq!(cfg.fetch.navigate.delay_after, Duration::from_millis(250));
        assert!(cfg.run_once);
    }

    #[test]
    fn invalid_values_are_reported() {
        assert!(config(&[("SCOUT_INTERVAL_MINS", "0")]).is_err());
        assert!(config(&[("SCOUT_RETRIES", "many")]).is_err());
        assert!(config(&[("SCOUT_LOADER", "firefox")]).is_err());
    }
}
