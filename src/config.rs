use anyhow::{bail, Context, Result};
use std::time::Duration;

use crate::tasks::DEFAULT_POLL_INTERVAL;

pub const DEFAULT_API_URL: &str = "http://localhost:5000";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the documentation-search backend.
    pub api_url: String,
    /// Address the UI-facing server listens on.
    pub bind_addr: String,
    pub poll_interval: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

impl Config {
    /// Reads `CDP_API_URL`, `CDP_BIND_ADDR` and `CDP_HEALTH_POLL_SECS`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let api_url = lookup("CDP_API_URL")
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        if !(api_url.starts_with("http://") || api_url.starts_with("https://")) {
            bail!("CDP_API_URL must be an http(s) URL, got '{}'", api_url);
        }

        let bind_addr = lookup("CDP_BIND_ADDR").unwrap_or(defaults.bind_addr);

        let poll_interval = match lookup("CDP_HEALTH_POLL_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("CDP_HEALTH_POLL_SECS is not a number: '{}'", raw))?;
                if secs == 0 {
                    bail!("CDP_HEALTH_POLL_SECS must be > 0");
                }
                Duration::from_secs(secs)
            }
            None => defaults.poll_interval,
        };

        Ok(Self {
            api_url,
            bind_addr,
            poll_interval,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_in(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let config = Config::from_lookup(lookup_in(&[])).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn reads_overrides() {
        let config = Config::from_lookup(lookup_in(&[
            ("CDP_API_URL", "https://search.internal:8443/"),
            ("CDP_BIND_ADDR", "127.0.0.1:8080"),
            ("CDP_HEALTH_POLL_SECS", "5"),
        ]))
        .unwrap();
        assert_eq!(config.api_url, "https://search.internal:8443");
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.poll_interval, Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_values() {
        assert!(Config::from_lookup(lookup_in(&[("CDP_HEALTH_POLL_SECS", "0")])).is_err());
        assert!(Config::from_lookup(lookup_in(&[("CDP_HEALTH_POLL_SECS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup_in(&[("CDP_API_URL", "localhost:5000")])).is_err());
    }
}
