use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::warn;

pub const DEFAULT_USER_AGENT: &str = concat!("covid-dashboards/", env!("CARGO_PKG_VERSION"));

/// HTTP and pagination settings shared by the fetch helpers
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// User agent sent with every request
    pub user_agent: String,
    /// Upper bound on ArcGIS pages fetched for a single sheet
    pub max_pages: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_pages: 1000,
        }
    }
}

impl ClientConfig {
    /// Defaults overridden by `COVID_HTTP_TIMEOUT_SECS`, `COVID_USER_AGENT`
    /// and `COVID_ARCGIS_MAX_PAGES` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("COVID_HTTP_TIMEOUT_SECS") {
            match raw.trim().parse() {
                Ok(secs) => config.timeout_secs = secs,
                Err(_) => warn!("Ignoring invalid COVID_HTTP_TIMEOUT_SECS: {}", raw),
            }
        }
        if let Some(agent) = lookup("COVID_USER_AGENT") {
            if !agent.trim().is_empty() {
                config.user_agent = agent;
            }
        }
        if let Some(raw) = lookup("COVID_ARCGIS_MAX_PAGES") {
            match raw.trim().parse::<usize>() {
                Ok(pages) if pages > 0 => config.max_pages = pages,
                _ => warn!("Ignoring invalid COVID_ARCGIS_MAX_PAGES: {}", raw),
            }
        }

        config
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
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
    fn defaults_when_nothing_set() {
        let config = ClientConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, ClientConfig::default());
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn env_overrides_apply() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("COVID_HTTP_TIMEOUT_SECS", "5"),
            ("COVID_USER_AGENT", "tester"),
            ("COVID_ARCGIS_MAX_PAGES", "12"),
        ]));
        assert_eq!(config.timeout_secs, 5);
        assert_eq!(config.user_agent, "tester");
        assert_eq!(config.max_pages, 12);
    }

    #[test]
    fn invalid_values_are_ignored() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("COVID_HTTP_TIMEOUT_SECS", "soon"),
            ("COVID_ARCGIS_MAX_PAGES", "0"),
        ]));
        assert_eq!(config.timeout_secs, 30);
        assert_eq!(config.max_pages, 1000);
    }
}
