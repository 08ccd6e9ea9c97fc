//! Client configuration loaded from environment variables.
//!
//! Every setting has a default so the client can start with zero
//! configuration against a local development API.

use std::path::PathBuf;
use std::time::Duration;

use docshare_shared::constants::{
    DEFAULT_AGGREGATOR_GRACE, DEFAULT_FETCH_TIMEOUT, DEFAULT_SYNC_INTERVAL,
};

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Root of the document service API.
    /// Env: `DOCSHARE_API_URL`
    /// Default: `http://127.0.0.1:8080/api`
    pub api_url: String,

    /// Bearer token sent with every API request.
    /// Env: `DOCSHARE_API_TOKEN`
    /// Default: none (anonymous).
    pub api_token: Option<String>,

    /// SQLite file holding the catalog cache and settings.
    /// Env: `DOCSHARE_DB_PATH`
    /// Default: `None`, meaning the platform data directory.
    pub db_path: Option<PathBuf>,

    /// Upper bound on one catalog fetch.
    /// Env: `DOCSHARE_FETCH_TIMEOUT_SECS`
    pub fetch_timeout: Duration,

    /// How long derived screen state outlives its last subscriber.
    /// Env: `DOCSHARE_AGGREGATOR_GRACE_MS`
    pub aggregator_grace: Duration,

    /// Staleness check interval of the headless agent.
    /// Env: `DOCSHARE_SYNC_INTERVAL_SECS`
    pub sync_interval: Duration,

    /// Signed-in user, as handed over by the authentication layer.
    /// Env: `DOCSHARE_ACTOR_ID`, `DOCSHARE_ACTOR_NAME`
    pub actor_id: Option<String>,
    pub actor_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: "http://127.0.0.1:8080/api".to_string(),
            api_token: None,
            db_path: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            aggregator_grace: DEFAULT_AGGREGATOR_GRACE,
            sync_interval: DEFAULT_SYNC_INTERVAL,
            actor_id: None,
            actor_name: String::new(),
        }
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(url) = lookup("DOCSHARE_API_URL") {
            config.api_url = url;
        }

        if let Some(token) = lookup("DOCSHARE_API_TOKEN") {
            if !token.is_empty() {
                config.api_token = Some(token);
            }
        }

        if let Some(path) = lookup("DOCSHARE_DB_PATH") {
            if !path.is_empty() {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Some(secs) = parse_u64(&lookup, "DOCSHARE_FETCH_TIMEOUT_SECS") {
            config.fetch_timeout = Duration::from_secs(secs);
        }

        if let Some(ms) = parse_u64(&lookup, "DOCSHARE_AGGREGATOR_GRACE_MS") {
            config.aggregator_grace = Duration::from_millis(ms);
        }

        if let Some(secs) = parse_u64(&lookup, "DOCSHARE_SYNC_INTERVAL_SECS") {
            config.sync_interval = Duration::from_secs(secs);
        }

        if let Some(id) = lookup("DOCSHARE_ACTOR_ID") {
            if !id.is_empty() {
                config.actor_id = Some(id);
            }
        }

        if let Some(name) = lookup("DOCSHARE_ACTOR_NAME") {
            config.actor_name = name;
        }

        // RUST_LOG is read by tracing-subscriber's EnvFilter directly.

        config
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Option<u64>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = lookup(key)?;
    match raw.trim().parse::<u64>() {
        Ok(0) => {
            tracing::warn!(key, "zero is not a valid duration, using default");
            None
        }
        Ok(n) => Some(n),
        Err(_) => {
            tracing::warn!(key, value = %raw, "invalid number, using default");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> ClientConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_default_config() {
        let config = load(&[]);
        assert_eq!(config.api_url, "http://127.0.0.1:8080/api");
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.aggregator_grace, Duration::from_millis(5000));
        assert!(config.api_token.is_none());
        assert!(config.db_path.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("DOCSHARE_API_URL", "https://docs.example.com/v1"),
            ("DOCSHARE_API_TOKEN", "secret"),
            ("DOCSHARE_DB_PATH", "/tmp/docshare.db"),
            ("DOCSHARE_FETCH_TIMEOUT_SECS", "10"),
            ("DOCSHARE_SYNC_INTERVAL_SECS", "15"),
            ("DOCSHARE_ACTOR_ID", "u1"),
            ("DOCSHARE_ACTOR_NAME", "Lan"),
        ]);
        assert_eq!(config.api_url, "https://docs.example.com/v1");
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/docshare.db")));
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
        assert_eq!(config.sync_interval, Duration::from_secs(15));
        assert_eq!(config.actor_id.as_deref(), Some("u1"));
        assert_eq!(config.actor_name, "Lan");
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = load(&[
            ("DOCSHARE_FETCH_TIMEOUT_SECS", "soon"),
            ("DOCSHARE_AGGREGATOR_GRACE_MS", "0"),
            ("DOCSHARE_API_TOKEN", ""),
        ]);
        assert_eq!(config.fetch_timeout, DEFAULT_FETCH_TIMEOUT);
        assert_eq!(config.aggregator_grace, DEFAULT_AGGREGATOR_GRACE);
        assert!(config.api_token.is_none());
    }
}
