use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::animate::RevealSchedule;

pub const DEFAULT_CONFIG_PATH: &str = "config/chat.json";
pub const DEFAULT_ENDPOINT: &str = "https://zaki-worker.a7mdz3ar.workers.dev";
pub const ENDPOINT_ENV: &str = "ZAKI_ENDPOINT";
pub const DEFAULT_LOGO_URL: &str = "/lovable-uploads/f7072446-2cc0-4c29-9213-6109109a16e3.png";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window_secs: 60,
        }
    }
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub endpoint: String,
    /// Messages sent back as history with every request.
    pub history_limit: usize,
    pub rate_limit: RateLimitConfig,
    pub persist_debounce_ms: u64,
    pub database_path: String,
    pub reveal: RevealSchedule,
    pub cache_name: String,
    /// Base URL relative asset paths are fetched from.
    pub asset_base_url: String,
    pub precache_urls: Vec<String>,
    /// Welcome screen logo, served through the offline cache.
    pub logo_url: String,
    /// Where saved code blocks go; the user's download folder when unset.
    pub download_dir: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            history_limit: 10,
            rate_limit: RateLimitConfig::default(),
            persist_debounce_ms: 500,
            database_path: "data/chat.db".to_string(),
            reveal: RevealSchedule::default(),
            cache_name: "zaki-one-v1".to_string(),
            asset_base_url: "https://zaki.one".to_string(),
            precache_urls: vec![
                "/".to_string(),
                "/manifest.json".to_string(),
                DEFAULT_LOGO_URL.to_string(),
            ],
            logo_url: DEFAULT_LOGO_URL.to_string(),
            download_dir: None,
        }
    }
}

impl AppConfig {
    pub fn persist_debounce(&self) -> Duration {
        Duration::from_millis(self.persist_debounce_ms)
    }

    /// Apply environment and command-line overrides, command line last.
    pub fn with_overrides(mut self, env_endpoint: Option<String>, cli_endpoint: Option<String>) -> Self {
        if let Some(endpoint) = env_endpoint.filter(|value| !value.trim().is_empty()) {
            self.endpoint = endpoint;
        }
        if let Some(endpoint) = cli_endpoint {
            self.endpoint = endpoint;
        }
        self
    }
}

pub fn load_config(path: &str) -> AppConfig {
    let path = Path::new(path);
    match fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str::<AppConfig>(&content) {
            Ok(config) => config,
            Err(err) => {
                log::warn!("Failed to parse config file {}: {err}", path.display());
                AppConfig::default()
            }
        },
        Err(err) => {
            log::info!(
                "Config file {} not found ({err}); using defaults",
                path.display()
            );
            AppConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_uses_defaults() {
        let config = load_config("does/not/exist.json");
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.history_limit, 10);
        assert_eq!(config.rate_limit.window(), Duration::from_secs(60));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(
            &path,
            r#"{ "endpoint": "http://localhost:8787", "rate_limit": { "max_requests": 3 }, "reveal": { "base_ms": 5 } }"#,
        )
        .unwrap();

        let config = load_config(path.to_str().unwrap());
        assert_eq!(config.endpoint, "http://localhost:8787");
        assert_eq!(config.rate_limit.max_requests, 3);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.reveal.base_ms, 5);
        assert_eq!(config.reveal.opening_ms, 40);
        assert_eq!(config.persist_debounce(), Duration::from_millis(500));
        assert!(config.precache_urls.contains(&config.logo_url));
        assert_eq!(config.download_dir, None);
    }

    #[test]
    fn invalid_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config(path.to_str().unwrap()), AppConfig::default());
    }

    #[test]
    fn command_line_beats_environment() {
        let config = AppConfig::default().with_overrides(
            Some("http://env".to_string()),
            Some("http://cli".to_string()),
        );
        assert_eq!(config.endpoint, "http://cli");

        let config = AppConfig::default().with_overrides(Some("http://env".to_string()), None);
        assert_eq!(config.endpoint, "http://env");

        let config = AppConfig::default().with_overrides(Some("  ".to_string()), None);
        assert_eq!(config.endpoint, DEFAULT_ENDPOINT);
    }
}
