use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::settings::SettingsStore;

pub const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_MAX_CONCURRENT: usize = 4;
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Process-wide configuration, read once at startup.
#[derive(Clone)]
pub struct AppConfig {
    pub port: u16,
    /// Operator credential used for the shared default client.
    pub api_key: Option<String>,
    pub api_base: String,
    pub settings_path: PathBuf,
    pub request_timeout: Duration,
    pub max_concurrent: usize,
    pub max_tokens: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            port: DEFAULT_PORT,
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            settings_path: SettingsStore::default_path(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_deref().map(mask_key))
            .field("api_base", &self.api_base)
            .field("settings_path", &self.settings_path)
            .field("request_timeout", &self.request_timeout)
            .field("max_concurrent", &self.max_concurrent)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = parse_var("PORT").unwrap_or(defaults.port);
        let api_key = env::var("OPENROUTER_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty());
        let api_base = env::var("STORYGEN_API_BASE").unwrap_or(defaults.api_base);
        let settings_path = env::var("STORYGEN_SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.settings_path);
        let request_timeout = parse_var("STORYGEN_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);
        let max_concurrent = parse_var("STORYGEN_MAX_CONCURRENT")
            .filter(|n: &usize| *n > 0)
            .unwrap_or(defaults.max_concurrent);
        let max_tokens = parse_var("STORYGEN_MAX_TOKENS").unwrap_or(defaults.max_tokens);

        AppConfig {
            port,
            api_key,
            api_base,
            settings_path,
            request_timeout,
            max_concurrent,
            max_tokens,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into();
        self
    }

    pub fn with_settings_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings_path = path.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|value| value.trim().parse().ok())
}

/// Shortens a credential to something safe to print, e.g. `sk-or-...a1b2`.
pub fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 10 {
        return "***".to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.api_base, "https://openrouter.ai/api/v1");
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.max_concurrent, 4);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_builder() {
        let config = AppConfig::new()
            .with_port(9000)
            .with_api_key("sk-operator-key-123456")
            .with_max_concurrent(0)
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.port, 9000);
        assert_eq!(config.max_concurrent, 1);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert!(!format!("{:?}", config).contains("sk-operator-key-123456"));
    }

    #[test]
    fn test_mask_key() {
        assert_eq!(mask_key("sk-or-v1-abcdefgh1234"), "sk-or-...1234");
        assert_eq!(mask_key("short"), "***");
    }
}
