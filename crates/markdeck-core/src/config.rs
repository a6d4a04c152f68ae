use markdeck_api::RetryConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable that overrides `api.base_url`
pub const BASE_URL_ENV: &str = "MARKDECK_API_BASE_URL";

/// Main configuration structure
///
/// Loaded from the config file, then environment overrides are applied.
/// Priority: Env > File > Defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub search: SearchConfig,
    pub retry: RetrySettings,
    pub storage: StorageConfig,
}

impl Config {
    /// Load config from the default location, falling back to defaults
    pub fn load() -> crate::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load config from a specific file; a missing file means defaults
    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to parse config: {}", e)))
    }

    /// Save config to the default location
    pub fn save(&self) -> crate::Result<PathBuf> {
        let path = Self::config_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> crate::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| crate::Error::ConfigError(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from the environment; `lookup` is `std::env::var` outside tests
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api.base_url = base_url.trim().to_string();
        }
    }

    /// `<config_dir>/markdeck/config.toml`
    pub fn config_path() -> crate::Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find config directory".into()))?;
        Ok(config_dir.join("markdeck").join("config.toml"))
    }

    /// `<data_dir>/markdeck`
    pub fn data_dir() -> crate::Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| crate::Error::ConfigError("Could not find data directory".into()))?;
        Ok(data_dir.join("markdeck"))
    }

    /// Local storage database, honouring `storage.path`
    pub fn storage_path(&self) -> crate::Result<PathBuf> {
        match &self.storage.path {
            Some(path) => Ok(path.clone()),
            None => Ok(Self::data_dir()?.join("storage.db")),
        }
    }

    /// `<data_dir>/markdeck/tokens.json`
    pub fn token_store_path(&self) -> crate::Result<PathBuf> {
        Ok(Self::data_dir()?.join("tokens.json"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApiConfig {
    /// Backend base URL, e.g. `https://bookmarks.example.com/api`
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

fn default_base_url() -> String {
    "http://localhost:3000/api".to_string()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthConfig {
    /// Send favorites requests only with a session
    ///
    /// Turn off for backends that serve a shared, anonymous favorites list.
    #[serde(default = "default_true")]
    pub favorites_require_auth: bool,

    /// How long a token stored by `markdeck login` stays valid
    #[serde(default = "default_token_valid_days")]
    pub token_valid_days: u64,
}

fn default_true() -> bool {
    true
}

fn default_token_valid_days() -> u64 {
    30
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            favorites_require_auth: true,
            token_valid_days: default_token_valid_days(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchConfig {
    /// Delay between opening consecutive search tabs; 0 opens them all at once
    #[serde(default = "default_stagger_ms")]
    pub stagger_ms: u64,
}

fn default_stagger_ms() -> u64 {
    100 // enough to keep popup blockers quiet
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            stagger_ms: default_stagger_ms(),
        }
    }
}

/// Retry policy for read requests; mutations are never retried
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        let defaults = RetryConfig::default();
        Self {
            max_retries: defaults.max_retries,
            initial_delay_ms: defaults.initial_delay_ms,
            max_delay_ms: defaults.max_delay_ms,
            backoff_multiplier: defaults.backoff_multiplier,
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_retries: settings.max_retries,
            initial_delay_ms: settings.initial_delay_ms,
            max_delay_ms: settings.max_delay_ms,
            backoff_multiplier: settings.backoff_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StorageConfig {
    /// Override for the local storage database location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.api.base_url, "http://localhost:3000/api");
        assert!(config.auth.favorites_require_auth);
        assert_eq!(config.auth.token_valid_days, 30);
        assert_eq!(config.search.stagger_ms, 100);
        assert_eq!(config.retry.max_retries, 3);
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default();
        let toml = toml::to_string(&config).unwrap();
        assert!(toml.contains("base_url"));
        assert!(toml.contains("stagger_ms"));
        assert!(toml.contains("favorites_require_auth"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: Config = toml::from_str(
            r#"
            [api]
            base_url = "https://bookmarks.example.com/api"

            [search]
            stagger_ms = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.api.base_url, "https://bookmarks.example.com/api");
        assert_eq!(config.search.stagger_ms, 0);
        assert!(config.auth.favorites_require_auth);
        assert_eq!(config.retry, RetrySettings::default());
    }

    #[test]
    fn test_env_overrides_base_url() {
        let mut config = Config::default();
        config.apply_env(|key| match key {
            BASE_URL_ENV => Some("https://env.example/api".to_string()),
            _ => None,
        });
        assert_eq!(config.api.base_url, "https://env.example/api");

        // Blank values are ignored
        config.apply_env(|_| Some("   ".to_string()));
        assert_eq!(config.api.base_url, "https://env.example/api");
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("markdeck").join("config.toml");

        let mut config = Config::default();
        config.auth.favorites_require_auth = false;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let loaded = Config::load_from(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(loaded, Config::default());
    }

    #[test]
    fn test_broken_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[api\nbase_url = 1").unwrap();

        assert!(matches!(Config::load_from(&path), Err(crate::Error::ConfigError(_))));
    }

    #[test]
    fn test_retry_settings_convert() {
        let settings = RetrySettings {
            max_retries: 1,
            ..RetrySettings::default()
        };
        let retry: RetryConfig = (&settings).into();
        assert_eq!(retry.max_retries, 1);
    }
}
