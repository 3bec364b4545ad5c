//! Session manager configuration.
//!
//! Holds the credential endpoint, the routes announced on login and logout,
//! and which durable store backs the persisted session.
//!
//! Configuration is stored at `~/.config/sessionguard/config.json`.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::store::StoreError;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "sessionguard";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`
pub const ENV_API_URL: &str = "SESSIONGUARD_API_URL";

/// Environment variable overriding `store`
pub const ENV_STORE: &str = "SESSIONGUARD_STORE";

/// Where the persisted session lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Keyring,
    Memory,
}

impl StoreBackend {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Some(Self::File),
            "keyring" => Some(Self::Keyring),
            "memory" => Some(Self::Memory),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub api_base_url: String,
    pub login_path: String,
    /// Route announced to the navigator after a successful login
    pub landing_route: String,
    /// Route announced to the navigator after logout
    pub login_route: String,
    pub request_timeout_secs: u64,
    pub store: StoreBackend,
    pub log_dir: Option<PathBuf>,
    pub last_username: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:8080".to_string(),
            login_path: "/api/login".to_string(),
            landing_route: "statistics".to_string(),
            login_route: "/login".to_string(),
            request_timeout_secs: 30,
            store: StoreBackend::File,
            log_dir: None,
            last_username: None,
        }
    }
}

impl SessionConfig {
    pub fn load() -> Result<Self, StoreError> {
        let path = Self::config_path()?;
        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<(), StoreError> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply `SESSIONGUARD_*` environment overrides on top of the file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_API_URL).filter(|u| !u.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(raw) = lookup(ENV_STORE) {
            match StoreBackend::parse(&raw) {
                Some(store) => self.store = store,
                None => tracing::warn!(value = %raw, "Ignoring unknown store backend"),
            }
        }
    }

    /// Full URL of the credential exchange endpoint.
    pub fn login_url(&self) -> String {
        format!(
            "{}{}",
            self.api_base_url.trim_end_matches('/'),
            self.login_path
        )
    }

    fn config_path() -> Result<PathBuf, StoreError> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| StoreError::Unavailable("Could not find config directory".into()))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf, StoreError> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| StoreError::Unavailable("Could not find cache directory".into()))?;
        Ok(cache_dir.join(APP_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: SessionConfig =
            serde_json::from_str(r#"{"api_base_url": "https://auth.example.com/", "store": "keyring"}"#)
                .unwrap();
        assert_eq!(config.store, StoreBackend::Keyring);
        assert_eq!(config.landing_route, "statistics");
        assert_eq!(config.login_route, "/login");
        assert_eq!(config.login_url(), "https://auth.example.com/api/login");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SessionConfig::default();
        config.apply_overrides(|name| match name {
            ENV_API_URL => Some("http://10.0.0.2:9000".to_string()),
            ENV_STORE => Some("Memory".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "http://10.0.0.2:9000");
        assert_eq!(config.store, StoreBackend::Memory);

        // Unknown backends leave the current value alone
        config.apply_overrides(|name| (name == ENV_STORE).then(|| "floppy".to_string()));
        assert_eq!(config.store, StoreBackend::Memory);
    }
}
