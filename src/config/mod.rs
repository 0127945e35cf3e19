//! Configuration management for mcpli.
//!
//! Two files live in the config directory: `config.toml` with client
//! settings, and `servers.json` with the registered servers.

mod expand;
mod registry;

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use serde::{Deserialize, Serialize};

use crate::mcp::{ClientOptions, DEFAULT_MAX_REDIRECTS, DEFAULT_TIMEOUT};

pub use expand::{expand_env, expand_headers, expand_with};
pub use registry::{ServerEntry, ServerRegistry};

/// Environment variable overriding the config directory.
pub const CONFIG_DIR_ENV: &str = "MCPLI_CONFIG_DIR";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP client configuration.
    pub client: ClientConfig,
}

/// HTTP client configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Bound on each request, in seconds.
    /// Can also be set via `MCPLI_TIMEOUT_SECS`.
    pub timeout_secs: u64,

    /// Maximum redirect hops per request.
    /// Can also be set via `MCPLI_MAX_REDIRECTS`.
    pub max_redirects: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT.as_secs(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl ClientConfig {
    /// Options for [`crate::mcp::McpClient::new`].
    #[must_use]
    pub const fn options(&self) -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(self.timeout_secs),
            max_redirects: self.max_redirects,
        }
    }
}

impl Config {
    /// Load configuration from the default path, then apply environment
    /// overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file cannot be read or parsed,
    /// or an override is not a number.
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_overrides(|name| std::env::var(name).ok())?;
        Ok(config)
    }

    /// Load configuration from `path`. A missing file yields defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        toml::from_str(&contents).with_context(|| format!("failed to parse {}", path.display()))
    }

    /// Apply `MCPLI_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns an error if an override is set but not a valid number.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup("MCPLI_TIMEOUT_SECS") {
            self.client.timeout_secs = value
                .trim()
                .parse()
                .with_context(|| format!("invalid MCPLI_TIMEOUT_SECS: {value:?}"))?;
        }
        if let Some(value) = lookup("MCPLI_MAX_REDIRECTS") {
            self.client.max_redirects = value
                .trim()
                .parse()
                .with_context(|| format!("invalid MCPLI_MAX_REDIRECTS: {value:?}"))?;
        }
        Ok(())
    }

    /// Get the configuration file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Get the server registry path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn servers_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("servers.json"))
    }

    /// Get the config directory path (`~/.config/mcpli/`).
    ///
    /// # Errors
    ///
    /// Returns an error if the config directory cannot be determined.
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            return Ok(PathBuf::from(xdg_config_home).join("mcpli"));
        }

        if cfg!(target_os = "macos") {
            if let Ok(home) = std::env::var("HOME") {
                return Ok(PathBuf::from(home).join(".config").join("mcpli"));
            }
        }

        let base = directories::BaseDirs::new()
            .ok_or_else(|| anyhow::anyhow!("could not determine config directory"))?;

        Ok(base.config_dir().join("mcpli"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn defaults_match_client_defaults() {
        let config = Config::default();
        assert_eq!(config.client.options(), ClientOptions::default());
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config::load_from(&temp_dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[client]\ntimeout_secs = 5\n").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.client.timeout_secs, 5);
        assert_eq!(config.client.max_redirects, DEFAULT_MAX_REDIRECTS);
        assert_eq!(config.client.options().timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[client]\ntimeout_secs = \"soon\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn overrides_take_precedence() {
        let mut config = Config::default();
        config
            .apply_overrides(|name| match name {
                "MCPLI_TIMEOUT_SECS" => Some("7".to_string()),
                "MCPLI_MAX_REDIRECTS" => Some(" 2 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.client.timeout_secs, 7);
        assert_eq!(config.client.max_redirects, 2);
    }

    #[test]
    fn invalid_override_is_an_error() {
        let mut config = Config::default();
        let err = config
            .apply_overrides(|name| (name == "MCPLI_MAX_REDIRECTS").then(|| "many".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("MCPLI_MAX_REDIRECTS"));
    }
}
