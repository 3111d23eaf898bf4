//! Configuration for creditwatch.
//!
//! Values are layered file → environment → CLI. The file is
//! `creditwatch.toml` in the working directory unless `--config` points
//! elsewhere; a missing default file means defaults.
//!
//! # Configuration File Format
//!
//! ```toml
//! [api]
//! base_url = "http://localhost:8000"
//! timeout_secs = 30
//!
//! [poll]
//! interval_ms = 2000
//! not_found_grace = 2
//! ```

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::ConfigError;
use crate::poller::{DEFAULT_NOT_FOUND_GRACE, DEFAULT_POLL_INTERVAL, PollerConfig};

pub const CONFIG_FILE_NAME: &str = "creditwatch.toml";

/// Overrides `[api] base_url`.
pub const ENV_API_BASE: &str = "CREDITWATCH_API_BASE";
/// Overrides `[poll] interval_ms`.
pub const ENV_POLL_INTERVAL_MS: &str = "CREDITWATCH_POLL_INTERVAL_MS";

/// Backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Poller tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollSection {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Consecutive 404s from the status endpoint tolerated silently
    #[serde(default = "default_not_found_grace")]
    pub not_found_grace: u32,
}

fn default_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL.as_millis() as u64
}

fn default_not_found_grace() -> u32 {
    DEFAULT_NOT_FOUND_GRACE
}

impl Default for PollSection {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            not_found_grace: default_not_found_grace(),
        }
    }
}

/// Parsed `creditwatch.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WatchToml {
    #[serde(default)]
    pub api: ApiSection,
    #[serde(default)]
    pub poll: PollSection,
}

impl WatchToml {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Load `creditwatch.toml` from `dir`, or defaults if it does not exist.
    pub fn load_or_default(dir: &Path) -> Result<Self, ConfigError> {
        let path = dir.join(CONFIG_FILE_NAME);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save configuration to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let content =
            toml::to_string_pretty(self).context("Failed to serialize creditwatch.toml")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;
        Ok(())
    }

    /// Validate the configuration and return any warnings.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if !is_http_url(&self.api.base_url) {
            warnings.push(format!(
                "Invalid base_url '{}': should start with http:// or https://",
                self.api.base_url
            ));
        }
        if self.api.timeout_secs == 0 {
            warnings.push("timeout_secs is 0: every request will time out immediately".into());
        }
        if self.poll.interval_ms == 0 {
            warnings.push("interval_ms is 0: the backend will be polled back-to-back".into());
        }

        warnings
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Values given on the command line; `None` means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub api_base: Option<String>,
    pub interval_ms: Option<u64>,
}

/// Effective configuration after layering.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// File the values were read from, if any
    pub source: Option<PathBuf>,
    pub toml: WatchToml,
}

impl WatchConfig {
    /// Resolve configuration for the current process.
    ///
    /// An explicit `config_path` must exist; the default file in the working
    /// directory is optional.
    pub fn resolve(config_path: Option<&Path>, overrides: &CliOverrides) -> anyhow::Result<Self> {
        let (toml, source) = match config_path {
            Some(path) => (WatchToml::load(path)?, Some(path.to_path_buf())),
            None => {
                let cwd = std::env::current_dir().context("Failed to get current directory")?;
                let path = cwd.join(CONFIG_FILE_NAME);
                let toml = WatchToml::load_or_default(&cwd)?;
                (toml, path.exists().then_some(path))
            }
        };
        let config = Self::layer(toml, source, |key| std::env::var(key).ok(), overrides)?;
        Ok(config)
    }

    /// Apply environment and CLI layers on top of `toml`. `env` looks up a
    /// variable by name.
    pub fn layer(
        mut toml: WatchToml,
        source: Option<PathBuf>,
        env: impl Fn(&str) -> Option<String>,
        overrides: &CliOverrides,
    ) -> Result<Self, ConfigError> {
        if let Some(base) = env(ENV_API_BASE).filter(|v| !v.trim().is_empty()) {
            toml.api.base_url = base.trim().to_string();
        }
        if let Some(raw) = env(ENV_POLL_INTERVAL_MS).filter(|v| !v.trim().is_empty()) {
            toml.poll.interval_ms = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_POLL_INTERVAL_MS.to_string(),
                value: raw.clone(),
            })?;
        }

        if let Some(base) = &overrides.api_base {
            toml.api.base_url = base.clone();
        }
        if let Some(ms) = overrides.interval_ms {
            toml.poll.interval_ms = ms;
        }

        Ok(Self { source, toml })
    }

    pub fn base_url(&self) -> &str {
        &self.toml.api.base_url
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.toml.api.timeout_secs)
    }

    pub fn poller_config(&self) -> PollerConfig {
        PollerConfig::default()
            .with_interval(Duration::from_millis(self.toml.poll.interval_ms))
            .with_not_found_grace(self.toml.poll.not_found_grace)
    }

    pub fn validate(&self) -> Vec<String> {
        self.toml.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_watch_toml_parse_empty() {
        let toml = WatchToml::parse("").unwrap();
        assert_eq!(toml, WatchToml::default());
        assert_eq!(toml.api.base_url, "http://localhost:8000");
        assert_eq!(toml.api.timeout_secs, 30);
        assert_eq!(toml.poll.interval_ms, 2000);
        assert_eq!(toml.poll.not_found_grace, 2);
    }

    #[test]
    fn test_watch_toml_parse_partial() {
        let toml = WatchToml::parse(
            r#"
[poll]
interval_ms = 500
"#,
        )
        .unwrap();
        assert_eq!(toml.poll.interval_ms, 500);
        assert_eq!(toml.poll.not_found_grace, 2);
        assert_eq!(toml.api, ApiSection::default());
    }

    #[test]
    fn test_watch_toml_parse_rejects_wrong_type() {
        assert!(WatchToml::parse("[poll]\ninterval_ms = \"fast\"\n").is_err());
    }

    #[test]
    fn test_validate_defaults_are_clean() {
        assert!(WatchToml::default().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_each_problem() {
        let mut toml = WatchToml::default();
        toml.api.base_url = "localhost:8000".into();
        toml.api.timeout_secs = 0;
        toml.poll.interval_ms = 0;
        let warnings = toml.validate();
        assert_eq!(warnings.len(), 3);
        assert!(warnings[0].contains("localhost:8000"));
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        let mut toml = WatchToml::default();
        toml.api.base_url = "https://credit.example.com".into();
        toml.poll.not_found_grace = 5;
        toml.save(&path).unwrap();

        let loaded = WatchToml::load(&path).unwrap();
        assert_eq!(loaded, toml);
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempdir().unwrap();
        let toml = WatchToml::load_or_default(dir.path()).unwrap();
        assert_eq!(toml, WatchToml::default());
    }

    #[test]
    fn test_load_reports_parse_error_with_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE_NAME);
        std::fs::write(&path, "[api\nbase_url = ").unwrap();
        match WatchToml::load(&path) {
            Err(ConfigError::Parse { path: p, .. }) => assert_eq!(p, path),
            other => panic!("Expected Parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_load_missing_explicit_file_is_read_error() {
        let dir = tempdir().unwrap();
        let err = WatchToml::load(&dir.path().join("nope.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_layering_priority() {
        let mut file = WatchToml::default();
        file.api.base_url = "http://file:8000".into();
        file.poll.interval_ms = 3000;

        let env: HashMap<&str, &str> = [
            (ENV_API_BASE, "http://env:8000"),
            (ENV_POLL_INTERVAL_MS, "1500"),
        ]
        .into_iter()
        .collect();
        let lookup = |k: &str| env.get(k).map(|v| v.to_string());

        let config =
            WatchConfig::layer(file.clone(), None, lookup, &CliOverrides::default()).unwrap();
        assert_eq!(config.base_url(), "http://env:8000");
        assert_eq!(config.poller_config().interval, Duration::from_millis(1500));

        let cli = CliOverrides {
            api_base: Some("http://cli:8000".into()),
            interval_ms: Some(250),
        };
        let config = WatchConfig::layer(file, None, lookup, &cli).unwrap();
        assert_eq!(config.base_url(), "http://cli:8000");
        assert_eq!(config.poller_config().interval, Duration::from_millis(250));
        assert_eq!(config.poller_config().not_found_grace, 2);
    }

    #[test]
    fn test_invalid_env_interval_is_rejected() {
        let lookup = |k: &str| (k == ENV_POLL_INTERVAL_MS).then(|| "soon".to_string());
        let err = WatchConfig::layer(WatchToml::default(), None, lookup, &CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let lookup = |k: &str| (k == ENV_API_BASE).then(|| "  ".to_string());
        let config =
            WatchConfig::layer(WatchToml::default(), None, lookup, &CliOverrides::default())
                .unwrap();
        assert_eq!(config.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_timeout_and_defaults() {
        let config =
            WatchConfig::layer(WatchToml::default(), None, no_env, &CliOverrides::default())
                .unwrap();
        assert_eq!(config.timeout(), Duration::from_secs(30));
        assert_eq!(config.poller_config(), PollerConfig::default());
        assert!(config.source.is_none());
    }
}
