//! Tool settings for awstools
//!
//! Handles loading and merging settings from multiple sources:
//! - Default values
//! - System settings (/etc/awstools/awstools.toml)
//! - User settings (~/.awstools.toml)
//! - Project settings (./awstools.toml)
//! - Environment variables
//!
//! These are settings for the tool itself, not the JSON documents resolved by
//! [`crate::config_values`].

use crate::config_values::PrefixTable;
use crate::error::{Error, Result};
use crate::retry::{RetryPolicy, DEFAULT_INITIAL_DELAY, DEFAULT_MAX_ATTEMPTS};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Region used when neither a flag nor the environment names one.
pub const DEFAULT_FALLBACK_REGION: &str = "eu-west-1";

/// Main settings structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Session defaults
    pub defaults: Defaults,

    /// Config value resolver settings
    pub resolver: ResolverSettings,

    /// Colors and output settings
    pub colors: ColorsConfig,
}

/// Session defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Defaults {
    /// Region used when no flag or environment variable is set
    pub fallback_region: String,

    /// Lifetime of assumed-role or MFA session credentials
    #[serde(with = "humantime_serde")]
    pub session_duration: Duration,

    /// Session name used when assuming a role without an explicit one
    pub role_session_name: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            fallback_region: DEFAULT_FALLBACK_REGION.to_string(),
            session_duration: Duration::from_secs(3600),
            role_session_name: None,
        }
    }
}

/// Config value resolver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverSettings {
    /// Maximum number of refresh attempts
    pub max_attempts: u32,

    /// Wait after the first failed attempt; doubles afterwards
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,

    /// Replacement key prefix table (`{"KMS" = "KMS_", ...}`)
    pub key_prefixes: Option<PrefixTable>,

    /// Replacement value prefix table (`{"KMS" = "kms://", ...}`)
    pub value_prefixes: Option<PrefixTable>,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_delay: DEFAULT_INITIAL_DELAY,
            key_prefixes: None,
            value_prefixes: None,
        }
    }
}

impl ResolverSettings {
    /// Build the retry policy described by these settings.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_attempts, self.initial_delay)
    }
}

/// Colors configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorsConfig {
    /// Enable colored output
    pub enabled: bool,
}

impl Default for ColorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Settings {
    /// Load settings from all sources
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(Error::Settings(format!(
                    "settings file not found: {}",
                    path.display()
                )));
            }
        }

        let mut settings = Settings::default();

        for path in Self::get_config_paths(config_path) {
            if path.exists() {
                settings = settings.merge_from_file(&path)?;
            }
        }

        settings.apply_env_overrides();

        Ok(settings)
    }

    /// Get the list of settings file paths to check
    fn get_config_paths(explicit_path: Option<&PathBuf>) -> Vec<PathBuf> {
        let mut paths = Vec::new();

        // Explicit path takes priority
        if let Some(path) = explicit_path {
            paths.push(path.clone());
            return paths;
        }

        paths.push(PathBuf::from("/etc/awstools/awstools.toml"));

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".awstools.toml"));
        }

        paths.push(PathBuf::from("awstools.toml"));

        // Loaded last so it wins over the standard locations
        if let Ok(env_config) = std::env::var("AWSTOOLS_CONFIG") {
            paths.push(PathBuf::from(env_config));
        }

        paths
    }

    /// Merge settings from a file
    ///
    /// Every key the file sets replaces the current value, even when it
    /// equals the default.
    fn merge_from_file(&self, path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| Error::read_file(path, e))?;
        let settings_error = |e: &dyn std::fmt::Display| {
            Error::Settings(format!("{}: {}", path.display(), e))
        };

        let overlay: toml::Table = toml::from_str(&content).map_err(|e| settings_error(&e))?;

        let mut merged = match toml::Value::try_from(self).map_err(|e| settings_error(&e))? {
            toml::Value::Table(table) => table,
            _ => toml::Table::new(),
        };
        deep_merge(&mut merged, overlay);

        toml::Value::Table(merged)
            .try_into()
            .map_err(|e| settings_error(&e))
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        // AWSTOOLS_FALLBACK_REGION
        if let Ok(region) = std::env::var("AWSTOOLS_FALLBACK_REGION") {
            if !region.is_empty() {
                self.defaults.fallback_region = region;
            }
        }

        // AWSTOOLS_MAX_ATTEMPTS
        if let Ok(attempts) = std::env::var("AWSTOOLS_MAX_ATTEMPTS") {
            if let Ok(n) = attempts.parse() {
                self.resolver.max_attempts = n;
            }
        }

        // NO_COLOR
        if std::env::var("NO_COLOR").is_ok() {
            self.colors.enabled = false;
        }
    }

    /// Load from a specific file, ignoring the standard locations
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Settings::default().merge_from_file(path.as_ref())
    }
}

/// Overlay `overlay` onto `base`, descending into tables present in both.
fn deep_merge(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                deep_merge(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config_values::SourceType;
    use serial_test::serial;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.defaults.fallback_region, "eu-west-1");
        assert_eq!(settings.defaults.session_duration, Duration::from_secs(3600));
        assert_eq!(settings.resolver.max_attempts, 5);
        assert_eq!(settings.resolver.initial_delay, Duration::from_secs(4));
        assert!(settings.colors.enabled);
    }

    #[test]
    fn test_later_file_can_restore_default_values() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        std::fs::write(
            &first,
            "[defaults]\nfallback_region = \"us-west-2\"\n[resolver]\nmax_attempts = 2\ninitial_delay = \"1s\"\n",
        )
        .unwrap();
        std::fs::write(&second, "[resolver]\nmax_attempts = 5\ninitial_delay = \"4s\"\n").unwrap();

        let merged = Settings::default()
            .merge_from_file(&first)
            .unwrap()
            .merge_from_file(&second)
            .unwrap();

        assert_eq!(merged.resolver.max_attempts, 5);
        assert_eq!(merged.resolver.initial_delay, Duration::from_secs(4));
        assert_eq!(merged.defaults.fallback_region, "us-west-2");
    }

    #[test]
    fn test_merge_combines_prefix_tables() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.toml");
        let second = dir.path().join("second.toml");
        std::fs::write(&first, "[resolver]\nkey_prefixes = { KMS = \"ENC_\" }\n").unwrap();
        std::fs::write(&second, "[resolver]\nkey_prefixes = { SSM = \"PARAM_\" }\n").unwrap();

        let merged = Settings::default()
            .merge_from_file(&first)
            .unwrap()
            .merge_from_file(&second)
            .unwrap();

        let prefixes = merged.resolver.key_prefixes.unwrap();
        assert_eq!(prefixes.get(SourceType::Kms), Some("ENC_"));
        assert_eq!(prefixes.get(SourceType::Ssm), Some("PARAM_"));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let path = PathBuf::from("/nonexistent/awstools/settings.toml");
        let err = Settings::load(Some(&path)).unwrap_err();

        assert!(matches!(err, Error::Settings(_)));
        assert!(err.to_string().contains("settings file not found"));
    }

    #[test]
    fn test_parse_toml_with_prefixes() {
        let settings: Settings = toml::from_str(
            r#"
[defaults]
fallback_region = "us-east-1"
session_duration = "30m"

[resolver]
initial_delay = "1s"
key_prefixes = { SSM = "PARAM_" }
"#,
        )
        .unwrap();

        assert_eq!(settings.defaults.fallback_region, "us-east-1");
        assert_eq!(settings.defaults.session_duration, Duration::from_secs(1800));
        assert_eq!(settings.resolver.initial_delay, Duration::from_secs(1));
        let prefixes = settings.resolver.key_prefixes.unwrap();
        assert_eq!(prefixes.get(SourceType::Ssm), Some("PARAM_"));
    }

    #[test]
    #[serial]
    fn test_env_override() {
        std::env::set_var("AWSTOOLS_MAX_ATTEMPTS", "9");
        let mut settings = Settings::default();
        settings.apply_env_overrides();
        assert_eq!(settings.resolver.max_attempts, 9);
        std::env::remove_var("AWSTOOLS_MAX_ATTEMPTS");
    }
}
