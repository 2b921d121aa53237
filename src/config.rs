//! Veil configuration management

use crate::audit::queue::DEFAULT_CAPACITY;
use crate::error::{Error, Result};
use crate::masking::MaskingMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main Veil configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VeilConfig {
    /// Masking configuration
    #[serde(default)]
    pub masking: MaskingConfig,

    /// Audit queue configuration
    #[serde(default)]
    pub audit: AuditConfig,
}

/// Masking configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MaskingConfig {
    /// Mode used when a caller does not pick one
    #[serde(default)]
    pub default_mode: MaskingMode,
}

/// Audit queue configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditConfig {
    /// Record masking events
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Maximum buffered events before the oldest is dropped
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Seconds between flushes to the audit sink
    #[serde(default = "default_flush_interval")]
    pub flush_interval_secs: u64,
}

fn default_true() -> bool {
    true
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_flush_interval() -> u64 {
    30
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            capacity: DEFAULT_CAPACITY,
            flush_interval_secs: default_flush_interval(),
        }
    }
}

impl AuditConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_secs(self.flush_interval_secs.max(1))
    }
}

impl VeilConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// `<config dir>/veil/config.toml`, if the platform has a config dir.
    pub fn default_path() -> Option<PathBuf> {
        dirs_next::config_dir().map(|p| p.join("veil").join("config.toml"))
    }

    /// Load from `path`, else from [`default_path`](Self::default_path) if
    /// that file exists, else defaults. An explicit path must exist.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match Self::default_path() {
            Some(path) if path.exists() => Self::from_file(path),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.audit.capacity == 0 {
            return Err(Error::Config("audit.capacity must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = VeilConfig::default();
        assert_eq!(config.masking.default_mode, MaskingMode::Full);
        assert!(config.audit.enabled);
        assert_eq!(config.audit.capacity, 10_000);
        assert_eq!(config.audit.flush_interval(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: VeilConfig = toml::from_str(
            r#"
            [masking]
            default_mode = "financial_only"
            "#,
        )
        .unwrap();
        assert_eq!(config.masking.default_mode, MaskingMode::FinancialOnly);
        assert_eq!(config.audit, AuditConfig::default());
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[audit]\nenabled = false\ncapacity = 5\nflush_interval_secs = 2"
        )
        .unwrap();

        let config = VeilConfig::from_file(file.path()).unwrap();
        assert!(!config.audit.enabled);
        assert_eq!(config.audit.capacity, 5);
        assert_eq!(config.audit.flush_interval(), Duration::from_secs(2));
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[audit]\ncapacity = 0").unwrap();
        assert!(matches!(
            VeilConfig::from_file(file.path()),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result: std::result::Result<VeilConfig, _> =
            toml::from_str("[masking]\ndefault_mode = \"partial\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_explicit_missing_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            VeilConfig::load_or_default(Some(missing.as_path())),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = VeilConfig::default();
        let text = config.to_toml().unwrap();
        assert!(text.contains("default_mode = \"full\""));
        let parsed: VeilConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
