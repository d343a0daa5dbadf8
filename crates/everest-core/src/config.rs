//! # Configuration
//!
//! TOML configuration for EVEREST.
//!
//! ```toml
//! data_dir = "~/.everest3"
//!
//! [logging]
//! file = "~/.everest3/everest.log"
//! quiet = false
//! json = false
//!
//! [dvs]
//! margins = 0.5
//! hspace = 0.75
//! wspace = 0.75
//! labels = false
//! ```
//!
//! The data directory resolves in this order: the `EVEREST3_DATA_DIR`
//! environment variable, the `data_dir` key, then `~/.everest3`.

use crate::EverestError;
use crate::constants::{DATA_DIR_ENV, DEFAULT_DATA_DIR};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Top-level data directory. `~` is expanded.
    pub data_dir: Option<PathBuf>,
    /// Logging settings.
    pub logging: LoggingConfig,
    /// DVS page settings.
    pub dvs: DvsConfig,
}

/// Logging section of the configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log file; screen-only logging when absent.
    pub file: Option<PathBuf>,
    /// Only report errors on screen.
    pub quiet: bool,
    /// Emit JSON lines instead of text.
    pub json: bool,
}

/// DVS section of the configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DvsConfig {
    /// Page margins in inches.
    pub margins: f64,
    /// Vertical spacing between cells, as a fraction of the mean cell height.
    pub hspace: f64,
    /// Horizontal spacing between cells, as a fraction of the mean cell width.
    pub wspace: f64,
    /// Label each cell with its number.
    pub labels: bool,
}

impl Default for DvsConfig {
    fn default() -> Self {
        Self {
            margins: 0.5,
            hspace: 0.75,
            wspace: 0.75,
            labels: false,
        }
    }
}

impl Config {
    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, EverestError> {
        let config: Config =
            toml::from_str(text).map_err(|e| EverestError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self, EverestError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            EverestError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        tracing::debug!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Check value ranges that TOML typing cannot express.
    pub fn validate(&self) -> Result<(), EverestError> {
        let dvs = &self.dvs;
        if !(0.0..4.25).contains(&dvs.margins) {
            return Err(EverestError::InvalidConfig(format!(
                "dvs.margins must be in [0, 4.25) inches, got {}",
                dvs.margins
            )));
        }
        if dvs.hspace < 0.0 || dvs.wspace < 0.0 {
            return Err(EverestError::InvalidConfig(
                "dvs.hspace and dvs.wspace must be non-negative".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the top-level data directory without touching the file system.
    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = std::env::var_os(DATA_DIR_ENV).filter(|v| !v.is_empty()) {
            return expand_home(Path::new(&dir));
        }
        match &self.data_dir {
            Some(dir) => expand_home(dir),
            None => expand_home(Path::new(DEFAULT_DATA_DIR)),
        }
    }

    /// Resolve the data directory and create it if it does not exist.
    pub fn ensure_data_dir(&self) -> Result<PathBuf, EverestError> {
        let dir = self.data_dir();
        ensure_dir(&dir)?;
        Ok(dir)
    }

    /// Resolved log file path, if any.
    #[must_use]
    pub fn log_file(&self) -> Option<PathBuf> {
        self.logging.file.as_deref().map(expand_home)
    }
}

/// Expand a leading `~` to the user's home directory.
///
/// Paths are returned unchanged when there is no `~` or no home directory.
#[must_use]
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}

/// Create a directory (and its parents) if it does not exist.
pub fn ensure_dir(dir: &Path) -> Result<(), EverestError> {
    if dir.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(dir).map_err(|e| {
        EverestError::IoError(format!("Cannot create directory '{}': {}", dir.display(), e))
    })?;
    tracing::debug!("Created directory {}", dir.display());
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_dvs_page() {
        let config = Config::default();
        assert_eq!(config.dvs.margins, 0.5);
        assert_eq!(config.dvs.hspace, 0.75);
        assert!(!config.dvs.labels);
        assert!(config.logging.file.is_none());
    }

    #[test]
    fn parses_full_file() {
        let config = Config::from_toml_str(
            r#"
            data_dir = "/tmp/everest"
            [logging]
            quiet = true
            [dvs]
            labels = true
            margins = 0.25
            "#,
        )
        .unwrap();
        assert_eq!(config.data_dir, Some(PathBuf::from("/tmp/everest")));
        assert!(config.logging.quiet);
        assert!(config.dvs.labels);
        assert_eq!(config.dvs.margins, 0.25);
        assert_eq!(config.dvs.wspace, 0.75);
    }

    #[test]
    fn rejects_unknown_keys() {
        let result = Config::from_toml_str("colour = \"red\"");
        assert!(matches!(result, Err(EverestError::InvalidConfig(_))));
    }

    #[test]
    fn rejects_oversized_margins() {
        let result = Config::from_toml_str("[dvs]\nmargins = 5.0");
        assert!(matches!(result, Err(EverestError::InvalidConfig(_))));
    }

    #[test]
    fn expand_home_leaves_absolute_paths() {
        assert_eq!(expand_home(Path::new("/data/k2")), PathBuf::from("/data/k2"));
    }

    #[test]
    fn ensure_dir_creates_nested() {
        let tmp = tempfile::tempdir().unwrap();
        let nested = tmp.path().join("a").join("b");
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());
        // Second call is a no-op
        ensure_dir(&nested).unwrap();
    }
}
