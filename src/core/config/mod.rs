//! core::config
//!
//! Configuration schema and loading.
//!
//! # Locations
//!
//! [`Config::load`] searches in order and uses the first file found:
//! 1. `$CONTENT_LIFECYCLE_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/content-lifecycle/config.toml`
//! 3. `~/.content-lifecycle/config.toml`
//!
//! When no file exists, defaults are used. A file that exists but fails to
//! parse or validate is an error, never a silent fallback.
//!
//! # Example
//!
//! ```
//! use content_lifecycle::core::config::Config;
//!
//! let config = Config::parse(r#"
//!     [workflow]
//!     document = "editorial"
//! "#).unwrap();
//!
//! assert_eq!(config.workflow().document, "editorial");
//! assert_eq!(config.workflow().folder, "threepane");
//! ```

pub mod schema;

pub use schema::{BinaryConfig, BindingConfig, GalleryFallback, ManagerConfig, WorkflowConfig};

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "CONTENT_LIFECYCLE_CONFIG";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),
}

/// Loaded configuration.
#[derive(Debug, Clone, Default)]
pub struct Config {
    /// The coordinator settings.
    pub manager: ManagerConfig,
    /// Path of the file the settings came from (if any).
    source: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a config file exists but cannot be read, parsed
    /// or validated. A missing file is not an error.
    pub fn load() -> Result<Config, ConfigError> {
        match Self::locate() {
            Some(path) => Self::load_from(&path),
            None => Ok(Config::default()),
        }
    }

    /// Find the first existing config file.
    fn locate() -> Option<PathBuf> {
        // 1. Check $CONTENT_LIFECYCLE_CONFIG
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check $XDG_CONFIG_HOME/content-lifecycle/config.toml
        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("content-lifecycle/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        // 3. Check ~/.content-lifecycle/config.toml
        if let Some(home) = dirs::home_dir() {
            let path = home.join(".content-lifecycle/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        None
    }

    /// Load configuration from an explicit file.
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let manager: ManagerConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        manager.validate()?;

        Ok(Config {
            manager,
            source: Some(path.to_path_buf()),
        })
    }

    /// Parse configuration from TOML text.
    pub fn parse(text: &str) -> Result<Config, ConfigError> {
        let manager: ManagerConfig = toml::from_str(text).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        manager.validate()?;

        Ok(Config {
            manager,
            source: None,
        })
    }

    /// Workflow category settings.
    pub fn workflow(&self) -> &WorkflowConfig {
        &self.manager.workflow
    }

    /// Document binding settings.
    pub fn binding(&self) -> &BindingConfig {
        &self.manager.binding
    }

    /// Binary import settings.
    pub fn binary(&self) -> &BinaryConfig {
        &self.manager.binary
    }

    /// Path of the file the configuration was loaded from.
    pub fn loaded_from(&self) -> Option<&Path> {
        self.source.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn load_from_file() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("config.toml");
        fs::write(
            &config_path,
            r#"
            [workflow]
            folder = "embedded"

            [binding]
            property_excludes = ["hippo:*", "myapp:internal"]
            "#,
        )
        .unwrap();

        let config = Config::load_from(&config_path).unwrap();
        assert_eq!(config.workflow().folder, "embedded");
        assert_eq!(config.binding().property_excludes.len(), 2);
        assert_eq!(config.loaded_from(), Some(config_path.as_path()));
    }

    #[test]
    fn load_from_env() {
        let temp = TempDir::new().unwrap();
        let config_path = temp.path().join("lifecycle.toml");
        fs::write(&config_path, "[workflow]\ndefault = \"custom-core\"\n").unwrap();

        std::env::set_var(CONFIG_ENV, config_path.to_str().unwrap());
        let config = Config::load().unwrap();
        std::env::remove_var(CONFIG_ENV);

        assert_eq!(config.workflow().default, "custom-core");
    }

    #[test]
    fn missing_file_is_read_error() {
        let temp = TempDir::new().unwrap();
        let result = Config::load_from(&temp.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }

    #[test]
    fn unknown_fields_rejected() {
        let result = Config::parse(
            r#"
            [workflow]
            folder = "threepane"
            unknown_field = true
            "#,
        );
        assert!(matches!(result, Err(ConfigError::ParseError { .. })));
    }

    #[test]
    fn invalid_values_rejected() {
        let result = Config::parse(
            r#"
            [binary]
            property_excludes = ["*"]
            "#,
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn empty_text_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.manager, ManagerConfig::default());
        assert!(config.loaded_from().is_none());
    }

    #[test]
    fn fallback_tables_parse() {
        let config = Config::parse(
            r#"
            [binary.fallbacks."myapp:videoGallery"]
            folder_types = ["new-video-folder"]
            gallery_types = ["myapp:videoset"]
            "#,
        )
        .unwrap();

        let fallback = config.binary().fallback_for("myapp:videoGallery").unwrap();
        assert_eq!(fallback.folder_types, vec!["new-video-folder"]);
    }
}
