//! Configuration management for the MVR client.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::types::OcrEngineKind;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Default host of the MVR portal.
pub const DEFAULT_BASE_URL: &str = "https://www.mvr.bg";

/// Path of the "issued and not received Bulgarian identity documents" service.
pub const DEFAULT_SERVICE_PATH: &str =
    "/електронизирани-услуги/справка-за-издадени-и-неполучени-български-лични-документи";

/// Service type identifier the portal expects for the document status lookup.
pub const DEFAULT_SERVICE_TYPE: &str = "6729";

/// Main application configuration.
///
/// This is loaded from `~/.config/mvr/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP client and retry settings
    pub client: ClientConfig,
    /// CAPTCHA solving settings
    pub captcha: CaptchaConfig,
}

impl AppConfig {
    /// Load configuration from the default location, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path, falling back to defaults if not found.
    pub fn load_from(path: &Path) -> ConfigResult<Self> {
        if path.exists() {
            tracing::debug!("Loading config from {}", path.display());
            let contents = fs::read_to_string(path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Apply environment variable overrides on top of the current values.
    ///
    /// Supports the following environment variables:
    /// - `MVR_BASE_URL`: Override the portal base URL
    /// - `MVR_TIMEOUT_SECS`: Override the per-request timeout
    /// - `MVR_MAX_RETRIES`: Override the CAPTCHA retry budget
    /// - `MVR_OCR_ENGINES`: Comma separated OCR engine priority list
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("MVR_BASE_URL") {
            if !val.trim().is_empty() {
                tracing::debug!("Override client.base_url from env: {}", val);
                self.client.base_url = val;
            }
        }

        if let Ok(val) = std::env::var("MVR_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                self.client.timeout_secs = secs;
                tracing::debug!("Override client.timeout_secs from env: {}", secs);
            }
        }

        if let Ok(val) = std::env::var("MVR_MAX_RETRIES") {
            if let Ok(retries) = val.parse() {
                self.client.max_retries = retries;
                tracing::debug!("Override client.max_retries from env: {}", retries);
            }
        }

        if let Ok(val) = std::env::var("MVR_OCR_ENGINES") {
            let engines: Result<Vec<OcrEngineKind>, _> = val
                .split(',')
                .filter(|s| !s.trim().is_empty())
                .map(str::parse)
                .collect();
            match engines {
                Ok(engines) => {
                    tracing::debug!("Override captcha.engines from env: {:?}", engines);
                    self.captcha.engines = engines;
                }
                Err(e) => tracing::warn!("Ignoring MVR_OCR_ENGINES: {}", e),
            }
        }

        self
    }

    /// Load configuration from the default location with environment variable overrides.
    pub fn load_with_env() -> ConfigResult<Self> {
        Ok(Self::load()?.with_env_overrides())
    }

    /// Check that the configured values are usable.
    pub fn validate(&self) -> ConfigResult<()> {
        self.client.validate()?;
        self.captcha.validate()
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        self.save_to(&config_path)
    }

    /// Save configuration to an explicit path.
    pub fn save_to(&self, path: &Path) -> ConfigResult<()> {
        let config_dir = path.parent().ok_or_else(|| ConfigError::InvalidValue {
            field: "config_path".to_string(),
            reason: "no parent directory".to_string(),
        })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/mvr/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("bg", "mvr", "mvr").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }
}

/// HTTP client and retry settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Scheme and host of the portal, e.g. `https://www.mvr.bg`
    pub base_url: String,
    /// Path of the query service on the portal
    pub service_path: String,
    /// Value of the `type` query parameter
    pub service_type: String,
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Maximum number of fetch-solve-submit cycles
    pub max_retries: u32,
    /// User agent string
    pub user_agent: String,
    /// Value of the `Accept-Language` header
    pub accept_language: String,
}

impl ClientConfig {
    /// Check the client settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.max_retries".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "client.timeout_secs".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        url::Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            field: "client.base_url".to_string(),
            reason: e.to_string(),
        })?;
        Ok(())
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            service_path: DEFAULT_SERVICE_PATH.to_string(),
            service_type: DEFAULT_SERVICE_TYPE.to_string(),
            timeout_secs: 30,
            max_retries: 5,
            user_agent: "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36"
                .to_string(),
            accept_language: "bg,en-US;q=0.7,en;q=0.3".to_string(),
        }
    }
}

/// CAPTCHA solving settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptchaConfig {
    /// OCR engines in priority order; the first one installed is used
    pub engines: Vec<OcrEngineKind>,
    /// Convert to a strict black and white image before OCR
    pub preprocess: bool,
    /// Greyscale level above which a pixel becomes white
    pub threshold: u8,
    /// Where manual mode writes the CAPTCHA image (defaults to the temp dir)
    pub manual_image_path: Option<PathBuf>,
    /// Try to open the CAPTCHA image with the system viewer in manual mode
    pub open_viewer: bool,
}

impl CaptchaConfig {
    /// Check the CAPTCHA settings.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.threshold == u8::MAX {
            return Err(ConfigError::InvalidValue {
                field: "captcha.threshold".to_string(),
                reason: "255 would turn every pixel black".to_string(),
            });
        }
        Ok(())
    }

    /// Path the manual solver writes the CAPTCHA image to.
    #[must_use]
    pub fn manual_image_path(&self) -> PathBuf {
        self.manual_image_path
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("mvr_captcha.png"))
    }
}

impl Default for CaptchaConfig {
    fn default() -> Self {
        Self {
            engines: vec![OcrEngineKind::Tesseract, OcrEngineKind::Gocr],
            preprocess: true,
            threshold: 180,
            manual_image_path: None,
            open_viewer: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.client.base_url, "https://www.mvr.bg");
        assert_eq!(config.client.service_type, "6729");
        assert_eq!(config.client.max_retries, 5);
        assert_eq!(config.client.timeout_secs, 30);
        assert_eq!(config.captcha.threshold, 180);
        assert_eq!(
            config.captcha.engines,
            vec![OcrEngineKind::Tesseract, OcrEngineKind::Gocr]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("[client]"));
        assert!(toml_str.contains("[captcha]"));

        let parsed: AppConfig = toml::from_str(&toml_str).expect("parse serialized config");
        assert_eq!(parsed.client.service_path, config.client.service_path);
    }

    #[test]
    fn test_config_save_load() {
        let tmp = TempDir::new().expect("create temp dir");
        let config_path = tmp.path().join("nested").join("config.toml");

        let mut config = AppConfig::default();
        config.client.max_retries = 9;
        config.captcha.engines = vec![OcrEngineKind::Gocr];

        config.save_to(&config_path).expect("save config");
        let loaded = AppConfig::load_from(&config_path).expect("load config");

        assert_eq!(loaded.client.max_retries, 9);
        assert_eq!(loaded.captcha.engines, vec![OcrEngineKind::Gocr]);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let tmp = TempDir::new().expect("create temp dir");
        let loaded =
            AppConfig::load_from(&tmp.path().join("absent.toml")).expect("defaults for missing");
        assert_eq!(loaded.client.max_retries, 5);
    }

    #[test]
    fn test_env_overrides() {
        std::env::set_var("MVR_BASE_URL", "http://127.0.0.1:8080");
        std::env::set_var("MVR_MAX_RETRIES", "7");
        std::env::set_var("MVR_OCR_ENGINES", "gocr");

        let config = AppConfig::default().with_env_overrides();
        assert_eq!(config.client.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.client.max_retries, 7);
        assert_eq!(config.captcha.engines, vec![OcrEngineKind::Gocr]);

        std::env::remove_var("MVR_BASE_URL");
        std::env::remove_var("MVR_MAX_RETRIES");
        std::env::remove_var("MVR_OCR_ENGINES");
    }

    #[test]
    fn test_partial_config() {
        let toml_str = r#"
[client]
max_retries = 3

[captcha]
engines = ["gocr"]
"#;

        let config: AppConfig = toml::from_str(toml_str).expect("parse partial config");
        assert_eq!(config.client.max_retries, 3);
        assert_eq!(config.captcha.engines, vec![OcrEngineKind::Gocr]);
        // These should be defaults
        assert_eq!(config.client.timeout_secs, 30);
        assert!(config.captcha.preprocess);
    }

    #[test]
    fn test_validate_rejects_zero_retries() {
        let mut config = AppConfig::default();
        config.client.max_retries = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("client.max_retries"));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let mut config = AppConfig::default();
        config.client.base_url = "not a url".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_manual_image_path_default() {
        let config = CaptchaConfig::default();
        assert!(config.manual_image_path().ends_with("mvr_captcha.png"));
    }
}
