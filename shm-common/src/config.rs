//! Configuration loading
//!
//! Bootstrap settings come from a TOML file. Resolution priority:
//! 1. Command-line argument / environment variable (see [`ConfigOverrides`])
//! 2. TOML config file (explicit path, else the per-user config directory)
//! 3. Compiled defaults
//!
//! A missing config file at the default location is not an error: the
//! service logs a warning and starts on compiled defaults.

use crate::labels::LabelSet;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Default HTTP port for shm-ui
pub const DEFAULT_PORT: u16 = 5730;

/// Default minimum confidence for accepting a prediction
pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.60;

/// Default square input resolution of the classifier
pub const DEFAULT_INPUT_SIZE: u32 = 224;

/// Default cap on sessions held in memory
pub const DEFAULT_MAX_SESSIONS: usize = 256;

/// Bootstrap configuration loaded from TOML
///
/// Every field has a built-in default, so an empty file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Interface to bind the HTTP server to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    /// Path to the ONNX classifier
    pub model_path: PathBuf,

    /// Override of the classifier label order
    ///
    /// Must match the model's output dimensionality.
    pub labels: Option<Vec<String>>,

    /// Idle time after which a session is discarded
    pub session_ttl_secs: u64,

    /// Most sessions held in memory; the longest-idle one is evicted past it
    pub max_sessions: usize,

    /// Upper bound on uploaded image size
    pub max_upload_bytes: usize,

    pub classifier: ClassifierConfig,
    pub acceptance: AcceptanceConfig,
    pub map: MapConfig,
    pub report: ReportConfig,
    pub logging: LoggingConfig,
}

/// Classifier input geometry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Square input resolution (pixels per side)
    pub input_size: u32,
}

/// Prediction acceptance policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceConfig {
    /// When false every classifier result is accepted
    pub enabled: bool,

    /// Minimum top-class probability
    pub min_confidence: f32,
}

/// Which markers the distribution map page shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MapMode {
    /// Only the regions of the predicted soil type
    Predicted,
    /// Every region of every soil type
    All,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub mode: MapMode,
}

/// Output format of exported reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Pdf,
    Html,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    pub format: ReportFormat,

    /// wkhtmltopdf executable (name on PATH or absolute path)
    pub wkhtmltopdf_path: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            model_path: PathBuf::from("soil_model.onnx"),
            labels: None,
            session_ttl_secs: 3600,
            max_sessions: DEFAULT_MAX_SESSIONS,
            max_upload_bytes: 10 * 1024 * 1024,
            classifier: ClassifierConfig::default(),
            acceptance: AcceptanceConfig::default(),
            map: MapConfig::default(),
            report: ReportConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            input_size: DEFAULT_INPUT_SIZE,
        }
    }
}

impl Default for AcceptanceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            mode: MapMode::Predicted,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Pdf,
            wkhtmltopdf_path: PathBuf::from("wkhtmltopdf"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Values supplied on the command line or through environment variables
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub bind_address: Option<String>,
    pub port: Option<u16>,
    pub model_path: Option<PathBuf>,
    pub log_level: Option<String>,
}

impl TomlConfig {
    /// Parse and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `explicit` if given, otherwise from the default location
    ///
    /// An explicit path must exist. A missing file at the default location
    /// yields compiled defaults.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading config from {}", path.display());
            return Self::load(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                info!("Loading config from {}", path.display());
                Self::load(&path)
            }
            Some(path) => {
                warn!(
                    "Config file not found at {}, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Apply command-line / environment overrides on top of file values
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(bind_address) = overrides.bind_address {
            self.bind_address = bind_address;
        }
        if let Some(port) = overrides.port {
            self.port = port;
        }
        if let Some(model_path) = overrides.model_path {
            self.model_path = model_path;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    /// Reject values no component can work with
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.acceptance.min_confidence) {
            return Err(Error::Config(format!(
                "acceptance.min_confidence must be within [0, 1], got {}",
                self.acceptance.min_confidence
            )));
        }
        if self.classifier.input_size == 0 {
            return Err(Error::Config("classifier.input_size must be positive".to_string()));
        }
        if self.max_sessions == 0 {
            return Err(Error::Config("max_sessions must be positive".to_string()));
        }
        if self.max_upload_bytes == 0 {
            return Err(Error::Config("max_upload_bytes must be positive".to_string()));
        }
        if let Some(labels) = &self.labels {
            LabelSet::new(labels.iter().cloned())
                .map_err(|e| Error::Config(format!("labels: {}", e)))?;
        }
        Ok(())
    }

    /// Label set from config, or the default soil labels
    pub fn label_set(&self) -> Result<LabelSet> {
        match &self.labels {
            Some(labels) => LabelSet::new(labels.iter().cloned()),
            None => Ok(LabelSet::default()),
        }
    }
}

/// Per-user config file location: `<config_dir>/shm/shm-ui.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("shm").join("shm-ui.toml"))
}
