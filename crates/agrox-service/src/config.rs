//! Device configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use agrox_core::{BlinkPattern, IndicatorPins};

use crate::acquisition::AcquisitionPeriods;

/// Environment variable that overrides `upload.server_url`.
pub const SERVER_URL_ENV: &str = "SERVER_URL";

/// Device configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server settings.
    pub server: ServerConfig,
    /// Where readings and images are kept.
    pub storage: StorageConfig,
    /// Acquisition loop timing.
    pub acquisition: AcquisitionConfig,
    /// Temperature/humidity sensor.
    pub sensor: SensorConfig,
    /// Still camera.
    pub camera: CameraConfig,
    /// Status LEDs.
    pub indicator: IndicatorConfig,
    /// Remote upload server.
    pub upload: UploadConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = default_config_path();
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Save configuration to a file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self).map_err(ConfigError::Serialize)?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        std::fs::write(path.as_ref(), content).map_err(|e| ConfigError::Write {
            path: path.as_ref().to_path_buf(),
            source: e,
        })
    }

    /// Apply the `SERVER_URL` environment override, if set.
    pub fn apply_env_overrides(&mut self) {
        self.apply_server_url_override(std::env::var(SERVER_URL_ENV).ok());
    }

    fn apply_server_url_override(&mut self, value: Option<String>) {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            self.upload.server_url = url.trim().to_string();
        }
    }

    /// Validate the configuration and return all errors at once.
    ///
    /// # Example
    ///
    /// ```
    /// use agrox_service::Config;
    ///
    /// let config = Config::default();
    /// config.validate().expect("Default config should be valid");
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        errors.extend(self.server.validate());
        errors.extend(self.storage.validate());
        errors.extend(self.acquisition.validate());
        errors.extend(self.camera.validate());
        errors.extend(self.indicator.validate());
        errors.extend(self.upload.validate());

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.bind.is_empty() {
            errors.push(ValidationError::new(
                "server.bind",
                "bind address cannot be empty",
            ));
            return errors;
        }

        let Some((_, port)) = self.bind.rsplit_once(':') else {
            errors.push(ValidationError::new(
                "server.bind",
                format!(
                    "invalid bind address '{}': expected format 'host:port'",
                    self.bind
                ),
            ));
            return errors;
        };

        match port.parse::<u16>() {
            Ok(0) => errors.push(ValidationError::new("server.bind", "port cannot be 0")),
            Err(_) => errors.push(ValidationError::new(
                "server.bind",
                format!("invalid port '{}': must be a number 1-65535", port),
            )),
            Ok(_) => {}
        }

        errors
    }
}

/// Storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding `images/` and `logs/`.
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: agrox_store::default_data_dir(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if self.data_dir.as_os_str().is_empty() {
            errors.push(ValidationError::new(
                "storage.data_dir",
                "data directory cannot be empty",
            ));
        }
        errors
    }
}

/// Longest accepted loop period in seconds.
pub const MAX_PERIOD_SECS: u64 = 3600;
/// Longest accepted capture interval in seconds (one day).
pub const MAX_CAPTURE_INTERVAL_SECS: u64 = 86_400;

/// Acquisition loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Loop period while any subsystem is enabled.
    pub active_period_secs: u64,
    /// Poll period while both subsystems are disabled.
    pub idle_period_secs: u64,
    /// Pause after a transient sensor fault.
    pub transient_backoff_secs: u64,
    /// Minimum spacing between image captures.
    pub capture_interval_secs: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            active_period_secs: 3,
            idle_period_secs: 5,
            transient_backoff_secs: 2,
            capture_interval_secs: 60,
        }
    }
}

impl AcquisitionConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        for (field, value) in [
            ("acquisition.active_period_secs", self.active_period_secs),
            ("acquisition.idle_period_secs", self.idle_period_secs),
            ("acquisition.transient_backoff_secs", self.transient_backoff_secs),
        ] {
            if value == 0 || value > MAX_PERIOD_SECS {
                errors.push(ValidationError::new(
                    field,
                    format!("{} is out of range (1-{} seconds)", value, MAX_PERIOD_SECS),
                ));
            }
        }

        if self.capture_interval_secs == 0 || self.capture_interval_secs > MAX_CAPTURE_INTERVAL_SECS
        {
            errors.push(ValidationError::new(
                "acquisition.capture_interval_secs",
                format!(
                    "{} is out of range (1-{} seconds)",
                    self.capture_interval_secs, MAX_CAPTURE_INTERVAL_SECS
                ),
            ));
        }

        errors
    }

    /// Loop periods as durations.
    pub fn periods(&self) -> AcquisitionPeriods {
        AcquisitionPeriods {
            active: Duration::from_secs(self.active_period_secs),
            idle: Duration::from_secs(self.idle_period_secs),
            transient_backoff: Duration::from_secs(self.transient_backoff_secs),
        }
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_secs(self.capture_interval_secs)
    }
}

/// Sensor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorConfig {
    /// IIO device directory. Discovered when unset.
    pub device: Option<PathBuf>,
}

/// Camera configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Set to false on units without a camera module.
    pub enabled: bool,
    /// Capture program.
    pub program: String,
    /// Upper bound for one capture.
    pub capture_timeout_secs: u64,
    /// Extra arguments for the capture program (e.g. `["--width", "1920"]`).
    pub extra_args: Vec<String>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            program: agrox_core::camera::DEFAULT_PROGRAM.to_string(),
            capture_timeout_secs: 15,
            extra_args: Vec::new(),
        }
    }
}

impl CameraConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.enabled {
            return errors;
        }
        if self.program.trim().is_empty() {
            errors.push(ValidationError::new(
                "camera.program",
                "capture program cannot be empty",
            ));
        }
        if self.capture_timeout_secs == 0 || self.capture_timeout_secs > 120 {
            errors.push(ValidationError::new(
                "camera.capture_timeout_secs",
                format!(
                    "{} is out of range (1-120 seconds)",
                    self.capture_timeout_secs
                ),
            ));
        }
        errors
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }
}

/// Highest BCM GPIO number on a Raspberry Pi.
pub const MAX_GPIO_PIN: u32 = 53;

/// Status LED configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorConfig {
    /// Set to false on units without LEDs.
    pub enabled: bool,
    pub green_pin: u32,
    pub red_pin: u32,
    pub capture_pin: u32,
    /// Blinks of the capture LED before each image.
    pub blink_count: u32,
    pub blink_delay_ms: u64,
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        let pins = IndicatorPins::default();
        let blink = BlinkPattern::default();
        Self {
            enabled: true,
            green_pin: pins.green,
            red_pin: pins.red,
            capture_pin: pins.capture,
            blink_count: blink.count,
            blink_delay_ms: blink.delay.as_millis() as u64,
        }
    }
}

impl IndicatorConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        if !self.enabled {
            return errors;
        }

        for (field, pin) in [
            ("indicator.green_pin", self.green_pin),
            ("indicator.red_pin", self.red_pin),
            ("indicator.capture_pin", self.capture_pin),
        ] {
            if pin > MAX_GPIO_PIN {
                errors.push(ValidationError::new(
                    field,
                    format!("GPIO {} does not exist (maximum {})", pin, MAX_GPIO_PIN),
                ));
            }
        }

        if self.green_pin == self.red_pin
            || self.green_pin == self.capture_pin
            || self.red_pin == self.capture_pin
        {
            errors.push(ValidationError::new(
                "indicator",
                format!(
                    "pins must be distinct (green={}, red={}, capture={})",
                    self.green_pin, self.red_pin, self.capture_pin
                ),
            ));
        }

        if self.blink_count > 20 {
            errors.push(ValidationError::new(
                "indicator.blink_count",
                format!("{} is too many blinks (maximum 20)", self.blink_count),
            ));
        }
        if self.blink_delay_ms > 2000 {
            errors.push(ValidationError::new(
                "indicator.blink_delay_ms",
                format!("{} ms is too long (maximum 2000)", self.blink_delay_ms),
            ));
        }

        errors
    }

    pub fn pins(&self) -> IndicatorPins {
        IndicatorPins {
            green: self.green_pin,
            red: self.red_pin,
            capture: self.capture_pin,
        }
    }

    pub fn blink(&self) -> BlinkPattern {
        BlinkPattern {
            count: self.blink_count,
            delay: Duration::from_millis(self.blink_delay_ms),
        }
    }
}

/// Upload server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Base URL of the upload server.
    pub server_url: String,
    /// Bound on one upload request.
    pub timeout_secs: u64,
    /// Identifier sent with every upload.
    pub machine_id: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            server_url: "http://192.168.1.26:3005".to_string(),
            timeout_secs: 30,
            machine_id: "AgroX-37".to_string(),
        }
    }
}

impl UploadConfig {
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if let Err(message) = validate_server_url(&self.server_url) {
            errors.push(ValidationError::new("upload.server_url", message));
        }
        if self.timeout_secs == 0 || self.timeout_secs > 300 {
            errors.push(ValidationError::new(
                "upload.timeout_secs",
                format!("{} is out of range (1-300 seconds)", self.timeout_secs),
            ));
        }
        if self.machine_id.trim().is_empty() {
            errors.push(ValidationError::new(
                "upload.machine_id",
                "machine id cannot be empty",
            ));
        }

        errors
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Check that `url` is an absolute http(s) URL with a host.
pub fn validate_server_url(url: &str) -> Result<(), String> {
    let rest = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
        .ok_or_else(|| format!("URL must start with http:// or https://, got: '{}'", url))?;

    let host = rest.split(['/', '?', '#']).next().unwrap_or("");
    if host.is_empty() || host.starts_with(':') {
        return Err(format!("URL '{}' has no host", url));
    }
    if host.chars().any(char::is_whitespace) {
        return Err(format!("URL '{}' contains whitespace", url));
    }
    Ok(())
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),
    #[error("Failed to write config file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Configuration validation failed:\n{}", format_validation_errors(.0))]
    Validation(Vec<ValidationError>),
}

/// A single validation error with context.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// The field path (e.g., `server.bind` or `upload.server_url`).
    pub field: String,
    /// Description of the validation failure.
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

fn format_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("agrox")
        .join("device.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_errors(config: &Config) -> Vec<String> {
        match config.validate() {
            Ok(()) => Vec::new(),
            Err(ConfigError::Validation(errors)) => errors.into_iter().map(|e| e.field).collect(),
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.server.bind, "0.0.0.0:8000");
        assert_eq!(config.acquisition.active_period_secs, 3);
        assert_eq!(config.acquisition.idle_period_secs, 5);
        assert_eq!(config.acquisition.transient_backoff_secs, 2);
        assert_eq!(config.acquisition.capture_interval_secs, 60);
        assert_eq!(config.upload.server_url, "http://192.168.1.26:3005");
        assert_eq!(config.upload.timeout_secs, 30);
        assert_eq!(config.upload.machine_id, "AgroX-37");
        assert_eq!(config.indicator.pins(), IndicatorPins::default());
        assert!(config.sensor.device.is_none());
    }

    #[test]
    fn test_default_config_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_load_nonexistent() {
        let result = Config::load("/nonexistent/path/device.toml");
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("bad.toml");
        std::fs::write(&path, "[server\nbind = ").unwrap();

        let result = Config::load(&path);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let toml = r#"
            [acquisition]
            capture_interval_secs = 300

            [camera]
            enabled = false
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.acquisition.capture_interval_secs, 300);
        assert_eq!(config.acquisition.active_period_secs, 3);
        assert!(!config.camera.enabled);
        assert_eq!(config.camera.program, "rpicam-still");
        assert_eq!(config.server.bind, "0.0.0.0:8000");
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("nested").join("device.toml");

        let mut config = Config::default();
        config.server.bind = "127.0.0.1:9000".to_string();
        config.storage.data_dir = PathBuf::from("/var/lib/agrox");
        config.sensor.device = Some(PathBuf::from("/sys/bus/iio/devices/iio:device0"));
        config.camera.extra_args = vec!["--width".into(), "1920".into()];

        config.save(&path).unwrap();
        let loaded = Config::load(&path).unwrap();
        loaded.validate().unwrap();

        assert_eq!(loaded.server.bind, "127.0.0.1:9000");
        assert_eq!(loaded.storage.data_dir, PathBuf::from("/var/lib/agrox"));
        assert_eq!(loaded.sensor.device, config.sensor.device);
        assert_eq!(loaded.camera.extra_args, vec!["--width", "1920"]);
    }

    #[test]
    fn test_server_url_override() {
        let mut config = Config::default();
        config.apply_server_url_override(Some("  https://agrox.example.org  ".into()));
        assert_eq!(config.upload.server_url, "https://agrox.example.org");

        config.apply_server_url_override(Some("   ".into()));
        assert_eq!(config.upload.server_url, "https://agrox.example.org");

        config.apply_server_url_override(None);
        assert_eq!(config.upload.server_url, "https://agrox.example.org");
    }

    #[test]
    fn test_server_bind_validation() {
        let mut config = Config::default();
        for bind in ["", "localhost", "0.0.0.0:0", "0.0.0.0:http", "0.0.0.0:70000"] {
            config.server.bind = bind.to_string();
            assert_eq!(field_errors(&config), vec!["server.bind"], "{bind:?}");
        }
        config.server.bind = "[::]:8000".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_acquisition_validation() {
        let mut config = Config::default();
        config.acquisition.active_period_secs = 0;
        config.acquisition.capture_interval_secs = 0;
        assert_eq!(
            field_errors(&config),
            vec![
                "acquisition.active_period_secs",
                "acquisition.capture_interval_secs"
            ]
        );
    }

    #[test]
    fn test_indicator_validation() {
        let mut config = Config::default();
        config.indicator.red_pin = config.indicator.green_pin;
        config.indicator.capture_pin = 99;
        let fields = field_errors(&config);
        assert!(fields.contains(&"indicator".to_string()));
        assert!(fields.contains(&"indicator.capture_pin".to_string()));

        // Disabled LEDs are not checked.
        config.indicator.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_upload_validation() {
        let mut config = Config::default();
        config.upload.server_url = "192.168.1.26:3005".to_string();
        config.upload.timeout_secs = 0;
        config.upload.machine_id = " ".to_string();
        assert_eq!(
            field_errors(&config),
            vec![
                "upload.server_url",
                "upload.timeout_secs",
                "upload.machine_id"
            ]
        );
    }

    #[test]
    fn test_validate_server_url() {
        assert!(validate_server_url("http://192.168.1.26:3005").is_ok());
        assert!(validate_server_url("https://agrox.example.org/base").is_ok());
        assert!(validate_server_url("ftp://example.org").is_err());
        assert!(validate_server_url("http://").is_err());
        assert!(validate_server_url("http://:3005").is_err());
        assert!(validate_server_url("http://bad host").is_err());
    }

    #[test]
    fn test_config_validation_error_display() {
        let mut config = Config::default();
        config.storage.data_dir = PathBuf::new();
        config.camera.program = String::new();

        let err = config.validate().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Configuration validation failed"));
        assert!(msg.contains("  - storage.data_dir: data directory cannot be empty"));
        assert!(msg.contains("  - camera.program: capture program cannot be empty"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.ends_with("agrox/device.toml"));
    }
}
