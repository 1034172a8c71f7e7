//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every section is optional; omitted values fall back to the
//! defaults used in the field deployment (BU-353 GPS on a Prolific adapter,
//! ES920LR modem on a Silicon Labs CP2102 bridge).

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::discovery::{RetryPolicy, DEFAULT_BY_ID_DIR};
use crate::error::{Result, TelemetryError};
use crate::protocol::is_valid_sender;
use crate::transmitter::TransmitterSettings;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default = "default_positioning_device")]
    pub positioning: DeviceConfig,
    #[serde(default = "default_radio_device")]
    pub radio: DeviceConfig,
    #[serde(default)]
    pub transmitter: TransmitterConfig,
    #[serde(default)]
    pub receiver: ReceiverConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Device discovery configuration
#[derive(Debug, Deserialize, Clone)]
pub struct DiscoveryConfig {
    #[serde(default = "default_by_id_dir")]
    pub by_id_dir: String,

    #[serde(default = "default_scan_interval_ms")]
    pub scan_interval_ms: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
}

/// Per-role serial device configuration
///
/// Both fields are required when the section is present.
#[derive(Debug, Deserialize, Clone)]
pub struct DeviceConfig {
    pub match_keyword: String,
    pub baud_rate: u32,
}

/// Field node (transmitter) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TransmitterConfig {
    /// Sender label; empty means the host name
    #[serde(default)]
    pub sender_name: String,

    #[serde(default = "default_send_interval_ms")]
    pub send_interval_ms: u64,

    #[serde(default = "default_fix_timeout_ms")]
    pub fix_timeout_ms: u64,
}

/// Diagnostic logging configuration, shared by both roles
#[derive(Debug, Deserialize, Clone, Default)]
pub struct LoggingConfig {
    /// Directory for daily rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<String>,
}

/// Base station (receiver) configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ReceiverConfig {
    #[serde(default = "default_receiver_port")]
    pub serial_port: String,

    #[serde(default = "default_radio_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Receiving antenna label; empty means the host name
    #[serde(default)]
    pub antenna: String,

    #[serde(default = "default_store_path")]
    pub store_path: String,

    #[serde(default = "default_log_path")]
    pub log_path: String,
}

// Default value functions
fn default_by_id_dir() -> String { DEFAULT_BY_ID_DIR.to_string() }
fn default_scan_interval_ms() -> u64 { 1000 }
fn default_max_attempts() -> u32 { 30 }

fn default_positioning_device() -> DeviceConfig {
    DeviceConfig { match_keyword: "Prolific".to_string(), baud_rate: 4800 }
}
fn default_radio_device() -> DeviceConfig {
    DeviceConfig { match_keyword: "Silicon_Labs".to_string(), baud_rate: default_radio_baud_rate() }
}
fn default_radio_baud_rate() -> u32 { 115_200 }

fn default_send_interval_ms() -> u64 { 1000 }
fn default_fix_timeout_ms() -> u64 { 2000 }

fn default_receiver_port() -> String { "/dev/ttyUSB0".to_string() }
fn default_read_timeout_ms() -> u64 { 1000 }
fn default_store_path() -> String { "gps_data.db".to_string() }
fn default_log_path() -> String { "gps_log_seq.csv".to_string() }

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            by_id_dir: default_by_id_dir(),
            scan_interval_ms: default_scan_interval_ms(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            discovery: DiscoveryConfig::default(),
            positioning: default_positioning_device(),
            radio: default_radio_device(),
            transmitter: TransmitterConfig::default(),
            receiver: ReceiverConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for TransmitterConfig {
    fn default() -> Self {
        Self {
            sender_name: String::new(),
            send_interval_ms: default_send_interval_ms(),
            fix_timeout_ms: default_fix_timeout_ms(),
        }
    }
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            serial_port: default_receiver_port(),
            baud_rate: default_radio_baud_rate(),
            read_timeout_ms: default_read_timeout_ms(),
            antenna: String::new(),
            store_path: default_store_path(),
            log_path: default_log_path(),
        }
    }
}

impl DiscoveryConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            scan_interval: Duration::from_millis(self.scan_interval_ms),
        }
    }
}

impl TransmitterConfig {
    /// Sender label, falling back to the host name
    pub fn sender_label(&self) -> String {
        non_empty_or_hostname(&self.sender_name)
    }

    pub fn settings(&self) -> TransmitterSettings {
        TransmitterSettings {
            sender: self.sender_label(),
            fix_timeout: Duration::from_millis(self.fix_timeout_ms),
            send_interval: Duration::from_millis(self.send_interval_ms),
        }
    }
}

impl ReceiverConfig {
    /// Antenna label, falling back to the host name
    pub fn antenna_label(&self) -> String {
        non_empty_or_hostname(&self.antenna)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn store_path(&self) -> PathBuf {
        PathBuf::from(&self.store_path)
    }

    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.log_path)
    }
}

fn non_empty_or_hostname(label: &str) -> String {
    let label = label.trim();
    if label.is_empty() {
        hostname()
    } else {
        label.to_string()
    }
}

/// Host name of this machine, or `localhost` when it cannot be read
pub fn hostname() -> String {
    fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| fs::read_to_string("/etc/hostname"))
        .map(|name| name.trim().to_string())
        .ok()
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}

fn invalid(message: impl std::fmt::Display) -> TelemetryError {
    TelemetryError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use field_telemetry::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        if self.discovery.by_id_dir.is_empty() {
            return Err(invalid("discovery by_id_dir cannot be empty"));
        }

        if self.discovery.max_attempts == 0 {
            return Err(invalid("max_attempts must be greater than 0"));
        }

        for (name, value) in [
            ("scan_interval_ms", self.discovery.scan_interval_ms),
            ("send_interval_ms", self.transmitter.send_interval_ms),
            ("fix_timeout_ms", self.transmitter.fix_timeout_ms),
            ("read_timeout_ms", self.receiver.read_timeout_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(invalid(format!("{} must be between 1 and 60000", name)));
            }
        }

        for (role, device) in [("positioning", &self.positioning), ("radio", &self.radio)] {
            if device.match_keyword.trim().is_empty() {
                return Err(invalid(format!("{} match_keyword cannot be empty", role)));
            }
            if device.baud_rate == 0 {
                return Err(invalid(format!("{} baud_rate must be greater than 0", role)));
            }
        }

        if !is_valid_sender(&self.transmitter.sender_name) {
            return Err(invalid("transmitter sender_name cannot contain ',', CR or LF"));
        }

        if self.receiver.serial_port.is_empty() {
            return Err(invalid("receiver serial_port cannot be empty"));
        }

        if self.receiver.baud_rate == 0 {
            return Err(invalid("receiver baud_rate must be greater than 0"));
        }

        if self.receiver.store_path.is_empty() || self.receiver.log_path.is_empty() {
            return Err(invalid("receiver store_path and log_path cannot be empty"));
        }

        if matches!(&self.logging.log_dir, Some(dir) if dir.is_empty()) {
            return Err(invalid("logging log_dir cannot be empty when set"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_valid_config() -> Config {
        Config::default()
    }

    #[test]
    fn test_default_config() {
        assert!(create_valid_config().validate().is_ok());
    }

    #[test]
    fn test_field_deployment_defaults() {
        let config = create_valid_config();
        assert_eq!(config.positioning.match_keyword, "Prolific");
        assert_eq!(config.positioning.baud_rate, 4800);
        assert_eq!(config.radio.match_keyword, "Silicon_Labs");
        assert_eq!(config.radio.baud_rate, 115_200);
        assert_eq!(config.discovery.retry_policy(), RetryPolicy::default());
        assert_eq!(config.transmitter.settings().send_interval, Duration::from_secs(1));
        assert_eq!(config.transmitter.settings().fix_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[discovery]
max_attempts = 5

[positioning]
match_keyword = "u-blox"
baud_rate = 9600

[transmitter]
sender_name = "broad"

[receiver]
antenna = "roof"
store_path = "/var/lib/field/gps.db"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.discovery.max_attempts, 5);
        assert_eq!(config.discovery.scan_interval_ms, 1000);
        assert_eq!(config.positioning.match_keyword, "u-blox");
        assert_eq!(config.radio.match_keyword, "Silicon_Labs");
        assert_eq!(config.transmitter.sender_label(), "broad");
        assert_eq!(config.receiver.antenna_label(), "roof");
        assert_eq!(config.receiver.store_path(), PathBuf::from("/var/lib/field/gps.db"));
        assert_eq!(config.receiver.log_path(), PathBuf::from("gps_log_seq.csv"));
    }

    #[test]
    fn test_load_empty_file_uses_defaults() {
        let temp_file = tempfile::NamedTempFile::new().unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.receiver.serial_port, "/dev/ttyUSB0");
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/default.toml");
        let config = Config::load(path).unwrap();
        let defaults = Config::default();

        assert_eq!(config.discovery.by_id_dir, defaults.discovery.by_id_dir);
        assert_eq!(config.discovery.retry_policy(), defaults.discovery.retry_policy());
        assert_eq!(config.positioning.match_keyword, defaults.positioning.match_keyword);
        assert_eq!(config.radio.baud_rate, defaults.radio.baud_rate);
        assert_eq!(config.logging.log_dir, None);
        assert_eq!(config.receiver.store_path, defaults.receiver.store_path);
        assert_eq!(config.receiver.log_path, defaults.receiver.log_path);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/field-telemetry.toml");
        assert!(matches!(result, Err(TelemetryError::Io(_))));
    }

    #[test]
    fn test_load_malformed_toml() {
        use std::io::Write;

        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file.write_all(b"[discovery\nmax_attempts = ").unwrap();
        let result = Config::load(temp_file.path());
        assert!(matches!(result, Err(TelemetryError::Config(_))));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = create_valid_config();
        config.discovery.max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_interval_bounds() {
        let mut config = create_valid_config();
        config.transmitter.send_interval_ms = 0;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.transmitter.fix_timeout_ms = 60001;
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.receiver.read_timeout_ms = 60000;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_keyword_rejected() {
        let mut config = create_valid_config();
        config.radio.match_keyword = "  ".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("radio match_keyword"));
    }

    #[test]
    fn test_zero_baud_rate_rejected() {
        let mut config = create_valid_config();
        config.positioning.baud_rate = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_receiver_paths_rejected() {
        let mut config = create_valid_config();
        config.receiver.log_path = String::new();
        assert!(config.validate().is_err());

        let mut config = create_valid_config();
        config.receiver.serial_port = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_log_dir_rejected() {
        let mut config = create_valid_config();
        config.logging.log_dir = Some(String::new());
        assert!(config.validate().is_err());

        config.logging.log_dir = Some("/var/log/field".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_sender_name_with_separator_rejected() {
        for name in ["node,A", "node\rA", "node\nA"] {
            let mut config = create_valid_config();
            config.transmitter.sender_name = name.to_string();
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("sender_name"), "{:?}", name);
        }
    }

    #[test]
    fn test_logging_section_loaded() {
        use std::io::Write;

        let mut temp_file = tempfile::NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[logging]\nlog_dir = \"/var/log/field-telemetry\"\n")
            .unwrap();
        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.logging.log_dir.as_deref(), Some("/var/log/field-telemetry"));
    }

    #[test]
    fn test_blank_labels_fall_back_to_hostname() {
        let config = create_valid_config();
        let host = hostname();
        assert!(!host.is_empty());
        assert_eq!(config.transmitter.sender_label(), host);
        assert_eq!(config.receiver.antenna_label(), host);
    }
}
