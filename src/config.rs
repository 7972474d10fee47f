//! Configuration using Figment
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. A TOML file (`elliptec.toml` unless another path is given)
//! 3. Environment variables prefixed with `ELLIPTEC_`
//!
//! # Environment Variable Overrides
//!
//! Nested keys are separated by a double underscore:
//!
//! ```text
//! ELLIPTEC_SERIAL__PORT=/dev/ttyUSB1
//! ELLIPTEC_SERIAL__TIMEOUT=500ms
//! ELLIPTEC_DEVICE__ADDRESS=3
//! ELLIPTEC_LOGGING__LEVEL=debug
//! ```
//!
//! # Example
//!
//! ```text
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud_rate = 9600
//! timeout = "2s"
//!
//! [device]
//! address = "0"
//! kind = "rotator"
//! slot_tolerance = 5
//! inverted = false
//!
//! [logging]
//! level = "info"
//! ```

use crate::error::ConfigError;
use crate::hardware::{DeviceKind, DeviceOptions, DEFAULT_SLOT_TOLERANCE};
use crate::protocol::Address;
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// File read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "elliptec.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "ELLIPTEC_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    /// Serial link
    pub serial: SerialSettings,
    /// Device on the bus
    pub device: DeviceSettings,
    /// Logging
    pub logging: LoggingSettings,
}

/// Serial port settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialSettings {
    /// Port path (e.g. "/dev/ttyUSB0", "COM3")
    pub port: String,
    /// Baud rate; Elliptec devices use 9600
    pub baud_rate: u32,
    /// How long to wait for one complete response
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for SerialSettings {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            timeout: Duration::from_secs(2),
        }
    }
}

/// Device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    /// Bus address, one hex digit
    pub address: Address,
    /// How to drive the device; the model's usual kind when unset
    pub kind: Option<DeviceKind>,
    /// Slot matching tolerance in raw units
    pub slot_tolerance: u32,
    /// Swap open and closed on a shutter
    pub inverted: bool,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            address: Address::default(),
            kind: None,
            slot_tolerance: DEFAULT_SLOT_TOLERANCE,
            inverted: false,
        }
    }
}

impl DeviceSettings {
    /// Options handed to device constructors.
    pub fn options(&self) -> DeviceOptions {
        DeviceOptions {
            slot_tolerance: self.slot_tolerance,
            inverted: self.inverted,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Logging level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Load configuration from `elliptec.toml` (if present) and the environment.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if a source is malformed or validation fails.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file path
    ///
    /// A missing file is not an error; defaults and environment still apply.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if a source is malformed or validation fails.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Self::extract(Self::figment(path))
    }

    /// Layered providers, without extracting.
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Extract and validate settings from any figment.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if extraction or validation fails.
    pub fn extract(figment: Figment) -> Result<Self, ConfigError> {
        let settings: Self = figment.extract()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration after loading
    ///
    /// Checks:
    /// - Port is not empty
    /// - Baud rate and timeout are non-zero
    /// - Log level is valid (trace, debug, info, warn, error)
    ///
    /// # Errors
    ///
    /// Returns a ConfigError with a descriptive message for any validation failure.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.port.trim().is_empty() {
            return Err(ConfigError::Validation("Serial port must not be empty".to_string()));
        }

        if self.serial.baud_rate == 0 {
            return Err(ConfigError::Validation("Baud rate must be non-zero".to_string()));
        }

        if self.serial.timeout.is_zero() {
            return Err(ConfigError::Validation("Serial timeout must be non-zero".to_string()));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                LOG_LEVELS.join(", ")
            )));
        }

        Ok(())
    }

    /// Render as TOML.
    ///
    /// # Errors
    ///
    /// Returns a ConfigError if serialization fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Validation(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults_are_valid() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.serial.baud_rate, 9600);
        assert_eq!(settings.serial.timeout, Duration::from_secs(2));
        assert_eq!(settings.device.slot_tolerance, DEFAULT_SLOT_TOLERANCE);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(dir.path().join("absent.toml")));
        assert_eq!(Settings::extract(figment).unwrap(), Settings::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let file = write_config(
            r#"
            [serial]
            port = "COM4"
            timeout = "750ms"

            [device]
            address = "a"
            kind = "slider"
            slot_tolerance = 2

            [logging]
            level = "debug"
            "#,
        );
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file.path()));
        let settings = Settings::extract(figment).unwrap();

        assert_eq!(settings.serial.port, "COM4");
        assert_eq!(settings.serial.baud_rate, 9600);
        assert_eq!(settings.serial.timeout, Duration::from_millis(750));
        assert_eq!(settings.device.address, Address::new(10).unwrap());
        assert_eq!(settings.device.kind, Some(DeviceKind::Slider));
        assert_eq!(settings.device.options().slot_tolerance, 2);
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_invalid_address_rejected() {
        let file = write_config("[device]\naddress = \"G\"\n");
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file.path()));
        assert!(matches!(Settings::extract(figment), Err(ConfigError::Load(_))));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut settings = Settings::default();
        settings.logging.level = "verbose".to_string();
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_zero_baud_rate_rejected() {
        let mut settings = Settings::default();
        settings.serial.baud_rate = 0;
        assert!(matches!(settings.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn test_toml_output_reloads() {
        let settings = Settings {
            device: DeviceSettings {
                kind: Some(DeviceKind::Iris),
                inverted: true,
                ..DeviceSettings::default()
            },
            ..Settings::default()
        };
        let text = settings.to_toml().unwrap();
        assert!(text.contains("timeout = \"2s\""));

        let file = write_config(&text);
        let figment = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file.path()));
        assert_eq!(Settings::extract(figment).unwrap(), settings);
    }
}
