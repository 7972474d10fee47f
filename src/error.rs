//! Error types for the crate.
//!
//! This module defines the primary error type, `ElliptecError`, and the narrower
//! error enums it consolidates. Using the `thiserror` crate, each layer of the
//! stack reports failures with its own type while `ElliptecError` lets callers
//! propagate any of them with the `?` operator.
//!
//! ## Error Hierarchy
//!
//! - **`Transport`**: The byte stream could not be opened, written or read, or the
//!   controller was already closed. Fatal to the call, never retried.
//! - **`Decode`**: A single response line could not be parsed. Local to one call; the
//!   device state is untouched.
//! - **`Command`**: A command name is not registered in the command tables. Raised
//!   before anything is written to the wire.
//! - **`DeviceNotFound`**: The `info` round trip performed while constructing a
//!   device produced no usable answer.
//! - **`Conversion`**: A unit conversion could not be set up or applied (missing
//!   calibration or registry metadata, slot index out of range).
//! - **`Config`**: Configuration failed to load or validate.
//!
//! Error codes reported by a device itself (`GS` replies) are *not* errors here; they
//! are decoded into [`ErrorStatus`](crate::protocol::ErrorStatus) values and returned
//! as data.

use crate::protocol::Address;
use thiserror::Error;

/// Convenience alias for results using the crate error type.
pub type AppResult<T> = std::result::Result<T, ElliptecError>;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum ElliptecError {
    /// Transport failure.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Response line could not be decoded.
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Unknown command name.
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// Initial `info` request did not produce a device description.
    #[error("No device found at address {address}: {reason}")]
    DeviceNotFound {
        /// Address that was queried.
        address: Address,
        /// What went wrong during the initialization round trip.
        reason: String,
    },

    /// Unit conversion failure.
    #[error("Conversion error: {0}")]
    Conversion(#[from] ConversionError),

    /// Configuration failure.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Failures of the underlying byte stream.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The port could not be opened.
    #[error("Failed to open port '{port}': {reason}")]
    Open {
        /// Port path (e.g. "/dev/ttyUSB0").
        port: String,
        /// Reason reported by the OS or driver.
        reason: String,
    },

    /// Read or write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The controller has been closed.
    #[error("Transport is closed")]
    Closed,

    /// Another request is still using the transport.
    #[error("Transport is busy with another request")]
    Busy,
}

/// Failures while decoding one inbound frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Empty line, missing CR LF terminator, or no status code.
    #[error("Status/response may be incomplete: {0:?}")]
    Incomplete(String),

    /// First character is not a hex digit.
    #[error("Invalid address: {0:?}")]
    InvalidAddress(char),

    /// A fixed-column field is malformed or missing.
    #[error("Invalid {field} field {value:?} in frame {frame:?}")]
    InvalidField {
        /// Name of the field.
        field: &'static str,
        /// Offending text.
        value: String,
        /// Whole (stripped) frame.
        frame: String,
    },
}

/// Command table lookup failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// No instruction registered under this name for the category.
    #[error("Invalid command: {category} {name:?}")]
    Unknown {
        /// Category that was searched.
        category: crate::protocol::Category,
        /// Requested name.
        name: String,
    },
}

/// Unit conversion failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// Calibration values cannot be used for a continuous conversion.
    #[error("Invalid calibration: range {range}, pulses/rev {pulses_per_rev}")]
    InvalidCalibration {
        /// Travel range from the info record.
        range: u32,
        /// Pulses per revolution (or per unit) from the info record.
        pulses_per_rev: u32,
    },

    /// The registry has no entry of the required shape for this motor type.
    #[error("Motor type {motor_type} has no {what} in the device registry")]
    MissingMetadata {
        /// Motor type id from the info record.
        motor_type: u8,
        /// Missing piece of metadata.
        what: &'static str,
    },

    /// Slot index outside the device's slot list.
    #[error("Slot {slot} out of range (device has {count} slots)")]
    SlotOutOfRange {
        /// Requested 1-based slot.
        slot: usize,
        /// Number of slots.
        count: usize,
    },

    /// Target has no 32-bit raw position (NaN, infinite or too large).
    #[error("Value {value} does not map to a raw position")]
    OutOfRange {
        /// Requested value in device units.
        value: f64,
    },
}

/// Configuration loading and validation errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Figment failed to load or extract the configuration.
    #[error("Configuration load error: {0}")]
    Load(#[from] Box<figment::Error>),

    /// Configuration loaded but is semantically invalid.
    #[error("Configuration validation error: {0}")]
    Validation(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        ConfigError::Load(Box::new(err))
    }
}
