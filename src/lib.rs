//! Protocol codec and device drivers for Thorlabs Elliptec motorized stages.
//!
//! The crate is layered from the wire up:
//!
//! - [`protocol`]: frame encoding and decoding, command tables, typed replies.
//! - [`hardware`]: model registry and unit conversion strategies.
//! - [`adapters`]: byte-stream transports (serial port, in-memory mock).
//! - [`instrument`]: the request/response controller and the device façades.
//! - [`config`]: layered settings for the command-line tool.
//!
//! Everything is synchronous: each call performs one blocking round trip.

pub mod adapters;
pub mod config;
pub mod error;
pub mod hardware;
pub mod instrument;
pub mod protocol;

pub use error::{AppResult, ElliptecError};
pub use hardware::{DeviceKind, DeviceOptions};
pub use instrument::{
    Controller, Device, Direction, HomeDirection, Iris, LinearStage, Motor, Rotator, Shutter,
    Slider,
};
pub use protocol::{Address, Payload, Status};
