//! Device models and unit conversion.

pub mod registry;
pub mod units;

pub use registry::DeviceDescriptor;
pub use units::{
    Aperture, Calibration, ContinuousConversion, Degrees, Millimeters, Slots, UnitConversion,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Default distance (raw units) within which a position counts as being in a slot.
pub const DEFAULT_SLOT_TOLERANCE: u32 = 5;

/// How a device is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    /// Rotation mount or stage, in degrees.
    Rotator,
    /// Linear stage, in millimeters.
    Linear,
    /// Motorized iris, aperture in millimeters.
    Iris,
    /// Multi-position slider, in slots.
    Slider,
    /// Two-position shutter.
    Shutter,
}

impl DeviceKind {
    /// Lowercase name used in configuration.
    pub fn as_str(self) -> &'static str {
        match self {
            DeviceKind::Rotator => "rotator",
            DeviceKind::Linear => "linear",
            DeviceKind::Iris => "iris",
            DeviceKind::Slider => "slider",
            DeviceKind::Shutter => "shutter",
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rotator" => Ok(DeviceKind::Rotator),
            "linear" => Ok(DeviceKind::Linear),
            "iris" => Ok(DeviceKind::Iris),
            "slider" => Ok(DeviceKind::Slider),
            "shutter" => Ok(DeviceKind::Shutter),
            other => Err(format!(
                "unknown device kind '{other}' (expected rotator, linear, iris, slider or shutter)"
            )),
        }
    }
}

/// Per-device tuning that the calibration does not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceOptions {
    /// Slot matching tolerance in raw units.
    pub slot_tolerance: u32,
    /// Swap the open/closed slots of a shutter.
    pub inverted: bool,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            slot_tolerance: DEFAULT_SLOT_TOLERANCE,
            inverted: false,
        }
    }
}
