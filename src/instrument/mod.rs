//! Device façades.
//!
//! [`Controller`] handles the wire, [`Motor`] exposes the raw command set of one
//! addressed device, and [`Device`] layers unit conversion on top. [`Shutter`]
//! covers the two-position models.
//!
//! ```no_run
//! use elliptec::adapters::SerialAdapter;
//! use elliptec::hardware::DeviceOptions;
//! use elliptec::instrument::{Controller, Rotator};
//! use elliptec::protocol::Address;
//!
//! # fn main() -> elliptec::error::AppResult<()> {
//! let controller = Controller::new(SerialAdapter::new("/dev/ttyUSB0", 9600).open()?);
//! let address = Address::new(0).unwrap();
//! let rotator = Rotator::connect(controller, address, &DeviceOptions::default())?;
//! rotator.set_angle(45.0)?;
//! println!("{:?}", rotator.get_angle()?);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod device;
pub mod motor;
pub mod shutter;

pub use controller::Controller;
pub use device::{Device, Iris, LinearStage, Rotator, Slider};
pub use motor::Motor;
pub use shutter::Shutter;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Jog direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Increasing position.
    #[default]
    Forward,
    /// Decreasing position.
    Backward,
}

impl Direction {
    /// Name of the matching `move` instruction.
    pub fn command(self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" | "fw" => Ok(Direction::Forward),
            "backward" | "bw" => Ok(Direction::Backward),
            other => Err(format!("unknown direction '{other}' (expected forward or backward)")),
        }
    }
}

/// Homing direction for rotary devices. Linear devices ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HomeDirection {
    /// `ho0`
    #[default]
    Clockwise,
    /// `ho1`
    Anticlockwise,
}

impl HomeDirection {
    /// Name of the matching `move` instruction.
    pub fn command(self) -> &'static str {
        match self {
            HomeDirection::Clockwise => "home_clockwise",
            HomeDirection::Anticlockwise => "home_anticlockwise",
        }
    }
}
