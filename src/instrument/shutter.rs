//! Two-position shutters (ELL6).
//!
//! Slot 1 is the backward end and slot 2 the forward end. A shutter is closed in
//! slot 1 and open in slot 2, unless it was mounted the other way round and
//! flagged `inverted`.

use super::{Controller, Direction, Motor};
use crate::error::AppResult;
use crate::hardware::{DeviceKind, DeviceOptions, Slots};
use crate::instrument::Device;
use crate::protocol::Address;
use std::fmt;

const CLOSED_SLOT: usize = 1;
const OPEN_SLOT: usize = 2;

/// Two-position slider used as a shutter.
#[derive(Debug, Clone)]
pub struct Shutter {
    device: Device<Slots>,
    inverted: bool,
}

impl Shutter {
    /// Connect to the shutter at `address`.
    ///
    /// # Errors
    /// Fails like [`Device::connect`].
    pub fn connect(
        controller: Controller,
        address: Address,
        options: &DeviceOptions,
    ) -> AppResult<Self> {
        Self::from_motor(Motor::connect(controller, address)?, options)
    }

    /// Wrap an already connected motor.
    ///
    /// # Errors
    /// Fails like [`Device::from_motor`].
    pub fn from_motor(motor: Motor, options: &DeviceOptions) -> AppResult<Self> {
        Ok(Self {
            device: Device::with_kind(motor, options, DeviceKind::Shutter)?,
            inverted: options.inverted,
        })
    }

    /// Whether open and closed are swapped.
    pub fn is_inverted(&self) -> bool {
        self.inverted
    }

    /// Underlying slot device.
    pub fn device(&self) -> &Device<Slots> {
        &self.device
    }

    /// Underlying motor, for raw commands.
    pub fn motor(&self) -> &Motor {
        self.device.motor()
    }

    fn open_slot(&self) -> usize {
        if self.inverted {
            CLOSED_SLOT
        } else {
            OPEN_SLOT
        }
    }

    fn closed_slot(&self) -> usize {
        if self.inverted {
            OPEN_SLOT
        } else {
            CLOSED_SLOT
        }
    }

    /// Current slot.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn get_slot(&self) -> AppResult<Option<usize>> {
        self.device.position()
    }

    /// Move to slot 1 (backward) or 2 (forward). Any other slot does nothing and
    /// yields `Ok(None)`.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn set_slot(&self, slot: usize) -> AppResult<Option<usize>> {
        match slot {
            CLOSED_SLOT => self.device.jog(Direction::Backward),
            OPEN_SLOT => self.device.jog(Direction::Forward),
            _ => Ok(None),
        }
    }

    /// Move one step.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn jog(&self, direction: Direction) -> AppResult<Option<usize>> {
        self.device.jog(direction)
    }

    /// Open the shutter.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn open(&self) -> AppResult<Option<usize>> {
        self.set_slot(self.open_slot())
    }

    /// Close the shutter.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn close(&self) -> AppResult<Option<usize>> {
        self.set_slot(self.closed_slot())
    }

    /// True when the shutter reports the open slot.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn is_open(&self) -> AppResult<bool> {
        Ok(self.get_slot()? == Some(self.open_slot()))
    }

    /// True when the shutter reports the closed slot.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn is_closed(&self) -> AppResult<bool> {
        Ok(self.get_slot()? == Some(self.closed_slot()))
    }
}

impl fmt::Display for Shutter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.device)
    }
}
