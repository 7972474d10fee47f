//! Raw command access to one addressed device.

use super::{Controller, HomeDirection};
use crate::error::{AppResult, ElliptecError};
use crate::hardware::registry::{self, DeviceDescriptor};
use crate::hardware::Calibration;
use crate::protocol::{lookup, Address, Category, InfoStatus, Payload, Status};
use std::fmt;
use tracing::{info, warn};

/// One device on a bus, identified by its address.
///
/// A `Motor` only exists once the device has answered an `info` request, so its
/// [`Calibration`] is always available.
#[derive(Debug, Clone)]
pub struct Motor {
    controller: Controller,
    address: Address,
    info: InfoStatus,
    calibration: Calibration,
}

impl Motor {
    /// Query the device at `address` and capture its calibration.
    ///
    /// Performs exactly one `info` round trip.
    ///
    /// # Errors
    /// Returns [`ElliptecError::DeviceNotFound`] when the round trip fails for any
    /// reason or the reply is not an info record.
    pub fn connect(controller: Controller, address: Address) -> AppResult<Self> {
        let not_found = |reason: String| ElliptecError::DeviceNotFound { address, reason };

        let instruction = lookup(Category::Get, "info")?;
        let info = match controller.send(address, &instruction, None) {
            Ok(Status::Info(info)) => info,
            Ok(other) => return Err(not_found(format!("unexpected reply {other}"))),
            Err(e) => return Err(not_found(e.to_string())),
        };

        let calibration = Calibration::from_info(&info);
        info!(
            address = %address,
            motor_type = info.motor_type,
            serial = %info.serial,
            model = registry::lookup(info.motor_type).map_or("unknown", |d| d.name),
            "Device connected"
        );

        Ok(Self {
            controller,
            address,
            info,
            calibration,
        })
    }

    /// Send a named instruction from the command tables.
    ///
    /// # Errors
    /// Returns [`CommandError::Unknown`](crate::error::CommandError::Unknown) without
    /// writing anything if `name` is not registered under `category`, otherwise
    /// whatever the round trip reports.
    pub fn request(
        &self,
        category: Category,
        name: &str,
        payload: Option<&Payload>,
    ) -> AppResult<Status> {
        let instruction = lookup(category, name)?;
        self.controller.send(self.address, &instruction, payload)
    }

    /// Read a value (`status`, `position`, `info`, ...).
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn get(&self, name: &str) -> AppResult<Status> {
        self.request(Category::Get, name, None)
    }

    /// Write a value.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn set(&self, name: &str, payload: impl Into<Payload>) -> AppResult<Status> {
        self.request(Category::Set, name, Some(&payload.into()))
    }

    /// Start a movement.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn movement(&self, name: &str, payload: Option<Payload>) -> AppResult<Status> {
        self.request(Category::Move, name, payload.as_ref())
    }

    /// Run an action.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn action(&self, name: &str) -> AppResult<Status> {
        self.request(Category::Do, name, None)
    }

    /// Move to the home position.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn home(&self, direction: HomeDirection) -> AppResult<Status> {
        self.movement(direction.command(), None)
    }

    /// Persist the current settings in the device.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn save_user_data(&self) -> AppResult<Status> {
        self.action("save_user_data")
    }

    /// Stop the current movement.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn stop(&self) -> AppResult<Status> {
        self.action("stop")
    }

    /// Read the device status register.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn status(&self) -> AppResult<Status> {
        self.get("status")
    }

    /// Move the device to a new bus address.
    ///
    /// The address held here changes only when the reply comes from `new_address`.
    /// Any other reply keeps the old address and is logged.
    ///
    /// # Errors
    /// See [`request`](Self::request).
    pub fn change_address(&mut self, new_address: Address) -> AppResult<Status> {
        let old_address = self.address;
        let status = self.set("address", new_address)?;

        if status.address() == new_address {
            self.address = new_address;
            self.info.address = new_address;
            info!(old = %old_address, new = %new_address, "Address changed");
        } else {
            warn!(
                old = %old_address,
                requested = %new_address,
                replied = %status.address(),
                "Address change not confirmed; keeping old address"
            );
        }
        Ok(status)
    }

    /// Current bus address.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Info record read at connect time.
    pub fn info(&self) -> &InfoStatus {
        &self.info
    }

    /// Calibration read at connect time.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Registry entry for this model, if known.
    pub fn descriptor(&self) -> Option<&'static DeviceDescriptor> {
        registry::lookup(self.info.motor_type)
    }

    /// Bus this device lives on.
    pub fn controller(&self) -> &Controller {
        &self.controller
    }
}

impl fmt::Display for Motor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.info)
    }
}
