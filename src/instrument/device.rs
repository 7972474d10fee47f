//! Devices driven in physical units.
//!
//! [`Device`] pairs a [`Motor`] with the [`UnitConversion`] strategy of its kind.
//! Methods that report a value return `Ok(None)` when the reply does not carry one
//! in the device's unit (a `GS` error reply, say, or a slider position between
//! slots).

use super::{Controller, Direction, HomeDirection, Motor};
use crate::error::AppResult;
use crate::hardware::{
    Aperture, ContinuousConversion, Degrees, DeviceKind, DeviceOptions, Millimeters, Slots,
    UnitConversion,
};
use crate::protocol::{Address, Status};
use std::fmt;
use tracing::{debug, warn};

/// Rotation mounts and stages (ELL14, ELL18).
pub type Rotator = Device<Degrees>;
/// Linear stages (ELL17, ELL20).
pub type LinearStage = Device<Millimeters>;
/// Motorized irises (ELL15).
pub type Iris = Device<Aperture>;
/// Multi-position sliders (ELL9).
pub type Slider = Device<Slots>;

/// A device together with its unit conversion.
#[derive(Debug, Clone)]
pub struct Device<C: UnitConversion> {
    motor: Motor,
    conversion: C,
}

impl<C: UnitConversion> Device<C> {
    /// Connect to the device at `address` and set up its unit conversion.
    ///
    /// # Errors
    /// Fails with [`DeviceNotFound`](crate::error::ElliptecError::DeviceNotFound) if
    /// the device does not answer, or with a
    /// [`ConversionError`](crate::error::ConversionError) if its calibration or
    /// registry entry cannot back this unit.
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
    /// Fails with a [`ConversionError`](crate::error::ConversionError) if the
    /// motor's calibration or registry entry cannot back this unit.
    pub fn from_motor(motor: Motor, options: &DeviceOptions) -> AppResult<Self> {
        Self::with_kind(motor, options, C::KIND)
    }

    pub(crate) fn with_kind(
        motor: Motor,
        options: &DeviceOptions,
        declared: DeviceKind,
    ) -> AppResult<Self> {
        if let Some(descriptor) = motor.descriptor() {
            if descriptor.kind != declared {
                warn!(
                    address = %motor.address(),
                    model = descriptor.name,
                    expected = %descriptor.kind,
                    declared = %declared,
                    "Device kind does not match the model"
                );
            }
        }
        let conversion = C::from_calibration(motor.calibration(), options)?;
        Ok(Self { motor, conversion })
    }

    /// Underlying motor, for raw commands.
    pub fn motor(&self) -> &Motor {
        &self.motor
    }

    /// Mutable access to the underlying motor (e.g. to change its address).
    pub fn motor_mut(&mut self) -> &mut Motor {
        &mut self.motor
    }

    /// Give back the motor.
    pub fn into_motor(self) -> Motor {
        self.motor
    }

    /// Unit conversion in use.
    pub fn conversion(&self) -> &C {
        &self.conversion
    }

    /// Value a reply carries in this device's unit.
    pub fn unit_from(&self, status: &Status) -> Option<C::Unit> {
        let position = status.as_position()?;
        if !self.conversion.reports(position.code) {
            debug!(code = position.code.as_str(), "Reply carries no value in device units");
            return None;
        }
        self.conversion.pos_to_unit(position.position)
    }

    /// Current position.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn position(&self) -> AppResult<Option<C::Unit>> {
        let status = self.motor.get("position")?;
        Ok(self.unit_from(&status))
    }

    /// Move one jog step.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn jog(&self, direction: Direction) -> AppResult<Option<C::Unit>> {
        let status = self.motor.movement(direction.command(), None)?;
        Ok(self.unit_from(&status))
    }

    /// Move to the home position.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn home(&self, direction: HomeDirection) -> AppResult<Option<C::Unit>> {
        let status = self.motor.home(direction)?;
        Ok(self.unit_from(&status))
    }
}

impl<C: ContinuousConversion> Device<C> {
    /// Move to an absolute position.
    ///
    /// A target outside the device's bounds is not sent and yields `Ok(None)`.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn move_to(&self, target: f64) -> AppResult<Option<f64>> {
        if !self.conversion.admits(target) {
            warn!(
                address = %self.motor.address(),
                requested = target,
                "Target out of bounds; not moving"
            );
            return Ok(None);
        }
        let position = self.conversion.unit_to_pos(target)?;
        let status = self.motor.movement("absolute", Some(position.into()))?;
        Ok(self.unit_from(&status))
    }

    /// Move by a relative amount.
    ///
    /// Bounded devices read their position first; a shift that would leave the
    /// bounds (or from an unknown position) is not sent and yields `Ok(None)`.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn shift_by(&self, delta: f64) -> AppResult<Option<f64>> {
        if self.conversion.bounds().is_some() {
            let Some(current) = self.position()? else {
                warn!(address = %self.motor.address(), "Position unknown; not shifting");
                return Ok(None);
            };
            if !self.conversion.admits(current + delta) {
                warn!(
                    address = %self.motor.address(),
                    current,
                    delta,
                    "Shift would leave bounds; not moving"
                );
                return Ok(None);
            }
        }
        let position = self.conversion.unit_to_pos(delta)?;
        let status = self.motor.movement("relative", Some(position.into()))?;
        Ok(self.unit_from(&status))
    }

    /// Home offset.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn home_offset(&self) -> AppResult<Option<f64>> {
        let status = self.motor.get("home_offset")?;
        Ok(self.unit_from(&status))
    }

    /// Set the home offset.
    ///
    /// # Errors
    /// Propagates conversion and round trip failures.
    pub fn set_home_offset(&self, offset: f64) -> AppResult<Status> {
        let position = self.conversion.unit_to_pos(offset)?;
        self.motor.set("home_offset", position)
    }

    /// Jog step size.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn jog_step(&self) -> AppResult<Option<f64>> {
        let status = self.motor.get("stepsize")?;
        Ok(self.unit_from(&status))
    }

    /// Set the jog step size.
    ///
    /// # Errors
    /// Propagates conversion and round trip failures.
    pub fn set_jog_step(&self, step: f64) -> AppResult<Status> {
        let position = self.conversion.unit_to_pos(step)?;
        self.motor.set("stepsize", position)
    }
}

impl Rotator {
    /// Current angle in degrees.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn get_angle(&self) -> AppResult<Option<f64>> {
        self.position()
    }

    /// Rotate to an absolute angle in degrees.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn set_angle(&self, angle: f64) -> AppResult<Option<f64>> {
        self.move_to(angle)
    }

    /// Rotate by a relative angle in degrees.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn shift_angle(&self, angle: f64) -> AppResult<Option<f64>> {
        self.shift_by(angle)
    }
}

impl LinearStage {
    /// Current distance in millimeters.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn get_distance(&self) -> AppResult<Option<f64>> {
        self.position()
    }

    /// Move to an absolute distance in millimeters.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn set_distance(&self, distance: f64) -> AppResult<Option<f64>> {
        self.move_to(distance)
    }

    /// Move by a relative distance in millimeters.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn shift_distance(&self, distance: f64) -> AppResult<Option<f64>> {
        self.shift_by(distance)
    }
}

impl Iris {
    /// Current aperture in millimeters.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn get_aperture(&self) -> AppResult<Option<f64>> {
        self.position()
    }

    /// Open or close to an aperture in millimeters.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn set_aperture(&self, aperture: f64) -> AppResult<Option<f64>> {
        self.move_to(aperture)
    }

    /// Change the aperture by a relative amount in millimeters.
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn shift_aperture(&self, delta: f64) -> AppResult<Option<f64>> {
        self.shift_by(delta)
    }
}

impl Slider {
    /// Current slot (1-based).
    ///
    /// # Errors
    /// Propagates round trip failures.
    pub fn get_slot(&self) -> AppResult<Option<usize>> {
        self.position()
    }

    /// Move to a slot (1-based).
    ///
    /// # Errors
    /// Fails with [`SlotOutOfRange`](crate::error::ConversionError::SlotOutOfRange)
    /// before writing anything if the slot does not exist.
    pub fn set_slot(&self, slot: usize) -> AppResult<Option<usize>> {
        let position = self.conversion.unit_to_pos(slot)?;
        let status = self.motor.movement("absolute", Some(position.into()))?;
        Ok(self.unit_from(&status))
    }
}

impl<C: UnitConversion> fmt::Display for Device<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.motor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MockAdapter;
    use crate::error::{ConversionError, ElliptecError};
    use tracing_test::traced_test;

    // type 0E, range 360, 143360 pulses/rev
    const ELL14_INFO: &str = "2IN0E1140051720231701016800023000\r\n";
    // type 09, range 0x1F, 0x400 pulses
    const ELL9_INFO: &str = "0IN091130012320231501001F00000400\r\n";
    // type 0F, range 25 mm, 1024 pulses/mm
    const ELL15_INFO: &str = "0IN0F1150000120221301001900000400\r\n";

    fn connect<C: UnitConversion>(info: &str, responses: &[&str]) -> (Device<C>, MockAdapter) {
        let mock = MockAdapter::with_responses([info]);
        for response in responses {
            mock.push_response(response);
        }
        let address = info.chars().next().and_then(Address::from_char).unwrap();
        let device =
            Device::<C>::connect(Controller::new(mock.clone()), address, &DeviceOptions::default())
                .unwrap();
        mock.clear_written();
        (device, mock)
    }

    #[test]
    fn test_rotator_set_angle() {
        let (rotator, mock) = connect::<Degrees>(ELL14_INFO, &["2PO00004600\r\n"]);
        let angle = rotator.set_angle(45.0).unwrap();
        assert_eq!(mock.written(), vec!["2ma00004600".to_string()]);
        assert_eq!(angle, Some(45.0));
    }

    #[test]
    fn test_rotator_negative_shift() {
        let (rotator, mock) = connect::<Degrees>(ELL14_INFO, &["2PO00000000\r\n"]);
        rotator.shift_angle(-45.0).unwrap();
        assert_eq!(mock.written(), vec!["2mrFFFFBA00".to_string()]);
    }

    #[test]
    fn test_unmappable_targets_write_nothing() {
        let (rotator, mock) = connect::<Degrees>(ELL14_INFO, &[]);
        for target in [f64::NAN, 1.0e9] {
            assert!(matches!(
                rotator.set_angle(target),
                Err(ElliptecError::Conversion(ConversionError::OutOfRange { .. }))
            ));
        }
        assert!(rotator.shift_angle(f64::INFINITY).is_err());
        assert!(rotator.set_home_offset(-1.0e9).is_err());
        assert!(rotator.set_jog_step(f64::NAN).is_err());
        assert!(mock.written().is_empty());
    }

    #[test]
    fn test_home_and_step_replies() {
        let (rotator, mock) = connect::<Degrees>(
            ELL14_INFO,
            &["2HO00000000\r\n", "2GJ00002300\r\n", "2GS00\r\n"],
        );
        assert_eq!(rotator.home_offset().unwrap(), Some(0.0));
        assert_eq!(rotator.jog_step().unwrap(), Some(22.5));
        let status = rotator.set_jog_step(22.5).unwrap();
        assert!(!status.is_device_error());
        assert_eq!(mock.written(), vec!["2go", "2gj", "2sj00002300"]);
    }

    #[test]
    fn test_error_reply_is_indeterminate() {
        let (rotator, _mock) = connect::<Degrees>(ELL14_INFO, &["2GS02\r\n"]);
        assert_eq!(rotator.jog(Direction::Forward).unwrap(), None);
    }

    #[test]
    fn test_iris_out_of_bounds_writes_nothing() {
        let (iris, mock) = connect::<Aperture>(ELL15_INFO, &[]);
        assert_eq!(iris.set_aperture(30.0).unwrap(), None);
        assert_eq!(iris.set_aperture(0.5).unwrap(), None);
        assert!(mock.written().is_empty());
    }

    #[test]
    fn test_iris_shift_reads_current_aperture() {
        // at 24 mm; +2 mm would overshoot 25 mm
        let (iris, mock) = connect::<Aperture>(ELL15_INFO, &["0PO00006000\r\n"]);
        assert_eq!(iris.shift_aperture(2.0).unwrap(), None);
        assert_eq!(mock.written(), vec!["0gp".to_string()]);

        mock.clear_written();
        mock.push_response("0PO00006000\r\n");
        mock.push_response("0PO00005C00\r\n");
        assert_eq!(iris.shift_aperture(-1.0).unwrap(), Some(23.0));
        assert_eq!(mock.written(), vec!["0gp", "0mrFFFFFC00"]);
    }

    #[test]
    fn test_slider_slots() {
        let (slider, mock) = connect::<Slots>(ELL9_INFO, &["0PO00000021\r\n", "0PO00000040\r\n"]);
        assert_eq!(slider.get_slot().unwrap(), Some(2));
        assert_eq!(slider.set_slot(3).unwrap(), Some(3));
        assert_eq!(mock.written(), vec!["0gp", "0ma00000040"]);
    }

    #[test]
    fn test_slider_between_slots_is_indeterminate() {
        let (slider, _mock) = connect::<Slots>(ELL9_INFO, &["0PO000000C8\r\n"]);
        assert_eq!(slider.get_slot().unwrap(), None);
    }

    #[test]
    fn test_slider_unknown_slot_writes_nothing() {
        let (slider, mock) = connect::<Slots>(ELL9_INFO, &[]);
        let err = slider.set_slot(5).unwrap_err();
        assert!(matches!(
            err,
            ElliptecError::Conversion(ConversionError::SlotOutOfRange { slot: 5, count: 4 })
        ));
        assert!(mock.written().is_empty());
    }

    #[test]
    fn test_slider_strategy_needs_registry_positions() {
        let mock = MockAdapter::with_responses([ELL14_INFO]);
        let err = Slider::connect(
            Controller::new(mock),
            Address::new(2).unwrap(),
            &DeviceOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ElliptecError::Conversion(ConversionError::MissingMetadata { .. })));
    }

    #[test]
    #[traced_test]
    fn test_kind_mismatch_only_warns() {
        let mock = MockAdapter::with_responses([ELL14_INFO]);
        let stage = LinearStage::connect(
            Controller::new(mock),
            Address::new(2).unwrap(),
            &DeviceOptions::default(),
        );
        assert!(stage.is_ok());
        assert!(logs_contain("Device kind does not match the model"));
    }
}
