//! Conversion between raw pulse positions and physical units.
//!
//! Each device kind gets one strategy type implementing [`UnitConversion`]. A
//! strategy is built once from the [`Calibration`] read at connect time (plus
//! registry metadata for irises and sliders) and is a pure function afterwards.
//! Every conversion to a physical unit is rounded to 4 decimal digits.

use super::registry;
use super::{DeviceKind, DeviceOptions};
use crate::error::ConversionError;
use crate::protocol::{InfoStatus, PositionCode};
use std::fmt;

/// Decimal digits kept by every unit conversion.
const ROUNDING_DIGITS: i32 = 4;

fn round_units(value: f64) -> f64 {
    let scale = 10f64.powi(ROUNDING_DIGITS);
    (value * scale).round() / scale
}

/// Calibration captured from a device's info record.
///
/// Created once when a device connects; there is no way to change it afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Calibration {
    motor_type: u8,
    serial: String,
    range: u32,
    pulses_per_rev: u32,
}

impl Calibration {
    /// Capture calibration from an info record.
    pub fn from_info(info: &InfoStatus) -> Self {
        Self {
            motor_type: info.motor_type,
            serial: info.serial.clone(),
            range: info.range,
            pulses_per_rev: info.pulses_per_rev,
        }
    }

    /// Motor type id.
    pub fn motor_type(&self) -> u8 {
        self.motor_type
    }

    /// Serial number.
    pub fn serial(&self) -> &str {
        &self.serial
    }

    /// Travel range.
    pub fn range(&self) -> u32 {
        self.range
    }

    /// Pulses per revolution.
    pub fn pulses_per_rev(&self) -> u32 {
        self.pulses_per_rev
    }

    fn continuous(&self) -> Result<(f64, f64), ConversionError> {
        if self.range == 0 || self.pulses_per_rev == 0 {
            return Err(ConversionError::InvalidCalibration {
                range: self.range,
                pulses_per_rev: self.pulses_per_rev,
            });
        }
        Ok((f64::from(self.range), f64::from(self.pulses_per_rev)))
    }
}

/// Two-way conversion between raw positions and a device's unit.
pub trait UnitConversion: Sized {
    /// Physical unit (degrees, millimeters, slot number).
    type Unit: Copy + fmt::Debug + PartialEq;

    /// Kind this strategy implements.
    const KIND: DeviceKind;

    /// Build the strategy for a calibrated device.
    ///
    /// # Errors
    /// Fails when the calibration is unusable or registry metadata is missing.
    fn from_calibration(
        calibration: &Calibration,
        options: &DeviceOptions,
    ) -> Result<Self, ConversionError>;

    /// Raw position to unit; `None` when the position maps to no unit value.
    fn pos_to_unit(&self, raw: i32) -> Option<Self::Unit>;

    /// Unit to raw position.
    ///
    /// # Errors
    /// Fails when the unit value has no raw position (e.g. an unknown slot).
    fn unit_to_pos(&self, unit: Self::Unit) -> Result<i32, ConversionError>;

    /// Whether a reply with this code carries a value in this unit.
    fn reports(&self, code: PositionCode) -> bool;
}

/// Strategies for continuously positioned devices (unit is `f64`).
pub trait ContinuousConversion: UnitConversion<Unit = f64> {
    /// Allowed target interval, if the device has one.
    fn bounds(&self) -> Option<(f64, f64)> {
        None
    }

    /// True when `target` lies within [`bounds`](Self::bounds).
    fn admits(&self, target: f64) -> bool {
        match self.bounds() {
            Some((min, max)) => (min..=max).contains(&target),
            None => true,
        }
    }
}

fn continuous_reports(code: PositionCode) -> bool {
    matches!(code, PositionCode::Po | PositionCode::Ho | PositionCode::Gj)
}

/// Truncate a pulse count toward zero, refusing anything outside `i32`.
fn truncate_pulses(value: f64, pulses: f64) -> Result<i32, ConversionError> {
    let pulses = pulses.trunc();
    if !pulses.is_finite() || pulses < f64::from(i32::MIN) || pulses > f64::from(i32::MAX) {
        return Err(ConversionError::OutOfRange { value });
    }
    Ok(pulses as i32)
}

/// Rotation mounts and stages, in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Degrees {
    range: f64,
    pulses_per_rev: f64,
}

impl Degrees {
    /// Build from range (degrees per revolution) and pulses per revolution.
    ///
    /// # Errors
    /// Fails when either value is zero.
    pub fn new(range: u32, pulses_per_rev: u32) -> Result<Self, ConversionError> {
        let (range, pulses_per_rev) = calibration_values(range, pulses_per_rev)?;
        Ok(Self {
            range,
            pulses_per_rev,
        })
    }
}

impl UnitConversion for Degrees {
    type Unit = f64;
    const KIND: DeviceKind = DeviceKind::Rotator;

    fn from_calibration(calibration: &Calibration, _: &DeviceOptions) -> Result<Self, ConversionError> {
        Self::new(calibration.range, calibration.pulses_per_rev)
    }

    fn pos_to_unit(&self, raw: i32) -> Option<f64> {
        Some(round_units(f64::from(raw) / self.pulses_per_rev * self.range))
    }

    fn unit_to_pos(&self, degrees: f64) -> Result<i32, ConversionError> {
        truncate_pulses(degrees, degrees / self.range * self.pulses_per_rev)
    }

    fn reports(&self, code: PositionCode) -> bool {
        continuous_reports(code)
    }
}

impl ContinuousConversion for Degrees {}

/// Linear stages, in millimeters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Millimeters {
    range: f64,
    pulse_range: f64,
}

impl Millimeters {
    /// Build from travel range (mm) and pulses per millimeter.
    ///
    /// # Errors
    /// Fails when either value is zero.
    pub fn new(range: u32, pulses_per_rev: u32) -> Result<Self, ConversionError> {
        let (range, pulses_per_rev) = calibration_values(range, pulses_per_rev)?;
        Ok(Self {
            range,
            pulse_range: pulses_per_rev * range,
        })
    }
}

impl UnitConversion for Millimeters {
    type Unit = f64;
    const KIND: DeviceKind = DeviceKind::Linear;

    fn from_calibration(calibration: &Calibration, _: &DeviceOptions) -> Result<Self, ConversionError> {
        Self::new(calibration.range, calibration.pulses_per_rev)
    }

    fn pos_to_unit(&self, raw: i32) -> Option<f64> {
        Some(round_units(f64::from(raw) / self.pulse_range * self.range))
    }

    fn unit_to_pos(&self, millimeters: f64) -> Result<i32, ConversionError> {
        truncate_pulses(millimeters, millimeters / self.range * self.pulse_range)
    }

    fn reports(&self, code: PositionCode) -> bool {
        continuous_reports(code)
    }
}

impl ContinuousConversion for Millimeters {}

/// Motorized irises: millimeters of aperture, limited to the model's bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aperture {
    linear: Millimeters,
    min: f64,
    max: f64,
}

impl Aperture {
    /// Build from calibration values and aperture bounds.
    ///
    /// # Errors
    /// Fails when range or pulses per revolution is zero.
    pub fn new(
        range: u32,
        pulses_per_rev: u32,
        (min, max): (f64, f64),
    ) -> Result<Self, ConversionError> {
        Ok(Self {
            linear: Millimeters::new(range, pulses_per_rev)?,
            min,
            max,
        })
    }
}

impl UnitConversion for Aperture {
    type Unit = f64;
    const KIND: DeviceKind = DeviceKind::Iris;

    fn from_calibration(calibration: &Calibration, _: &DeviceOptions) -> Result<Self, ConversionError> {
        let bounds = registry::lookup(calibration.motor_type)
            .and_then(|d| d.aperture)
            .ok_or(ConversionError::MissingMetadata {
                motor_type: calibration.motor_type,
                what: "aperture bounds",
            })?;
        Self::new(calibration.range, calibration.pulses_per_rev, bounds)
    }

    fn pos_to_unit(&self, raw: i32) -> Option<f64> {
        self.linear.pos_to_unit(raw)
    }

    fn unit_to_pos(&self, aperture: f64) -> Result<i32, ConversionError> {
        self.linear.unit_to_pos(aperture)
    }

    fn reports(&self, code: PositionCode) -> bool {
        continuous_reports(code)
    }
}

impl ContinuousConversion for Aperture {
    fn bounds(&self) -> Option<(f64, f64)> {
        Some((self.min, self.max))
    }
}

/// Multi-position sliders and shutters: 1-based slot numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slots {
    positions: &'static [i32],
    tolerance: u32,
}

impl Slots {
    /// Build from the ordered slot positions and a matching tolerance in raw units.
    pub fn new(positions: &'static [i32], tolerance: u32) -> Self {
        Self {
            positions,
            tolerance,
        }
    }

    /// Number of slots.
    pub fn count(&self) -> usize {
        self.positions.len()
    }

    /// Slot nearest to `raw`, or `None` when the nearest slot is farther than the
    /// tolerance.
    pub fn pos_to_slot(&self, raw: i32) -> Option<usize> {
        let (index, distance) = self
            .positions
            .iter()
            .enumerate()
            .map(|(i, p)| (i, (i64::from(*p) - i64::from(raw)).unsigned_abs()))
            .min_by_key(|(_, distance)| *distance)?;
        if distance > u64::from(self.tolerance) {
            return None;
        }
        Some(index + 1)
    }

    /// Raw position of a 1-based slot.
    ///
    /// # Errors
    /// Returns [`ConversionError::SlotOutOfRange`] for slot 0 or past the last slot.
    pub fn slot_to_pos(&self, slot: usize) -> Result<i32, ConversionError> {
        slot.checked_sub(1)
            .and_then(|i| self.positions.get(i))
            .copied()
            .ok_or(ConversionError::SlotOutOfRange {
                slot,
                count: self.positions.len(),
            })
    }
}

impl UnitConversion for Slots {
    type Unit = usize;
    const KIND: DeviceKind = DeviceKind::Slider;

    fn from_calibration(
        calibration: &Calibration,
        options: &DeviceOptions,
    ) -> Result<Self, ConversionError> {
        let positions = registry::lookup(calibration.motor_type)
            .and_then(|d| d.positions)
            .ok_or(ConversionError::MissingMetadata {
                motor_type: calibration.motor_type,
                what: "slot positions",
            })?;
        Ok(Self::new(positions, options.slot_tolerance))
    }

    fn pos_to_unit(&self, raw: i32) -> Option<usize> {
        self.pos_to_slot(raw)
    }

    fn unit_to_pos(&self, slot: usize) -> Result<i32, ConversionError> {
        self.slot_to_pos(slot)
    }

    fn reports(&self, code: PositionCode) -> bool {
        code == PositionCode::Po
    }
}

fn calibration_values(range: u32, pulses_per_rev: u32) -> Result<(f64, f64), ConversionError> {
    Calibration {
        motor_type: 0,
        serial: String::new(),
        range,
        pulses_per_rev,
    }
    .continuous()
}
