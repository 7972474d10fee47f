//! Decoded inbound status values.

use super::Address;
use std::fmt;

/// Thread type reported in the info record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadType {
    /// `0`
    Metric,
    /// `1`
    Imperial,
    /// Any other character.
    Unknown,
}

impl ThreadType {
    pub(crate) fn from_char(c: char) -> Self {
        match c {
            '0' => ThreadType::Metric,
            '1' => ThreadType::Imperial,
            _ => ThreadType::Unknown,
        }
    }
}

/// Reply to the `in` (info) request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfoStatus {
    /// Device address.
    pub address: Address,
    /// Motor type id (e.g. 14 for ELL14), keys the device registry.
    pub motor_type: u8,
    /// Serial number.
    pub serial: String,
    /// Year of manufacture.
    pub year: u16,
    /// Firmware release.
    pub firmware: String,
    /// Thread type.
    pub thread: ThreadType,
    /// Hardware release.
    pub hardware: char,
    /// Travel range (degrees for rotators, millimeters for stages).
    pub range: u32,
    /// Pulses per revolution (or per unit of travel).
    pub pulses_per_rev: u32,
}

impl fmt::Display for InfoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Address - {}", self.address)?;
        writeln!(f, "Motor Type - {}", self.motor_type)?;
        writeln!(f, "Serial No. - {}", self.serial)?;
        writeln!(f, "Year - {}", self.year)?;
        writeln!(f, "Firmware - {}", self.firmware)?;
        writeln!(f, "Thread - {:?}", self.thread)?;
        writeln!(f, "Hardware - {}", self.hardware)?;
        writeln!(f, "Range - {}", self.range)?;
        write!(f, "Pulse/Rev - {}", self.pulses_per_rev)
    }
}

/// Which position-like value a [`PositionStatus`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionCode {
    /// `PO`: current position.
    Po,
    /// `BO`
    Bo,
    /// `HO`: home offset.
    Ho,
    /// `GJ`: jog step size.
    Gj,
}

impl PositionCode {
    pub(crate) fn from_code(code: &str) -> Option<Self> {
        match code {
            "PO" => Some(PositionCode::Po),
            "BO" => Some(PositionCode::Bo),
            "HO" => Some(PositionCode::Ho),
            "GJ" => Some(PositionCode::Gj),
            _ => None,
        }
    }

    /// Wire code.
    pub fn as_str(self) -> &'static str {
        match self {
            PositionCode::Po => "PO",
            PositionCode::Bo => "BO",
            PositionCode::Ho => "HO",
            PositionCode::Gj => "GJ",
        }
    }
}

/// Reply carrying a signed 32-bit pulse count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionStatus {
    /// Device address.
    pub address: Address,
    /// Kind of position.
    pub code: PositionCode,
    /// Pulse count.
    pub position: i32,
}

/// Error codes a device reports in `GS` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DeviceErrorCode {
    /// Status OK
    Ok = 0,
    /// Communication Timeout
    CommunicationTimeout = 1,
    /// Mechanical Timeout
    MechanicalTimeout = 2,
    /// Command Error
    CommandError = 3,
    /// Value Out of Range
    ValueOutOfRange = 4,
    /// Module Isolated
    ModuleIsolated = 5,
    /// Module Out of Isolation
    ModuleOutOfIsolation = 6,
    /// Initialisation Error
    InitialisationError = 7,
    /// Thermal Error
    ThermalError = 8,
    /// Busy
    Busy = 9,
    /// Sensor Error
    SensorError = 10,
    /// Motor Error
    MotorError = 11,
    /// Out of Range
    OutOfRange = 12,
    /// Over Current Error
    OverCurrentError = 13,
    /// Anything outside the table.
    Unknown = 0xFF,
}

impl DeviceErrorCode {
    /// Map a numeric code onto the table.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::CommunicationTimeout,
            2 => Self::MechanicalTimeout,
            3 => Self::CommandError,
            4 => Self::ValueOutOfRange,
            5 => Self::ModuleIsolated,
            6 => Self::ModuleOutOfIsolation,
            7 => Self::InitialisationError,
            8 => Self::ThermalError,
            9 => Self::Busy,
            10 => Self::SensorError,
            11 => Self::MotorError,
            12 => Self::OutOfRange,
            13 => Self::OverCurrentError,
            _ => Self::Unknown,
        }
    }

    /// Human-readable message.
    pub fn message(self) -> &'static str {
        match self {
            Self::Ok => "Status OK",
            Self::CommunicationTimeout => "Communication Timeout",
            Self::MechanicalTimeout => "Mechanical Timeout",
            Self::CommandError => "Command Error",
            Self::ValueOutOfRange => "Value Out of Range",
            Self::ModuleIsolated => "Module Isolated",
            Self::ModuleOutOfIsolation => "Module Out of Isolation",
            Self::InitialisationError => "Initialisation Error",
            Self::ThermalError => "Thermal Error",
            Self::Busy => "Busy",
            Self::SensorError => "Sensor Error",
            Self::MotorError => "Motor Error",
            Self::OutOfRange => "Out of Range",
            Self::OverCurrentError => "Over Current Error",
            Self::Unknown => "Unknown Error",
        }
    }
}

/// Reply to `gs`: the device's own error register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorStatus {
    /// Device address.
    pub address: Address,
    /// Numeric error code.
    pub code: u32,
    /// Message from the error table.
    pub message: &'static str,
}

impl ErrorStatus {
    pub(crate) fn new(address: Address, code: u32) -> Self {
        Self {
            address,
            code,
            message: DeviceErrorCode::from_code(code).message(),
        }
    }

    /// Table entry for the code.
    pub fn kind(&self) -> DeviceErrorCode {
        DeviceErrorCode::from_code(self.code)
    }

    /// True for code 0.
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }
}

/// Reply to `i1`/`i2`: drive parameters of one motor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorElectricalStatus {
    /// Device address.
    pub address: Address,
    /// Motor index (1 or 2).
    pub motor: u8,
    /// Loop setting on.
    pub loop_on: bool,
    /// Motor on.
    pub motor_on: bool,
    /// Drive current in amperes.
    pub current: f64,
    /// PWM increase per millisecond.
    pub ramp_up: u16,
    /// PWM decrease per millisecond.
    pub ramp_down: u16,
    /// Forward period.
    pub forward_period: u16,
    /// Backward period.
    pub backward_period: u16,
    /// Forward frequency in Hz (absent for a zero period).
    pub forward_frequency: Option<f64>,
    /// Backward frequency in Hz (absent for a zero period).
    pub backward_frequency: Option<f64>,
}

/// Any other reply: address, code and the raw trailing text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericStatus {
    /// Device address.
    pub address: Address,
    /// Two-character reply code as received.
    pub code: String,
    /// Text following the code.
    pub payload: String,
}

/// One decoded response frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Status {
    /// `IN`
    Info(InfoStatus),
    /// `PO`, `BO`, `HO`, `GJ`
    Position(PositionStatus),
    /// `GS`
    Error(ErrorStatus),
    /// `I1`, `I2`
    MotorElectrical(MotorElectricalStatus),
    /// Everything else.
    Generic(GenericStatus),
}

impl Status {
    /// Address of the replying device.
    pub fn address(&self) -> Address {
        match self {
            Status::Info(s) => s.address,
            Status::Position(s) => s.address,
            Status::Error(s) => s.address,
            Status::MotorElectrical(s) => s.address,
            Status::Generic(s) => s.address,
        }
    }

    /// Reply code.
    pub fn code(&self) -> &str {
        match self {
            Status::Info(_) => "IN",
            Status::Position(s) => s.code.as_str(),
            Status::Error(_) => "GS",
            Status::MotorElectrical(s) if s.motor == 2 => "I2",
            Status::MotorElectrical(_) => "I1",
            Status::Generic(s) => &s.code,
        }
    }

    /// Position payload, if this is a position reply.
    pub fn as_position(&self) -> Option<&PositionStatus> {
        match self {
            Status::Position(s) => Some(s),
            _ => None,
        }
    }

    /// Device error register, if this is a `GS` reply.
    pub fn as_error(&self) -> Option<&ErrorStatus> {
        match self {
            Status::Error(s) => Some(s),
            _ => None,
        }
    }

    /// True for a `GS` reply with a non-zero code.
    pub fn is_device_error(&self) -> bool {
        self.as_error().is_some_and(|s| !s.is_ok())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Info(s) => write!(f, "{s}"),
            Status::Position(s) => write!(f, "{} {} {}", s.address, s.code.as_str(), s.position),
            Status::Error(s) => write!(f, "{} GS {} ({})", s.address, s.code, s.message),
            Status::MotorElectrical(s) => write!(
                f,
                "{} I{} loop={} motor={} current={:.3}A ramp_up={} ramp_down={} fwd_period={} bwd_period={}",
                s.address,
                s.motor,
                s.loop_on,
                s.motor_on,
                s.current,
                s.ramp_up,
                s.ramp_down,
                s.forward_period,
                s.backward_period
            ),
            Status::Generic(s) => write!(f, "{} {} {}", s.address, s.code, s.payload),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_table() {
        assert_eq!(DeviceErrorCode::from_code(0), DeviceErrorCode::Ok);
        assert_eq!(DeviceErrorCode::from_code(2).message(), "Mechanical Timeout");
        assert_eq!(DeviceErrorCode::from_code(13), DeviceErrorCode::OverCurrentError);
        assert_eq!(DeviceErrorCode::from_code(14), DeviceErrorCode::Unknown);
    }

    #[test]
    fn test_device_error_flag() {
        let addr = Address::new(0).unwrap();
        assert!(!Status::Error(ErrorStatus::new(addr, 0)).is_device_error());
        assert!(Status::Error(ErrorStatus::new(addr, 9)).is_device_error());
        let pos = Status::Position(PositionStatus {
            address: addr,
            code: PositionCode::Po,
            position: 0,
        });
        assert!(!pos.is_device_error());
        assert_eq!(pos.code(), "PO");
    }
}
