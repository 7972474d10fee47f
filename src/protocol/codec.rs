//! Frame encoder and decoder.
//!
//! Outbound frames are `address + code + argument + payload`; integer payloads are
//! rendered as 8 uppercase hex digits in two's complement. Inbound frames end with
//! CR LF and are decoded column by column according to their two-character reply
//! code.

use super::commands::Instruction;
use super::status::{
    ErrorStatus, GenericStatus, InfoStatus, MotorElectricalStatus, PositionCode, PositionStatus,
    Status, ThreadType,
};
use super::{Address, Payload};
use crate::error::DecodeError;
use std::ops::Range;

/// Terminator of every inbound frame.
pub const TERMINATOR: &[u8] = b"\r\n";

/// 1 A of drive current equals this many points in `I1`/`I2` replies.
const CURRENT_POINTS_PER_AMP: f64 = 1866.0;

/// Frequency = this constant / period, for `I1`/`I2` replies.
const PERIOD_CLOCK_HZ: f64 = 14_740_000.0;

/// Minimum stripped length of an `IN` frame.
const INFO_MIN_LEN: usize = 29;

/// Stripped length of an `I1`/`I2` frame.
const MOTOR_INFO_LEN: usize = 25;

/// Encode an outbound frame.
///
/// No range validation is performed; the caller chooses the payload.
pub fn encode(address: Address, instruction: &Instruction, payload: Option<&Payload>) -> Vec<u8> {
    let mut frame = String::with_capacity(16);
    frame.push(address.as_char());
    frame.push_str(instruction.code);
    if let Some(argument) = instruction.argument {
        frame.push_str(argument);
    }
    match payload {
        Some(Payload::Int(value)) => frame.push_str(&encode_payload(*value)),
        Some(Payload::Raw(text)) => frame.push_str(text),
        None => {}
    }
    frame.into_bytes()
}

/// Render an integer as 8 zero-padded uppercase hex digits (two's complement).
pub fn encode_payload(value: i32) -> String {
    format!("{:08X}", value as u32)
}

/// Decode a hex position field (1 to 8 digits) as a signed 32-bit value.
///
/// # Errors
/// Returns [`DecodeError::InvalidField`] for empty, over-long or non-hex input.
pub fn decode_position(hex: &str) -> Result<i32, DecodeError> {
    let raw = parse_hex("position", hex, hex)?;
    // Values >= 2^31 wrap to raw - 2^32
    Ok(raw as i32)
}

/// Decode one raw response line into a [`Status`].
///
/// # Errors
/// - [`DecodeError::Incomplete`] for an empty line, a line without CR LF, or a frame
///   too short to carry a reply code.
/// - [`DecodeError::InvalidAddress`] when the first character is not a hex digit.
/// - [`DecodeError::InvalidField`] when a fixed-column field is malformed.
pub fn decode(raw: &[u8]) -> Result<Status, DecodeError> {
    if raw.is_empty() || !raw.ends_with(TERMINATOR) {
        return Err(DecodeError::Incomplete(String::from_utf8_lossy(raw).into_owned()));
    }

    // The address byte is checked before the rest of the frame
    let first = raw
        .iter()
        .copied()
        .find(|byte| !byte.is_ascii_whitespace())
        .map(char::from)
        .ok_or_else(|| DecodeError::Incomplete(String::from_utf8_lossy(raw).into_owned()))?;
    let address = Address::from_char(first).ok_or(DecodeError::InvalidAddress(first))?;

    let text = std::str::from_utf8(raw).map_err(|_| {
        let lossy = String::from_utf8_lossy(raw).trim().to_string();
        DecodeError::InvalidField {
            field: "frame",
            value: lossy.clone(),
            frame: lossy,
        }
    })?;
    let msg = text.trim();

    if !msg.is_ascii() {
        return Err(DecodeError::InvalidField {
            field: "frame",
            value: msg.to_string(),
            frame: msg.to_string(),
        });
    }
    if msg.len() < 3 {
        return Err(DecodeError::Incomplete(text.to_string()));
    }

    let frame = Frame { text: msg };
    let raw_code = &msg[1..3];
    let code = raw_code.to_ascii_uppercase();

    match code.as_str() {
        "IN" => frame.info(address).map(Status::Info),
        "GS" => {
            let value = frame.hex("error code", 3..msg.len())?;
            Ok(Status::Error(ErrorStatus::new(address, value)))
        }
        "I1" | "I2" => {
            let motor = if code == "I2" { 2 } else { 1 };
            frame.motor_info(address, motor).map(Status::MotorElectrical)
        }
        other => match PositionCode::from_code(other) {
            Some(position_code) => {
                let position = decode_position_field(&frame, 3..msg.len())?;
                Ok(Status::Position(PositionStatus {
                    address,
                    code: position_code,
                    position,
                }))
            }
            None => Ok(Status::Generic(GenericStatus {
                address,
                code: raw_code.to_string(),
                payload: msg[3..].to_string(),
            })),
        },
    }
}

fn decode_position_field(frame: &Frame<'_>, range: Range<usize>) -> Result<i32, DecodeError> {
    Ok(frame.hex("position", range)? as i32)
}

fn parse_hex(field: &'static str, value: &str, frame: &str) -> Result<u32, DecodeError> {
    let valid = !value.is_empty()
        && value.len() <= 8
        && value.bytes().all(|b| b.is_ascii_hexdigit());
    let invalid = || DecodeError::InvalidField {
        field,
        value: value.to_string(),
        frame: frame.to_string(),
    };
    if !valid {
        return Err(invalid());
    }
    u32::from_str_radix(value, 16).map_err(|_| invalid())
}

/// Stripped, ASCII-only frame with fixed-column accessors.
struct Frame<'a> {
    text: &'a str,
}

impl<'a> Frame<'a> {
    fn invalid(&self, field: &'static str, value: &str) -> DecodeError {
        DecodeError::InvalidField {
            field,
            value: value.to_string(),
            frame: self.text.to_string(),
        }
    }

    fn field(&self, name: &'static str, range: Range<usize>) -> Result<&'a str, DecodeError> {
        self.text.get(range).ok_or_else(|| self.invalid(name, ""))
    }

    fn char_at(&self, name: &'static str, index: usize) -> Result<char, DecodeError> {
        self.text
            .as_bytes()
            .get(index)
            .map(|b| char::from(*b))
            .ok_or_else(|| self.invalid(name, ""))
    }

    fn hex(&self, name: &'static str, range: Range<usize>) -> Result<u32, DecodeError> {
        let value = self.field(name, range)?;
        parse_hex(name, value, self.text)
    }

    fn hex_u16(&self, name: &'static str, range: Range<usize>) -> Result<u16, DecodeError> {
        let value = self.hex(name, range.clone())?;
        u16::try_from(value).map_err(|_| self.invalid(name, self.text.get(range).unwrap_or("")))
    }

    fn info(&self, address: Address) -> Result<InfoStatus, DecodeError> {
        if self.text.len() < INFO_MIN_LEN {
            return Err(self.invalid("info", self.text));
        }

        let motor_type = self.hex("motor type", 3..5)? as u8;
        let serial = self.field("serial", 5..13)?.to_string();
        let year_text = self.field("year", 13..17)?;
        let year = if year_text.bytes().all(|b| b.is_ascii_digit()) {
            year_text
                .parse::<u16>()
                .map_err(|_| self.invalid("year", year_text))?
        } else {
            return Err(self.invalid("year", year_text));
        };
        let firmware = self.field("firmware", 17..19)?.to_string();
        let thread = ThreadType::from_char(self.char_at("thread", 19)?);
        let hardware = self.char_at("hardware", 20)?;
        let range = self.hex("range", 21..25)?;
        let pulses_per_rev = self.hex("pulses/rev", 25..self.text.len())?;

        Ok(InfoStatus {
            address,
            motor_type,
            serial,
            year,
            firmware,
            thread,
            hardware,
            range,
            pulses_per_rev,
        })
    }

    fn motor_info(&self, address: Address, motor: u8) -> Result<MotorElectricalStatus, DecodeError> {
        if self.text.len() < MOTOR_INFO_LEN {
            return Err(self.invalid("motor info", self.text));
        }

        let loop_on = self.char_at("loop", 3)? == '1';
        let motor_on = self.char_at("motor", 4)? == '1';
        let current = f64::from(self.hex("current", 5..9)?) / CURRENT_POINTS_PER_AMP;
        let ramp_up = self.hex_u16("ramp up", 9..13)?;
        let ramp_down = self.hex_u16("ramp down", 13..17)?;
        let forward_period = self.hex_u16("forward period", 17..21)?;
        let backward_period = self.hex_u16("backward period", 21..25)?;

        Ok(MotorElectricalStatus {
            address,
            motor,
            loop_on,
            motor_on,
            current,
            ramp_up,
            ramp_down,
            forward_period,
            backward_period,
            forward_frequency: frequency(forward_period),
            backward_frequency: frequency(backward_period),
        })
    }
}

fn frequency(period: u16) -> Option<f64> {
    (period != 0).then(|| PERIOD_CLOCK_HZ / f64::from(period))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::commands::{lookup, Category};
    use crate::protocol::status::DeviceErrorCode;
    use rand::Rng;

    fn addr(c: char) -> Address {
        Address::from_char(c).unwrap()
    }

    #[test]
    fn test_encode_payload_examples() {
        assert_eq!(encode_payload(5), "00000005");
        assert_eq!(encode_payload(-1), "FFFFFFFF");
        assert_eq!(encode_payload(0x2000), "00002000");
        assert_eq!(encode_payload(i32::MIN), "80000000");
    }

    #[test]
    fn test_payload_round_trip() {
        let edges = [0, 1, -1, 5, 31, -31, 143_360, -143_360, i32::MAX, i32::MIN];
        for v in edges {
            assert_eq!(decode_position(&encode_payload(v)).unwrap(), v);
        }

        let mut rng = rand::thread_rng();
        for _ in 0..1000 {
            let v: i32 = rng.gen();
            assert_eq!(decode_position(&encode_payload(v)).unwrap(), v, "value {v}");
        }
    }

    #[test]
    fn test_encode_frames() {
        let gp = lookup(Category::Get, "position").unwrap();
        assert_eq!(encode(addr('0'), &gp, None), b"0gp");

        let ma = lookup(Category::Move, "absolute").unwrap();
        assert_eq!(
            encode(addr('2'), &ma, Some(&Payload::Int(17920))),
            b"2ma00004600"
        );

        let mr = lookup(Category::Move, "relative").unwrap();
        assert_eq!(encode(addr('a'), &mr, Some(&Payload::Int(-1))), b"AmrFFFFFFFF");

        let ca = lookup(Category::Set, "address").unwrap();
        assert_eq!(encode(addr('0'), &ca, Some(&Payload::from("3"))), b"0ca3");

        let home = lookup(Category::Move, "home_anticlockwise").unwrap();
        assert_eq!(encode(addr('1'), &home, None), b"1ho1");
    }

    #[test]
    fn test_decode_info() {
        let status = decode(b"2IN0E1140051720231701016800023000\r\n").unwrap();
        let Status::Info(info) = status else {
            panic!("expected info, got {status:?}");
        };
        assert_eq!(info.address, addr('2'));
        assert_eq!(info.motor_type, 14);
        assert_eq!(info.serial, "11400517");
        assert_eq!(info.year, 2023);
        assert_eq!(info.firmware, "17");
        assert_eq!(info.thread, ThreadType::Metric);
        assert_eq!(info.hardware, '1');
        assert_eq!(info.range, 360);
        assert_eq!(info.pulses_per_rev, 143_360);
    }

    #[test]
    fn test_decode_info_imperial_short_pulses_field() {
        let status = decode(b"0IN091234567820191511001F0400\r\n").unwrap();
        let Status::Info(info) = status else {
            panic!("expected info, got {status:?}");
        };
        assert_eq!(info.motor_type, 9);
        assert_eq!(info.thread, ThreadType::Imperial);
        assert_eq!(info.range, 0x1F);
        assert_eq!(info.pulses_per_rev, 0x400);
    }

    #[test]
    fn test_decode_info_rejects_bad_fields() {
        // non-hex range column
        let err = decode(b"2IN0E114005172023170101ZZ00023000\r\n").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "range", .. }));

        // truncated record
        let err = decode(b"2IN0E11400517\r\n").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "info", .. }));
    }

    #[test]
    fn test_decode_positions() {
        let status = decode(b"0PO00002000\r\n").unwrap();
        assert_eq!(
            status,
            Status::Position(PositionStatus {
                address: addr('0'),
                code: PositionCode::Po,
                position: 0x2000,
            })
        );

        let status = decode(b"3POFFFFFFFF\r\n").unwrap();
        assert_eq!(status.as_position().unwrap().position, -1);

        let status = decode(b"1HO00000100\r\n").unwrap();
        assert_eq!(status.as_position().unwrap().code, PositionCode::Ho);

        let status = decode(b"1GJ00004600\r\n").unwrap();
        assert_eq!(status.as_position().unwrap().code, PositionCode::Gj);
        assert_eq!(status.as_position().unwrap().position, 17920);

        let status = decode(b"1BO80000000\r\n").unwrap();
        assert_eq!(status.as_position().unwrap().position, i32::MIN);
    }

    #[test]
    fn test_decode_position_rejects_garbage() {
        let err = decode(b"0POXYZ\r\n").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "position", .. }));

        let err = decode(b"0PO\r\n").unwrap_err();
        assert!(matches!(err, DecodeError::InvalidField { field: "position", .. }));
    }

    #[test]
    fn test_decode_error_status() {
        let status = decode(b"0GS00\r\n").unwrap();
        let err = status.as_error().unwrap();
        assert!(err.is_ok());
        assert_eq!(err.message, "Status OK");

        let status = decode(b"0GS0C\r\n").unwrap();
        let err = status.as_error().unwrap();
        assert_eq!(err.code, 12);
        assert_eq!(err.kind(), DeviceErrorCode::OutOfRange);
        assert_eq!(err.message, "Out of Range");
    }

    #[test]
    fn test_decode_motor_info() {
        // loop on, motor on, current 0x074A = 1866 -> 1 A, period 0x0096 = 150
        let status = decode(b"0I111074A000F000F00960000\r\n").unwrap();
        let Status::MotorElectrical(info) = status else {
            panic!("expected motor info, got {status:?}");
        };
        assert_eq!(info.motor, 1);
        assert!(info.loop_on);
        assert!(info.motor_on);
        assert!((info.current - 1.0).abs() < 1e-9);
        assert_eq!(info.ramp_up, 15);
        assert_eq!(info.ramp_down, 15);
        assert_eq!(info.forward_period, 150);
        let f = info.forward_frequency.unwrap();
        assert!((f - 14_740_000.0 / 150.0).abs() < 1e-6);
        assert_eq!(info.backward_frequency, None);

        let status = decode(b"0I201074A000F000F00960096\r\n").unwrap();
        assert_eq!(status.code(), "I2");
    }

    #[test]
    fn test_decode_generic() {
        let status = decode(b"0GV3C\r\n").unwrap();
        assert_eq!(
            status,
            Status::Generic(GenericStatus {
                address: addr('0'),
                code: "GV".to_string(),
                payload: "3C".to_string(),
            })
        );
    }

    #[test]
    fn test_decode_lowercase_code() {
        let status = decode(b"0po0000001F\r\n").unwrap();
        assert_eq!(status.as_position().unwrap().position, 31);
    }

    #[test]
    fn test_decode_incomplete() {
        assert!(matches!(decode(b""), Err(DecodeError::Incomplete(_))));
        assert!(matches!(decode(b"0PO00002000"), Err(DecodeError::Incomplete(_))));
        assert!(matches!(decode(b"0PO00002000\r"), Err(DecodeError::Incomplete(_))));
        assert!(matches!(decode(b"\r\n"), Err(DecodeError::Incomplete(_))));
        assert!(matches!(decode(b"0P\r\n"), Err(DecodeError::Incomplete(_))));
    }

    #[test]
    fn test_decode_invalid_address() {
        assert_eq!(
            decode(b"XPO00002000\r\n").unwrap_err(),
            DecodeError::InvalidAddress('X')
        );
        // address is checked before the frame is read as text
        assert_eq!(
            decode(b"XPO\xff\r\n").unwrap_err(),
            DecodeError::InvalidAddress('X')
        );
        assert!(matches!(
            decode(b"0PO\xff\r\n"),
            Err(DecodeError::InvalidField { field: "frame", .. })
        ));
    }
}
