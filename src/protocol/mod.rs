//! Elliptec ASCII wire protocol.
//!
//! Reference: ELLx modules protocol manual
//!
//! Protocol Overview:
//! - Outbound: `[Address][Command][Data (optional)]`, ASCII encoded, no terminator
//! - Inbound: `[Address][Status code][Data]\r\n`
//! - Address: 0-9, A-F (usually '0' for the first device on the bus)
//! - Encoding: integer data as 32-bit two's complement, 8 uppercase hex digits
//! - Timing: half-duplex request-response

pub mod codec;
pub mod commands;
pub mod status;

pub use codec::{decode, decode_position, encode, encode_payload, TERMINATOR};
pub use commands::{lookup, Category, Instruction};
pub use status::{
    DeviceErrorCode, ErrorStatus, GenericStatus, InfoStatus, MotorElectricalStatus, PositionCode,
    PositionStatus, Status, ThreadType,
};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Bus address of one device: a single hex digit `0..=F`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(try_from = "AddressRepr", into = "String")]
pub struct Address(u8);

/// Text that is not a single hex digit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid device address {0:?}: expected one hex digit 0-F")]
pub struct InvalidAddress(pub String);

impl Address {
    /// Build an address from its numeric value (0..=15).
    pub const fn new(value: u8) -> Option<Self> {
        if value < 16 {
            Some(Self(value))
        } else {
            None
        }
    }

    /// Parse an address from a hex character (either case).
    pub fn from_char(c: char) -> Option<Self> {
        c.to_digit(16).map(|d| Self(d as u8))
    }

    /// Numeric value.
    pub fn value(self) -> u8 {
        self.0
    }

    /// Uppercase hex character used on the wire.
    pub fn as_char(self) -> char {
        HEX_DIGITS[usize::from(self.0)] as char
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

impl FromStr for Address {
    type Err = InvalidAddress;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_char(c).ok_or_else(|| InvalidAddress(s.to_string())),
            _ => Err(InvalidAddress(s.to_string())),
        }
    }
}

/// Addresses arrive as text ("A") from files, or as numbers from environment
/// overrides such as `ELLIPTEC_DEVICE__ADDRESS=3`.
#[derive(Deserialize)]
#[serde(untagged)]
enum AddressRepr {
    Text(String),
    Number(u64),
}

impl TryFrom<AddressRepr> for Address {
    type Error = InvalidAddress;

    fn try_from(value: AddressRepr) -> Result<Self, Self::Error> {
        match value {
            AddressRepr::Text(text) => text.parse(),
            AddressRepr::Number(n) => u8::try_from(n)
                .ok()
                .and_then(Address::new)
                .ok_or_else(|| InvalidAddress(n.to_string())),
        }
    }
}

impl TryFrom<String> for Address {
    type Error = InvalidAddress;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.as_char().to_string()
    }
}

/// Optional data appended to an outbound frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// Signed integer, sent as 8 hex digits (two's complement).
    Int(i32),
    /// Text sent verbatim.
    Raw(String),
}

impl From<i32> for Payload {
    fn from(value: i32) -> Self {
        Payload::Int(value)
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Payload::Raw(value.to_string())
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Payload::Raw(value)
    }
}

impl From<Address> for Payload {
    fn from(address: Address) -> Self {
        Payload::Raw(address.to_string())
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Int(value) => f.write_str(&encode_payload(*value)),
            Payload::Raw(text) => f.write_str(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_parsing() {
        assert_eq!("0".parse::<Address>().unwrap().value(), 0);
        assert_eq!("a".parse::<Address>().unwrap().value(), 10);
        assert_eq!("F".parse::<Address>().unwrap().as_char(), 'F');
        assert!("G".parse::<Address>().is_err());
        assert!("10".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn test_address_bounds() {
        assert!(Address::new(15).is_some());
        assert!(Address::new(16).is_none());
        assert_eq!(Address::new(11).unwrap().to_string(), "B");
    }

    #[test]
    fn test_payload_display() {
        assert_eq!(Payload::from(5).to_string(), "00000005");
        assert_eq!(Payload::from(-1).to_string(), "FFFFFFFF");
        assert_eq!(Payload::from("3").to_string(), "3");
    }
}
