//! Transport implementations
//!
//! This module contains the [`Transport`] trait, the byte-stream boundary between
//! the protocol layer and the physical link, and its implementations.

pub mod mock_adapter;
#[cfg(feature = "instrument_serial")]
pub mod serial_adapter;

pub use mock_adapter::MockAdapter;
#[cfg(feature = "instrument_serial")]
pub use serial_adapter::SerialAdapter;

use crate::error::TransportError;

/// Blocking byte-stream transport.
///
/// A transport is owned by exactly one [`Controller`](crate::instrument::Controller).
/// Reads honour the transport's own timeout: when it elapses, `read_until` returns
/// whatever arrived so far (possibly nothing) instead of failing.
pub trait Transport {
    /// Short name for logs (e.g. the port path).
    fn name(&self) -> &str;

    /// Write all bytes.
    ///
    /// # Errors
    /// Returns a [`TransportError`] when the link is closed or the write fails.
    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// Read until `terminator` has been received or the timeout elapses.
    ///
    /// The returned bytes include the terminator when it was seen.
    ///
    /// # Errors
    /// Returns a [`TransportError`] when the link is closed or the read fails.
    fn read_until(&mut self, terminator: &[u8]) -> Result<Vec<u8>, TransportError>;

    /// Release the link. Calling it more than once is harmless.
    ///
    /// # Errors
    /// Returns a [`TransportError`] when releasing the link fails.
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}
