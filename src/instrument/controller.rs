//! Request/response handling over one transport.
//!
//! A [`Controller`] owns the transport of one bus and performs the
//! encode → write → read → decode round trip for every device on it. Handles are
//! cheap to clone; all clones talk to the same bus, one request at a time.

use crate::adapters::Transport;
use crate::error::{AppResult, TransportError};
use crate::protocol::{decode, encode, Address, Instruction, Payload, Status, TERMINATOR};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use tracing::{debug, warn};

#[cfg(feature = "instrument_serial")]
use crate::adapters::SerialAdapter;
#[cfg(feature = "instrument_serial")]
use crate::config::SerialSettings;

struct Link {
    transport: Option<Box<dyn Transport>>,
    last_response: Option<Vec<u8>>,
    last_status: Option<Status>,
}

impl Drop for Link {
    fn drop(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.close() {
                warn!(transport = transport.name(), error = %e, "Failed to close transport on drop");
            }
        }
    }
}

/// Shared handle to one bus.
#[derive(Clone)]
pub struct Controller {
    name: Rc<str>,
    link: Rc<RefCell<Link>>,
}

impl Controller {
    /// Take ownership of a transport.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::from_boxed(Box::new(transport))
    }

    /// Take ownership of a boxed transport.
    pub fn from_boxed(transport: Box<dyn Transport>) -> Self {
        Self {
            name: Rc::from(transport.name()),
            link: Rc::new(RefCell::new(Link {
                transport: Some(transport),
                last_response: None,
                last_status: None,
            })),
        }
    }

    /// Open a serial port with the given settings.
    ///
    /// # Errors
    /// Returns [`TransportError::Open`] if the port cannot be opened.
    #[cfg(feature = "instrument_serial")]
    pub fn open_serial(settings: &SerialSettings) -> AppResult<Self> {
        let adapter = SerialAdapter::from_settings(settings).open()?;
        Ok(Self::new(adapter))
    }

    /// Transport name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// False once [`close`](Self::close) has been called.
    pub fn is_open(&self) -> bool {
        self.link
            .try_borrow()
            .map(|link| link.transport.is_some())
            .unwrap_or(true)
    }

    /// Send one instruction and decode the reply.
    ///
    /// Exactly one frame is written and one line read. Nothing is retried.
    ///
    /// # Errors
    /// - [`TransportError::Closed`] after [`close`](Self::close).
    /// - [`TransportError::Busy`] if another request on this bus is in progress.
    /// - Any transport failure while writing or reading.
    /// - A [`DecodeError`](crate::error::DecodeError) when the reply cannot be parsed
    ///   (including an empty reply after a timeout).
    pub fn send(
        &self,
        address: Address,
        instruction: &Instruction,
        payload: Option<&Payload>,
    ) -> AppResult<Status> {
        let mut link = self
            .link
            .try_borrow_mut()
            .map_err(|_| TransportError::Busy)?;
        let transport = link.transport.as_mut().ok_or(TransportError::Closed)?;

        let frame = encode(address, instruction, payload);
        debug!(
            address = %address,
            command = %String::from_utf8_lossy(&frame),
            "TX"
        );
        transport.write(&frame)?;

        let raw = transport.read_until(TERMINATOR)?;
        debug!(
            address = %address,
            response = %String::from_utf8_lossy(&raw).trim_end(),
            "RX"
        );

        let decoded = decode(&raw);
        link.last_response = Some(raw);
        match decoded {
            Ok(status) => {
                link.last_status = Some(status.clone());
                Ok(status)
            }
            Err(e) => {
                warn!(
                    address = %address,
                    command = instruction.name,
                    error = %e,
                    "Could not decode response"
                );
                Err(e.into())
            }
        }
    }

    /// Raw bytes of the most recent reply, as text.
    pub fn last_response(&self) -> Option<String> {
        let link = self.link.try_borrow().ok()?;
        link.last_response
            .as_deref()
            .map(|raw| String::from_utf8_lossy(raw).into_owned())
    }

    /// Most recent successfully decoded reply.
    pub fn last_status(&self) -> Option<Status> {
        self.link.try_borrow().ok()?.last_status.clone()
    }

    /// Release the transport. Further requests fail with
    /// [`TransportError::Closed`]; closing again does nothing.
    ///
    /// # Errors
    /// Returns [`TransportError::Busy`] during a request, or the transport's own
    /// error if releasing it fails.
    pub fn close(&self) -> AppResult<()> {
        let mut link = self
            .link
            .try_borrow_mut()
            .map_err(|_| TransportError::Busy)?;
        if let Some(mut transport) = link.transport.take() {
            transport.close()?;
            debug!(transport = %self.name, "Transport closed");
        }
        Ok(())
    }
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("name", &self.name)
            .field("open", &self.is_open())
            .finish()
    }
}
