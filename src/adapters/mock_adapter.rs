//! Mock transport for testing
//!
//! This adapter provides a simulated bus for testing devices without physical
//! hardware. It provides:
//! - Scripted responses, returned one per read
//! - Controllable failure injection
//! - A log of every frame written
//!
//! Clones share state, so a test can keep one handle for inspection while the
//! controller owns another.

use super::Transport;
use crate::error::TransportError;
use std::collections::VecDeque;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Mock transport for testing
///
/// # Example
///
/// ```
/// use elliptec::adapters::{MockAdapter, Transport};
///
/// let mut adapter = MockAdapter::new();
/// adapter.push_response("0GS00\r\n");
/// adapter.write(b"0gs").unwrap();
/// assert_eq!(adapter.read_until(b"\r\n").unwrap(), b"0GS00\r\n");
/// assert_eq!(adapter.written(), vec!["0gs".to_string()]);
/// ```
#[derive(Clone, Default)]
pub struct MockAdapter {
    responses: Arc<Mutex<VecDeque<Vec<u8>>>>,
    written: Arc<Mutex<Vec<String>>>,
    should_fail_next: Arc<AtomicBool>,
    close_count: Arc<AtomicUsize>,
}

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockAdapter {
    /// Create a mock with no scripted responses
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock pre-loaded with responses
    pub fn with_responses<I, S>(responses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let adapter = Self::new();
        for response in responses {
            adapter.push_response(response);
        }
        adapter
    }

    /// Queue a response for a later read
    pub fn push_response(&self, response: impl AsRef<[u8]>) {
        locked(&self.responses).push_back(response.as_ref().to_vec());
    }

    /// Number of responses not yet read
    pub fn pending_responses(&self) -> usize {
        locked(&self.responses).len()
    }

    /// Inject a failure for the next write or read
    pub fn inject_next_failure(&self) {
        self.should_fail_next.store(true, Ordering::SeqCst);
    }

    fn check_failure(&self) -> Result<(), TransportError> {
        if self.should_fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::Io(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "Injected failure",
            )));
        }
        Ok(())
    }

    /// Every frame written so far, as text
    pub fn written(&self) -> Vec<String> {
        locked(&self.written).clone()
    }

    /// Clear the write log
    pub fn clear_written(&self) {
        locked(&self.written).clear();
    }

    /// How many times `close` was called
    pub fn close_count(&self) -> usize {
        self.close_count.load(Ordering::SeqCst)
    }
}

impl Transport for MockAdapter {
    fn name(&self) -> &str {
        "mock"
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        self.check_failure()?;
        locked(&self.written).push(String::from_utf8_lossy(bytes).into_owned());
        Ok(())
    }

    fn read_until(&mut self, _terminator: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.check_failure()?;
        // Nothing scripted behaves like a read timeout
        Ok(locked(&self.responses).pop_front().unwrap_or_default())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.close_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
