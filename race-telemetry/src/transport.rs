//! Datagram transport abstraction
//!
//! The ingestion loop consumes raw payloads from anything that implements
//! `Transport`; UDP sockets and MQTT subscriptions live in the application.
//! Shutdown is requested through a `ShutdownSignal` shared with the render
//! loop: transports poll it between bounded waits and report `Closed` once it
//! is raised.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Errors a transport can report from `receive`
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Shutdown was requested or the peer went away for good
    #[error("Transport closed")]
    Closed,

    /// No datagram within the poll interval
    #[error("Receive timed out")]
    TimedOut,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Broker error: {0}")]
    Broker(String),
}

/// Source of raw datagram payloads
pub trait Transport: Send {
    /// Block until the next datagram arrives
    fn receive(&mut self) -> Result<Vec<u8>, TransportError>;

    /// Release the underlying resources
    fn close(&mut self) {}
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn receive(&mut self) -> Result<Vec<u8>, TransportError> {
        (**self).receive()
    }

    fn close(&mut self) {
        (**self).close()
    }
}

/// Cloneable flag that asks the transport side to shut down
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal {
    closed: Arc<AtomicBool>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
