//! Byte transport the command channel runs over.
//!
//! The watch exposes a pair of interrupt endpoints. Anything that can move a
//! packet to one endpoint and pull a packet from another within a timeout can
//! carry the protocol: a libusb handle in production, a simulated firmware in
//! tests.

use std::time::Duration;

/// Blocking, endpoint-addressed packet transport.
pub trait Transport {
    /// Write `data` to `endpoint`. Returns the number of bytes the device accepted.
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration)
        -> Result<usize, TransportError>;

    /// Read one packet from `endpoint` into `buf`. Returns the bytes received.
    fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration)
        -> Result<usize, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration)
        -> Result<usize, TransportError> {
        (**self).write(endpoint, data, timeout)
    }

    fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration)
        -> Result<usize, TransportError> {
        (**self).read(endpoint, buf, timeout)
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn write(&mut self, endpoint: u8, data: &[u8], timeout: Duration)
        -> Result<usize, TransportError> {
        (**self).write(endpoint, data, timeout)
    }

    fn read(&mut self, endpoint: u8, buf: &mut [u8], timeout: Duration)
        -> Result<usize, TransportError> {
        (**self).read(endpoint, buf, timeout)
    }
}

/// Failures reported by (or about) the transport.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("transfer timed out")]
    Timeout,

    #[error("device disconnected")]
    Disconnected,

    #[error("transfer failed: {0}")]
    Io(String),

    #[error("short write: {transferred} of {expected} bytes transferred")]
    ShortWrite { expected: usize, transferred: usize },
}
