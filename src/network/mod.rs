//! A transport abstraction layer for embedded systems
//!
//! The MQTT client never touches sockets directly. It talks to a [`Connect`]
//! implementation to open a byte stream to the broker and then drives the
//! resulting [`Connection`] through the [`Read`], [`Write`] and [`Close`]
//! traits. Any reliable, ordered byte stream works: a TCP socket from an
//! embedded network stack, a modem AT-command tunnel, or a UART bridge.
//!
//! Reads are expected to be non-blocking: `Ok(0)` means "nothing buffered
//! right now", while an `Err` means the stream is gone.

#![allow(missing_docs)]
#![deny(unsafe_code)]

/// Common error types for network operations
pub mod error;

/// Application protocols built on top of the transport traits
pub mod application;

/// TCP transport for hosted targets
#[cfg(feature = "std")]
pub mod tcp;

/// Re-exports of common traits
pub mod prelude {
    pub use super::{Close, Connect, Connection, Read, Write};
}

pub trait Read {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Read buffered data from the connection, `Ok(0)` when none is available
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

pub trait Write {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Write data to the connection
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error>;
    /// Flush the write buffer
    fn flush(&mut self) -> Result<(), Self::Error>;
}

pub trait Close {
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Close the connection
    fn close(self) -> Result<(), Self::Error>;
}

/// A synchronous connection
pub trait Connection: Read + Write + Close {}

/// A synchronous connector (client)
///
/// Each call opens a brand new connection. The caller owns the returned
/// connection and is responsible for closing it.
pub trait Connect {
    /// Associated connection type
    type Connection: Connection;
    /// Associated error type
    type Error: core::fmt::Debug;
    /// Open a connection to `host:port`
    fn connect(&mut self, host: &str, port: u16) -> Result<Self::Connection, Self::Error>;
}

/// Write all of `buf`, retrying on short writes.
///
/// A write that makes no progress is reported as [`error::Error::WriteError`].
pub fn write_all<W: Write>(writer: &mut W, mut buf: &[u8]) -> Result<(), error::Error> {
    while !buf.is_empty() {
        match writer.write(buf) {
            Ok(0) | Err(_) => return Err(error::Error::WriteError),
            Ok(n) => buf = &buf[n..],
        }
    }
    writer.flush().map_err(|_| error::Error::WriteError)
}
