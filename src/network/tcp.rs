//! TCP transport over `std::net`.
//!
//! The stream is switched to non-blocking mode right after the handshake so
//! that [`Read::read`] matches the contract the MQTT client expects: `Ok(0)`
//! when nothing is buffered, an error once the peer has gone away.

use super::error::Error;
use super::{Close, Connect, Connection, Read, Write};
use std::io::{self, Read as _, Write as _};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Opens [`TcpConnection`]s.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Create a connector with a 5 second connect timeout.
    pub fn new() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
        }
    }

    /// Override the connect timeout.
    pub fn with_timeout(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

impl Default for TcpConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl Connect for TcpConnector {
    type Connection = TcpConnection;
    type Error = Error;

    fn connect(&mut self, host: &str, port: u16) -> Result<Self::Connection, Self::Error> {
        let addr = (host, port)
            .to_socket_addrs()
            .map_err(|_| Error::InvalidAddress)?
            .next()
            .ok_or(Error::InvalidAddress)?;
        let stream =
            TcpStream::connect_timeout(&addr, self.connect_timeout).map_err(|e| match e.kind() {
                io::ErrorKind::TimedOut => Error::Timeout,
                _ => Error::ConnectionRefused,
            })?;
        stream.set_nodelay(true).map_err(|_| Error::SocketOption)?;
        stream
            .set_nonblocking(true)
            .map_err(|_| Error::SocketOption)?;
        Ok(TcpConnection { stream })
    }
}

/// A non-blocking TCP stream.
#[derive(Debug)]
pub struct TcpConnection {
    stream: TcpStream,
}

impl Read for TcpConnection {
    type Error = Error;

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        match self.stream.read(buf) {
            // EOF on a stream socket means the broker hung up
            Ok(0) if !buf.is_empty() => Err(Error::ConnectionClosed),
            Ok(n) => Ok(n),
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(0),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(0),
            Err(_) => Err(Error::ReadError),
        }
    }
}

impl Write for TcpConnection {
    type Error = Error;

    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        loop {
            match self.stream.write(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => continue,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return Err(Error::WriteError),
            }
        }
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        self.stream.flush().map_err(|_| Error::WriteError)
    }
}

impl Close for TcpConnection {
    type Error = Error;

    fn close(self) -> Result<(), Self::Error> {
        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
            Err(_) => Err(Error::ConnectionClosed),
        }
    }
}

impl Connection for TcpConnection {}
