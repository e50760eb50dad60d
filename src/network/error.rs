//! Transport errors shared by every [`Connection`](super::Connection) implementation

/// What went wrong on the byte stream underneath a protocol client.
///
/// Transports map their native failures onto these variants so protocol code
/// can react without knowing which stack it runs on. The MQTT client treats
/// every one of them as loss of the connection.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The operation needs an open connection and there is none.
    NotOpen,
    /// Writing failed or made no progress.
    WriteError,
    /// Reading failed.
    ReadError,
    /// The remote end refused the connection attempt.
    ConnectionRefused,
    /// The connection attempt did not complete in time.
    Timeout,
    /// The peer closed the stream.
    ConnectionClosed,
    /// The host name could not be resolved.
    InvalidAddress,
    /// The socket could not be configured after connecting.
    SocketOption,
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let text = match self {
            Error::NotOpen => "connection not open",
            Error::WriteError => "write failed",
            Error::ReadError => "read failed",
            Error::ConnectionRefused => "connection refused",
            Error::Timeout => "connect timed out",
            Error::ConnectionClosed => "connection closed by peer",
            Error::InvalidAddress => "host could not be resolved",
            Error::SocketOption => "socket option could not be set",
        };
        f.write_str(text)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::NotOpen => defmt::write!(f, "NotOpen"),
            Error::WriteError => defmt::write!(f, "WriteError"),
            Error::ReadError => defmt::write!(f, "ReadError"),
            Error::ConnectionRefused => defmt::write!(f, "ConnectionRefused"),
            Error::Timeout => defmt::write!(f, "Timeout"),
            Error::ConnectionClosed => defmt::write!(f, "ConnectionClosed"),
            Error::InvalidAddress => defmt::write!(f, "InvalidAddress"),
            Error::SocketOption => defmt::write!(f, "SocketOption"),
        }
    }
}
