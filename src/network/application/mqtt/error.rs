//! Error types for the MQTT codec and client.

use super::codec::ConnectReturnCode;
use crate::network::error::Error as NetworkError;
use core::fmt;

/// Errors returned by codec functions and client operations.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Error {
    /// The packet does not fit in its fixed-capacity buffer.
    BufferOverflow,
    /// A string is longer than the 65 535 bytes a length prefix can express.
    StringTooLong,
    /// The remaining length field runs past four bytes.
    MalformedRemainingLength,
    /// The buffer ends before the packet does.
    Incomplete,
    /// A topic name is not valid UTF-8.
    InvalidUtf8,
    /// The packet type nibble is reserved (0 or 15).
    InvalidPacketType,
    /// The packet body is inconsistent with its header.
    MalformedPacket,
    /// The requested QoS level is not supported for this operation.
    UnsupportedQoS,
    /// All in-flight slots are taken by unacknowledged QoS 1 publishes.
    InflightFull,
    /// Connection options could not be read from their serialized form.
    InvalidConfig,
    /// The transport failed.
    Transport(NetworkError),
}

impl From<NetworkError> for Error {
    fn from(e: NetworkError) -> Self {
        Error::Transport(e)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BufferOverflow => f.write_str("packet exceeds buffer capacity"),
            Error::StringTooLong => f.write_str("string longer than 65535 bytes"),
            Error::MalformedRemainingLength => f.write_str("malformed remaining length"),
            Error::Incomplete => f.write_str("incomplete packet"),
            Error::InvalidUtf8 => f.write_str("topic is not valid UTF-8"),
            Error::InvalidPacketType => f.write_str("reserved packet type"),
            Error::MalformedPacket => f.write_str("malformed packet"),
            Error::UnsupportedQoS => f.write_str("unsupported QoS level"),
            Error::InflightFull => f.write_str("too many unacknowledged publishes"),
            Error::InvalidConfig => f.write_str("invalid connection options"),
            Error::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        match self {
            Error::BufferOverflow => defmt::write!(f, "BufferOverflow"),
            Error::StringTooLong => defmt::write!(f, "StringTooLong"),
            Error::MalformedRemainingLength => defmt::write!(f, "MalformedRemainingLength"),
            Error::Incomplete => defmt::write!(f, "Incomplete"),
            Error::InvalidUtf8 => defmt::write!(f, "InvalidUtf8"),
            Error::InvalidPacketType => defmt::write!(f, "InvalidPacketType"),
            Error::MalformedPacket => defmt::write!(f, "MalformedPacket"),
            Error::UnsupportedQoS => defmt::write!(f, "UnsupportedQoS"),
            Error::InflightFull => defmt::write!(f, "InflightFull"),
            Error::InvalidConfig => defmt::write!(f, "InvalidConfig"),
            Error::Transport(e) => defmt::write!(f, "Transport({})", e),
        }
    }
}

/// Failures the client reports through [`Event::Error`](super::Event::Error).
///
/// None of these are returned from a method call; they happen while the
/// client reacts to the network or to its timers.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ClientError {
    /// The broker answered CONNECT with a refusal.
    Refused(ConnectReturnCode),
    /// The connector could not open a transport connection.
    ConnectFailed,
    /// The watchdog fired before the broker acknowledged the connection.
    ConnAckTimeout,
    /// The transport closed or failed.
    ConnectionLost,
    /// No traffic arrived during a whole keep-alive interval.
    KeepAliveTimeout,
    /// A packet of a type the client does not expect to receive.
    UnexpectedPacket(u8),
    /// An incoming packet could not be decoded.
    Malformed(Error),
    /// An outgoing packet could not be encoded, e.g. an oversized client id.
    Encode(Error),
}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Refused(code) => write!(f, "{code}"),
            ClientError::ConnectFailed => f.write_str("could not open a connection to the broker"),
            ClientError::ConnAckTimeout => f.write_str("broker did not acknowledge the connection"),
            ClientError::ConnectionLost => f.write_str("connection lost"),
            ClientError::KeepAliveTimeout => f.write_str("keep-alive timeout"),
            ClientError::UnexpectedPacket(kind) => write!(f, "unexpected packet type: {kind}"),
            ClientError::Malformed(e) => write!(f, "malformed packet: {e}"),
            ClientError::Encode(e) => write!(f, "could not encode packet: {e}"),
        }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ClientError {
    fn format(&self, f: defmt::Formatter) {
        match self {
            ClientError::Refused(code) => defmt::write!(f, "Refused({})", code.to_u8()),
            ClientError::ConnectFailed => defmt::write!(f, "ConnectFailed"),
            ClientError::ConnAckTimeout => defmt::write!(f, "ConnAckTimeout"),
            ClientError::ConnectionLost => defmt::write!(f, "ConnectionLost"),
            ClientError::KeepAliveTimeout => defmt::write!(f, "KeepAliveTimeout"),
            ClientError::UnexpectedPacket(kind) => defmt::write!(f, "UnexpectedPacket({})", kind),
            ClientError::Malformed(e) => defmt::write!(f, "Malformed({})", e),
            ClientError::Encode(e) => defmt::write!(f, "Encode({})", e),
        }
    }
}
