//! MQTT 3.1.1 packet codec.
//!
//! Pure functions that turn protocol values into wire bytes and wire bytes
//! back into protocol values. Nothing in here performs I/O, keeps state or
//! looks at a clock, which makes the codec usable on its own (for example to
//! pre-build a retained status message at compile time of the firmware image)
//! and easy to test byte for byte.
//!
//! # Packet layout
//!
//! ```text
//! ┌──────────────┬─────────────────────┬──────────────────┬───────────┐
//! │ type | flags │ remaining length    │ variable header  │ payload   │
//! │   1 byte     │ 1..=4 bytes varint  │ packet specific  │ optional  │
//! └──────────────┴─────────────────────┴──────────────────┴───────────┘
//! ```
//!
//! Outgoing packets are assembled in fixed-capacity [`heapless::Vec`]s so the
//! memory footprint is known at compile time. A packet that does not fit is
//! reported as [`Error::BufferOverflow`] instead of being truncated.

use super::error::Error;
use super::options::ConnectionOptions;
use core::fmt::{self, Write as _};
use heapless::{String, Vec};
use serde::Deserialize;

/// Largest value the remaining length varint can represent.
pub const MAX_REMAINING_LENGTH: u32 = 268_435_455;

/// Maximum topic length accepted on incoming PUBLISH packets.
pub const MAX_TOPIC_LEN: usize = 256;

/// Maximum payload length accepted on incoming PUBLISH packets.
pub const MAX_PAYLOAD_LEN: usize = 1024;

/// Capacity of an outgoing packet buffer.
pub const MAX_PACKET_LEN: usize = 1536;

/// Keep-alive announced to the broker in CONNECT, in seconds.
pub const KEEP_ALIVE_SECS: u16 = 60;

/// Protocol name carried in every CONNECT.
const PROTOCOL_NAME: &str = "MQTT";
/// MQTT protocol level for version 3.1.1.
const PROTOCOL_LEVEL: u8 = 4;

/// An encoded outgoing packet.
pub type Packet = Vec<u8, MAX_PACKET_LEN>;

/// Bits of the CONNECT flags byte.
pub mod connect_flag {
    /// A user name is present in the payload.
    pub const USER_NAME: u8 = 0x80;
    /// A password is present in the payload.
    pub const PASSWORD: u8 = 0x40;
    /// The Will message is to be retained.
    pub const WILL_RETAIN: u8 = 0x20;
    /// Offset of the two Will QoS bits.
    pub const WILL_QOS_SHIFT: u8 = 3;
    /// A Will message is present in the payload.
    pub const WILL: u8 = 0x04;
    /// Start a clean session.
    pub const CLEAN_SESSION: u8 = 0x02;
}

/// MQTT control packet types, stored in the top four bits of the first byte.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
#[repr(u8)]
pub enum ControlPacketType {
    /// Client request to connect to the broker.
    Connect = 1,
    /// Connect acknowledgment.
    ConnAck = 2,
    /// Publish message.
    Publish = 3,
    /// Publish acknowledgment (QoS 1).
    PubAck = 4,
    /// Publish received (QoS 2, part 1).
    PubRec = 5,
    /// Publish release (QoS 2, part 2).
    PubRel = 6,
    /// Publish complete (QoS 2, part 3).
    PubComp = 7,
    /// Subscribe request.
    Subscribe = 8,
    /// Subscribe acknowledgment.
    SubAck = 9,
    /// Unsubscribe request.
    Unsubscribe = 10,
    /// Unsubscribe acknowledgment.
    UnsubAck = 11,
    /// Ping request.
    PingReq = 12,
    /// Ping response.
    PingResp = 13,
    /// Client is disconnecting.
    Disconnect = 14,
}

impl ControlPacketType {
    /// Read the packet type from the first byte of a fixed header.
    pub fn from_header(byte: u8) -> Result<Self, Error> {
        Self::try_from(byte >> 4)
    }

    /// The first header byte with all flag bits cleared.
    pub const fn header(self) -> u8 {
        (self as u8) << 4
    }
}

impl TryFrom<u8> for ControlPacketType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            1 => Self::Connect,
            2 => Self::ConnAck,
            3 => Self::Publish,
            4 => Self::PubAck,
            5 => Self::PubRec,
            6 => Self::PubRel,
            7 => Self::PubComp,
            8 => Self::Subscribe,
            9 => Self::SubAck,
            10 => Self::Unsubscribe,
            11 => Self::UnsubAck,
            12 => Self::PingReq,
            13 => Self::PingResp,
            14 => Self::Disconnect,
            _ => return Err(Error::InvalidPacketType),
        })
    }
}

/// Quality of Service levels for MQTT messages.
///
/// Deserializes from the numeric level (`0`, `1` or `2`).
#[derive(Debug, PartialEq, Eq, Clone, Copy, Default, Deserialize)]
#[serde(try_from = "u8")]
pub enum QoS {
    /// **QoS 0**: At most once delivery.
    #[default]
    AtMostOnce = 0,
    /// **QoS 1**: At least once delivery.
    AtLeastOnce = 1,
    /// **QoS 2**: Exactly once delivery. Parsed, never published.
    ExactlyOnce = 2,
}

impl TryFrom<u8> for QoS {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(QoS::AtMostOnce),
            1 => Ok(QoS::AtLeastOnce),
            2 => Ok(QoS::ExactlyOnce),
            _ => Err(Error::UnsupportedQoS),
        }
    }
}

/// The broker's answer to CONNECT.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ConnectReturnCode {
    /// Connection accepted.
    Accepted,
    /// The broker does not support protocol level 4.
    UnacceptableProtocolVersion,
    /// The client identifier is not allowed.
    IdentifierRejected,
    /// The MQTT service is unavailable.
    ServerUnavailable,
    /// The user name or password is malformed.
    BadUserNameOrPassword,
    /// The client is not authorized to connect.
    NotAuthorized,
    /// A code outside the 3.1.1 table.
    Unknown(u8),
}

impl ConnectReturnCode {
    /// The raw code as sent on the wire.
    pub fn to_u8(self) -> u8 {
        match self {
            ConnectReturnCode::Accepted => 0,
            ConnectReturnCode::UnacceptableProtocolVersion => 1,
            ConnectReturnCode::IdentifierRejected => 2,
            ConnectReturnCode::ServerUnavailable => 3,
            ConnectReturnCode::BadUserNameOrPassword => 4,
            ConnectReturnCode::NotAuthorized => 5,
            ConnectReturnCode::Unknown(code) => code,
        }
    }
}

impl From<u8> for ConnectReturnCode {
    fn from(code: u8) -> Self {
        match code {
            0 => ConnectReturnCode::Accepted,
            1 => ConnectReturnCode::UnacceptableProtocolVersion,
            2 => ConnectReturnCode::IdentifierRejected,
            3 => ConnectReturnCode::ServerUnavailable,
            4 => ConnectReturnCode::BadUserNameOrPassword,
            5 => ConnectReturnCode::NotAuthorized,
            other => ConnectReturnCode::Unknown(other),
        }
    }
}

impl fmt::Display for ConnectReturnCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectReturnCode::Accepted => f.write_str("Connection Accepted."),
            ConnectReturnCode::UnacceptableProtocolVersion => {
                f.write_str("Connection Refused, unacceptable protocol version.")
            }
            ConnectReturnCode::IdentifierRejected => {
                f.write_str("Connection Refused, identifier rejected.")
            }
            ConnectReturnCode::ServerUnavailable => {
                f.write_str("Connection Refused, server unavailable.")
            }
            ConnectReturnCode::BadUserNameOrPassword => {
                f.write_str("Connection Refused, bad user name or password.")
            }
            ConnectReturnCode::NotAuthorized => f.write_str("Connection Refused, not authorized."),
            ConnectReturnCode::Unknown(code) => write!(f, "unknown return code: {code}."),
        }
    }
}

/// An incoming PUBLISH packet.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::codec::{build_publish, parse_publish, QoS};
///
/// let packet = build_publish("sensors/temperature", b"23.5", QoS::AtLeastOnce, false, 7).unwrap();
/// let message = parse_publish(&packet).unwrap();
///
/// assert_eq!(message.topic.as_str(), "sensors/temperature");
/// assert_eq!(&message.content[..], b"23.5");
/// assert_eq!(message.pid, Some(7));
/// assert_eq!(message.next, None);
/// ```
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct Message {
    /// The topic on which the message was published.
    pub topic: String<MAX_TOPIC_LEN>,
    /// The message body.
    pub content: Vec<u8, MAX_PAYLOAD_LEN>,
    /// Delivery level requested by the sender.
    pub qos: QoS,
    /// Whether the broker delivered this as a retained message.
    pub retain: bool,
    /// Packet identifier, present when `qos` is above 0.
    pub pid: Option<u16>,
    /// Offset in the source buffer where another packet starts.
    pub next: Option<usize>,
}

/// Encode the remaining length field of a fixed header.
///
/// Each output byte carries seven bits of the value, least significant group
/// first; the high bit marks that another byte follows.
///
/// # Panics
///
/// If `len` exceeds [`MAX_REMAINING_LENGTH`]. Such a length can only come from
/// a programming error, the format has no way to express it.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::codec::encode_remaining_length;
///
/// assert_eq!(&encode_remaining_length(127)[..], &[127]);
/// assert_eq!(&encode_remaining_length(128)[..], &[128, 1]);
/// ```
pub fn encode_remaining_length(len: u32) -> Vec<u8, 4> {
    assert!(
        len <= MAX_REMAINING_LENGTH,
        "remaining length {} exceeds {}",
        len,
        MAX_REMAINING_LENGTH
    );
    let mut out = Vec::new();
    let mut len = len;
    loop {
        let mut byte = (len % 128) as u8;
        len /= 128;
        if len > 0 {
            byte |= 0x80;
        }
        // At most four iterations for a value within range.
        let _ = out.push(byte);
        if len == 0 {
            break;
        }
    }
    out
}

/// Decode a remaining length field.
///
/// Returns the value together with the number of bytes it occupied.
pub fn decode_remaining_length(buf: &[u8]) -> Result<(u32, usize), Error> {
    let mut value = 0u32;
    for (i, &byte) in buf.iter().take(4).enumerate() {
        value |= u32::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
    }
    if buf.len() >= 4 {
        Err(Error::MalformedRemainingLength)
    } else {
        Err(Error::Incomplete)
    }
}

/// Total size in bytes of the packet at the start of `buf`.
///
/// Fails with [`Error::Incomplete`] when `buf` holds less than a whole packet.
pub fn frame_length(buf: &[u8]) -> Result<usize, Error> {
    if buf.is_empty() {
        return Err(Error::Incomplete);
    }
    let (remaining, len_bytes) = decode_remaining_length(&buf[1..])?;
    let total = 1 + len_bytes + remaining as usize;
    if buf.len() < total {
        return Err(Error::Incomplete);
    }
    Ok(total)
}

/// Encode a UTF-8 string with its two byte big-endian length prefix.
pub fn pack_string<const N: usize>(s: &str) -> Result<Vec<u8, N>, Error> {
    let mut out = Vec::new();
    push_string(&mut out, s.as_bytes())?;
    Ok(out)
}

/// Compute the CONNECT flags byte for `options`.
///
/// A clean session is always requested. The password bit is only set when a
/// user name is present as well.
pub fn connect_flags(options: &ConnectionOptions) -> u8 {
    let mut flags = connect_flag::CLEAN_SESSION;
    if let Some(will) = &options.will {
        flags |= connect_flag::WILL | ((will.qos as u8) << connect_flag::WILL_QOS_SHIFT);
        if will.retain {
            flags |= connect_flag::WILL_RETAIN;
        }
    }
    if options.username.is_some() {
        flags |= connect_flag::USER_NAME;
        if options.password.is_some() {
            flags |= connect_flag::PASSWORD;
        }
    }
    flags
}

/// Build a CONNECT packet.
///
/// The payload carries the client identifier, then the Will topic and message
/// when a Will is configured, then the user name and password.
pub fn build_connect(options: &ConnectionOptions) -> Result<Packet, Error> {
    let mut body: Packet = Vec::new();

    // --- Variable Header ---
    push_string(&mut body, PROTOCOL_NAME.as_bytes())?;
    push_bytes(&mut body, &[PROTOCOL_LEVEL, connect_flags(options)])?;
    push_bytes(&mut body, &KEEP_ALIVE_SECS.to_be_bytes())?;

    // --- Payload ---
    push_string(&mut body, options.client_id.as_bytes())?;
    if let Some(will) = &options.will {
        push_string(&mut body, will.topic.as_bytes())?;
        push_string(&mut body, will.message.as_bytes())?;
    }
    if let Some(username) = options.username {
        push_string(&mut body, username.as_bytes())?;
        if let Some(password) = options.password {
            push_string(&mut body, password.as_bytes())?;
        }
    }

    finish(ControlPacketType::Connect.header(), &body)
}

/// Build a PUBLISH packet.
///
/// `pid` is only written when `qos` is above 0. The payload is appended
/// without a length prefix, its size follows from the remaining length.
pub fn build_publish(
    topic: &str,
    payload: &[u8],
    qos: QoS,
    retain: bool,
    pid: u16,
) -> Result<Packet, Error> {
    let mut body: Packet = Vec::new();
    push_string(&mut body, topic.as_bytes())?;
    if qos != QoS::AtMostOnce {
        push_bytes(&mut body, &pid.to_be_bytes())?;
    }
    push_bytes(&mut body, payload)?;

    let header = ControlPacketType::Publish.header() | ((qos as u8) << 1) | u8::from(retain);
    finish(header, &body)
}

/// Build a SUBSCRIBE packet for a single topic filter.
pub fn build_subscribe(topic: &str, qos: QoS, pid: u16) -> Result<Packet, Error> {
    let mut body: Packet = Vec::new();
    push_bytes(&mut body, &pid.to_be_bytes())?;
    push_string(&mut body, topic.as_bytes())?;
    push_bytes(&mut body, &[qos as u8])?;

    // Bits 3..0 of SUBSCRIBE are reserved and must be 0b0010.
    finish(ControlPacketType::Subscribe.header() | 0b0010, &body)
}

/// Build an UNSUBSCRIBE packet for a single topic filter.
pub fn build_unsubscribe(topic: &str, pid: u16) -> Result<Packet, Error> {
    let mut body: Packet = Vec::new();
    push_bytes(&mut body, &pid.to_be_bytes())?;
    push_string(&mut body, topic.as_bytes())?;

    finish(ControlPacketType::Unsubscribe.header() | 0b0010, &body)
}

/// Build a PUBACK for `pid`.
pub fn build_puback(pid: u16) -> [u8; 4] {
    let [hi, lo] = pid.to_be_bytes();
    [ControlPacketType::PubAck.header(), 2, hi, lo]
}

/// Build a PINGREQ.
pub fn build_pingreq() -> [u8; 2] {
    [ControlPacketType::PingReq.header(), 0]
}

/// Build a DISCONNECT.
pub fn build_disconnect() -> [u8; 2] {
    [ControlPacketType::Disconnect.header(), 0]
}

/// Parse the PUBLISH packet at the start of `buf`.
///
/// Bytes after the packet are left alone. If the byte right after it is not
/// zero, [`Message::next`] holds its offset so the caller can continue
/// parsing there.
pub fn parse_publish(buf: &[u8]) -> Result<Message, Error> {
    let first = *buf.first().ok_or(Error::Incomplete)?;
    if ControlPacketType::from_header(first)? != ControlPacketType::Publish {
        return Err(Error::MalformedPacket);
    }
    let qos = QoS::try_from((first >> 1) & 0x03).map_err(|_| Error::MalformedPacket)?;
    let retain = first & 0x01 != 0;

    let end = frame_length(buf)?;
    let (_, len_bytes) = decode_remaining_length(&buf[1..])?;
    let body = &buf[1 + len_bytes..end];

    // --- Variable Header ---
    if body.len() < 2 {
        return Err(Error::MalformedPacket);
    }
    let topic_len = usize::from(u16::from_be_bytes([body[0], body[1]]));
    let mut offset = 2 + topic_len;
    if body.len() < offset {
        return Err(Error::MalformedPacket);
    }
    let topic = core::str::from_utf8(&body[2..offset]).map_err(|_| Error::InvalidUtf8)?;
    let topic = String::try_from(topic).map_err(|_| Error::BufferOverflow)?;

    let pid = if qos == QoS::AtMostOnce {
        None
    } else {
        if body.len() < offset + 2 {
            return Err(Error::MalformedPacket);
        }
        let pid = u16::from_be_bytes([body[offset], body[offset + 1]]);
        offset += 2;
        Some(pid)
    };

    // --- Payload ---
    let content = Vec::from_slice(&body[offset..]).map_err(|_| Error::BufferOverflow)?;

    let next = match buf.get(end) {
        Some(&byte) if byte != 0 => Some(end),
        _ => None,
    };

    Ok(Message {
        topic,
        content,
        qos,
        retain,
        pid,
        next,
    })
}

/// Parse a CONNACK and return the broker's verdict.
pub fn parse_connack(buf: &[u8]) -> Result<ConnectReturnCode, Error> {
    match buf {
        [0x20, 0x02, _session_present, code, ..] => Ok(ConnectReturnCode::from(*code)),
        [0x20, 0x02, ..] | [0x20] | [] => Err(Error::Incomplete),
        _ => Err(Error::MalformedPacket),
    }
}

/// Read the packet identifier of a PUBACK, SUBACK or UNSUBACK.
pub fn parse_packet_id(buf: &[u8]) -> Result<u16, Error> {
    let end = frame_length(buf)?;
    let (_, len_bytes) = decode_remaining_length(&buf[1..])?;
    match &buf[1 + len_bytes..end] {
        [hi, lo, ..] => Ok(u16::from_be_bytes([*hi, *lo])),
        _ => Err(Error::MalformedPacket),
    }
}

/// Human readable text for a CONNACK return code.
///
/// # Examples
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::codec::describe_connect_return_code;
///
/// assert_eq!(describe_connect_return_code(5), "Connection Refused, not authorized.");
/// assert_eq!(describe_connect_return_code(42), "unknown return code: 42.");
/// ```
pub fn describe_connect_return_code(code: u8) -> String<64> {
    let mut text = String::new();
    // The longest description is 50 bytes.
    let _ = write!(text, "{}", ConnectReturnCode::from(code));
    text
}

fn push_bytes<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(bytes)
        .map_err(|_| Error::BufferOverflow)
}

fn push_string<const N: usize>(buf: &mut Vec<u8, N>, s: &[u8]) -> Result<(), Error> {
    let len = u16::try_from(s.len()).map_err(|_| Error::StringTooLong)?;
    push_bytes(buf, &len.to_be_bytes())?;
    push_bytes(buf, s)
}

/// Prefix `body` with its fixed header.
fn finish(header: u8, body: &[u8]) -> Result<Packet, Error> {
    let mut packet = Packet::new();
    push_bytes(&mut packet, &[header])?;
    // `body` is bounded by MAX_PACKET_LEN, far below MAX_REMAINING_LENGTH.
    push_bytes(&mut packet, &encode_remaining_length(body.len() as u32))?;
    push_bytes(&mut packet, body)?;
    Ok(packet)
}
