//! Client events and the sink they are delivered to.

use super::codec::Message;
use super::error::ClientError;
use core::fmt;

/// Something the client wants the application to know about.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Event<'a> {
    /// Progress information, e.g. a connection attempt starting.
    Info(Notice),
    /// Low-level protocol traffic, e.g. a ping or an acknowledgement.
    Debug(Notice),
    /// A failure; the client keeps running and recovers on its own.
    Error(ClientError),
    /// The broker accepted the connection.
    Connected,
    /// An established connection was lost.
    Disconnected,
    /// A PUBLISH arrived from the broker.
    Received(&'a Message),
    /// The connection was closed by [`Client::disconnect`](super::Client::disconnect).
    Closed,
}

/// Payload of [`Event::Info`] and [`Event::Debug`].
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Notice {
    /// A connection attempt is starting.
    Connecting,
    /// The watchdog found the client disconnected and starts a new attempt.
    Reconnecting,
    /// A PINGREQ was written.
    PingSent,
    /// The broker answered a PINGREQ.
    PingResponse,
    /// The broker acknowledged the QoS 1 publish with this packet id.
    PublishAcknowledged(u16),
    /// A PUBACK arrived for a packet id that is not in flight.
    UnknownAcknowledgement(u16),
    /// The broker acknowledged a SUBSCRIBE.
    SubscribeAcknowledged(u16),
    /// The broker acknowledged an UNSUBSCRIBE.
    UnsubscribeAcknowledged(u16),
    /// An outgoing packet was discarded because the client is not connected.
    Dropped,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Connecting => f.write_str("connecting"),
            Notice::Reconnecting => f.write_str("reconnecting"),
            Notice::PingSent => f.write_str("ping sent"),
            Notice::PingResponse => f.write_str("ping response"),
            Notice::PublishAcknowledged(pid) => write!(f, "publish {pid} acknowledged"),
            Notice::UnknownAcknowledgement(pid) => write!(f, "acknowledgement for unknown packet {pid}"),
            Notice::SubscribeAcknowledged(pid) => write!(f, "subscribe {pid} acknowledged"),
            Notice::UnsubscribeAcknowledged(pid) => write!(f, "unsubscribe {pid} acknowledged"),
            Notice::Dropped => f.write_str("not connected, packet dropped"),
        }
    }
}

/// Receives client events.
///
/// Implemented for every `FnMut(Event<'_>)`, so a closure is usually enough:
///
/// ```rust
/// use libiot_mqtt::network::application::mqtt::{Event, EventSink};
///
/// let mut received = 0;
/// let mut sink = |event: Event<'_>| {
///     if let Event::Received(_) = event {
///         received += 1;
///     }
/// };
/// sink.on_event(Event::Connected);
/// ```
pub trait EventSink {
    /// Handle one event. Must not block.
    fn on_event(&mut self, event: Event<'_>);
}

impl<F> EventSink for F
where
    F: FnMut(Event<'_>),
{
    fn on_event(&mut self, event: Event<'_>) {
        self(event)
    }
}
