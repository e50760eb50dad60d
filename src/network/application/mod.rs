//! # Application Layer Protocols
//!
//! Protocol clients built on the transport traits of [`crate::network`].
//! Every client here works with any type implementing
//! [`Connection`](crate::network::Connection), keeps its buffers in fixed-size
//! `heapless` containers, and never allocates.

/// MQTT 3.1.1 client.
///
/// Packet codec, connection state machine with watchdog reconnects and
/// keep-alive, and the event types the client reports through.
pub mod mqtt;
