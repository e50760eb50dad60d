//! MQTT 3.1.1 client for constrained devices.
//!
//! The module is split in two layers:
//!
//! - [`codec`]: pure functions that build and parse control packets;
//! - [`client`]: the connection state machine that keeps a device attached to
//!   its broker, reconnecting on its own after any failure.
//!
//! Only the parts of MQTT 3.1.1 a telemetry device needs are supported:
//! QoS 0 and 1 in both directions, one topic filter per SUBSCRIBE or
//! UNSUBSCRIBE, always a clean session, and a single Will message.
//!
//! ```rust
//! use libiot_mqtt::network::application::mqtt::{codec, QoS};
//!
//! let packet = codec::build_publish("status", b"online", QoS::AtMostOnce, true, 0).unwrap();
//! assert_eq!(packet[0], 0x31);
//! ```

/// Connection state machine.
pub mod client;

/// Packet encoding and decoding.
pub mod codec;

/// Error types.
pub mod error;

/// Events reported by the client.
pub mod event;

/// Connection options.
pub mod options;

/// Clock abstraction and periodic timers.
pub mod timer;

pub use client::{Client, ClientState, InFlight};
pub use codec::{ConnectReturnCode, ControlPacketType, Message, QoS};
pub use error::{ClientError, Error};
pub use event::{Event, EventSink, Notice};
pub use options::{ConnectionOptions, Will};
#[cfg(feature = "std")]
pub use timer::StdClock;
pub use timer::{Clock, Timer};
