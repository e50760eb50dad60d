//! # libiot-mqtt - MQTT 3.1.1 for IoT devices
//!
//! An MQTT 3.1.1 client meant for devices that should stay connected to a
//! broker for months without anyone looking after them. It supports `no_std`
//! environments and does not allocate.
//!
//! ## Features
//!
//! - **Packet codec**: CONNECT, PUBLISH, SUBSCRIBE, UNSUBSCRIBE, PUBACK,
//!   PINGREQ and DISCONNECT encoding; PUBLISH, CONNACK and acknowledgement
//!   decoding, all on fixed-capacity `heapless` buffers
//! - **Self-healing client**: a 5 s watchdog reconnects after every failure,
//!   a 40 s keep-alive detects dead links
//! - **QoS 0 and 1** in both directions, with automatic PUBACKs for incoming
//!   QoS 1 messages
//! - **Transport agnostic**: any byte stream implementing the
//!   [`network`] traits, plus a ready-made TCP transport with the `std` feature
//! - **JSON configuration** through `serde-json-core`
//!
//! ## Usage
//!
//! Add this to your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! libiot-mqtt = "0.1.0"
//! ```
//!
//! ### Connecting from a hosted target
//!
//! ```rust,ignore
//! use libiot_mqtt::network::application::mqtt::{Client, ConnectionOptions, Event, QoS, StdClock};
//! use libiot_mqtt::network::tcp::TcpConnector;
//!
//! let options = ConnectionOptions::new("test.mosquitto.org", "libiot-demo");
//! let mut client = Client::new(options, TcpConnector::new(), StdClock::new(), |event: Event<'_>| {
//!     println!("{event:?}");
//! });
//!
//! client.connect();
//! loop {
//!     client.poll();
//!     if client.is_connected() {
//!         client.publish("libiot/demo", b"hello", QoS::AtLeastOnce, false).ok();
//!     }
//!     std::thread::sleep(std::time::Duration::from_millis(100));
//! }
//! ```
//!
//! ## Platform Support
//!
//! This library is designed to work on:
//! - Embedded microcontrollers (ARM Cortex-M, RISC-V, etc.)
//! - Linux-based IoT devices (Raspberry Pi, etc.)
//! - Any platform supporting Rust's `core` library
//!
//! ## Optional Features
//!
//! - `std`: TCP transport and a wall clock (default: disabled)
//! - `defmt`: Enable defmt logging support for embedded debugging

#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![doc(html_root_url = "https://shishir-dey.github.io/libiot/")]

#[macro_use]
mod log;

/// Transport abstraction and the protocols built on it.
///
/// The MQTT client lives in [`network::application::mqtt`].
pub mod network;
