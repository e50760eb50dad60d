//! Connection configuration.
//!
//! [`ConnectionOptions`] borrows every string it holds, so a device can keep
//! its broker settings in a `static` or in a JSON blob read from flash without
//! copying them into owned buffers.
//!
//! ```rust
//! use libiot_mqtt::network::application::mqtt::{ConnectionOptions, QoS};
//!
//! let json = r#"{
//!     "host": "broker.local",
//!     "client_id": "greenhouse-7",
//!     "username": "device",
//!     "password": "s3cret",
//!     "will": { "topic": "greenhouse/7/status", "message": "offline", "qos": 1, "retain": true }
//! }"#;
//!
//! let options = ConnectionOptions::from_json(json).unwrap();
//! assert_eq!(options.port, 1883);
//! assert_eq!(options.will.unwrap().qos, QoS::AtLeastOnce);
//! ```

use super::codec::QoS;
use super::error::Error;
use serde::Deserialize;

/// The IANA-assigned port for unencrypted MQTT.
pub const DEFAULT_PORT: u16 = 1883;

/// A message the broker publishes on the client's behalf when the client
/// disappears without sending DISCONNECT.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
pub struct Will<'a> {
    /// Topic the Will is published to.
    #[serde(borrow)]
    pub topic: &'a str,
    /// Will payload.
    #[serde(borrow)]
    pub message: &'a str,
    /// QoS the broker uses for the Will.
    #[serde(default)]
    pub qos: QoS,
    /// Whether the broker retains the Will.
    #[serde(default)]
    pub retain: bool,
}

impl<'a> Will<'a> {
    /// A non-retained QoS 0 Will.
    pub fn new(topic: &'a str, message: &'a str) -> Self {
        Self {
            topic,
            message,
            qos: QoS::AtMostOnce,
            retain: false,
        }
    }
}

/// Everything the client needs to reach and log in to a broker.
///
/// `password` is ignored unless `username` is set, matching the CONNECT
/// flag rules of MQTT 3.1.1.
#[derive(Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
pub struct ConnectionOptions<'a> {
    /// Broker host name or address.
    #[serde(borrow)]
    pub host: &'a str,
    /// Broker port, 1883 when omitted.
    #[serde(default = "default_port")]
    pub port: u16,
    /// The client identifier, must be unique within the broker.
    #[serde(borrow)]
    pub client_id: &'a str,
    /// Optional user name.
    #[serde(default, borrow)]
    pub username: Option<&'a str>,
    /// Optional password, only sent together with a user name.
    #[serde(default, borrow)]
    pub password: Option<&'a str>,
    /// Optional Will message.
    #[serde(default, borrow)]
    pub will: Option<Will<'a>>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl<'a> ConnectionOptions<'a> {
    /// Options for an anonymous connection to `host` on the default port.
    pub fn new(host: &'a str, client_id: &'a str) -> Self {
        Self {
            host,
            port: DEFAULT_PORT,
            client_id,
            username: None,
            password: None,
            will: None,
        }
    }

    /// Use a non-default port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Log in with a user name and optional password.
    pub fn with_credentials(mut self, username: &'a str, password: Option<&'a str>) -> Self {
        self.username = Some(username);
        self.password = password;
        self
    }

    /// Register a Will message.
    pub fn with_will(mut self, will: Will<'a>) -> Self {
        self.will = Some(will);
        self
    }

    /// Read options from a JSON object, borrowing strings from `json`.
    ///
    /// Fails with [`Error::InvalidConfig`] on malformed JSON, on strings that
    /// would need unescaping, or on an empty host or client identifier.
    pub fn from_json(json: &'a str) -> Result<Self, Error> {
        let (options, _): (Self, usize) =
            serde_json_core::from_str(json).map_err(|_| Error::InvalidConfig)?;
        if options.host.is_empty() || options.client_id.is_empty() {
            return Err(Error::InvalidConfig);
        }
        Ok(options)
    }
}
