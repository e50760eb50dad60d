//! MQTT 3.1.1 client for always-on devices.
//!
//! The [`Client`] owns one transport connection at a time and two periodic
//! timers:
//!
//! - a **watchdog** (every 5 s) that starts a fresh connection attempt whenever
//!   the client is not connected, forever and without backoff;
//! - a **keep-alive** (every 40 s while connected) that sends PINGREQ and
//!   declares the connection dead if nothing was heard since the previous one.
//!
//! Nothing blocks. The application calls [`Client::poll`] from its main loop;
//! each call drains whatever the transport has buffered, dispatches the
//! packets and runs the timers that are due against the injected [`Clock`].
//! Results are reported through an [`EventSink`].
//!
//! ```text
//!            connect()                 CONNACK accepted
//!   Idle ──────────────▶ AwaitingConnAck ───────────────▶ Connected
//!                          │      ▲                          │
//!           refused / lost │      │ watchdog                 │ lost / keep-alive
//!                          ▼      │                          ▼  timeout
//!                        Disconnected ◀──────────────────────┘
//!
//!   any state ── disconnect() ──▶ Closed
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use libiot_mqtt::network::application::mqtt::{Client, Clock, ConnectionOptions, Event, QoS};
//! # use libiot_mqtt::network::{Close, Connect, Connection, Read, Write};
//! # struct Socket;
//! # impl Connection for Socket {}
//! # impl Read for Socket {
//! #     type Error = ();
//! #     fn read(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # impl Write for Socket {
//! #     type Error = ();
//! #     fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> { Ok(buf.len()) }
//! #     fn flush(&mut self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # impl Close for Socket {
//! #     type Error = ();
//! #     fn close(self) -> Result<(), Self::Error> { Ok(()) }
//! # }
//! # struct Modem;
//! # impl Connect for Modem {
//! #     type Connection = Socket;
//! #     type Error = ();
//! #     fn connect(&mut self, _host: &str, _port: u16) -> Result<Socket, ()> { Ok(Socket) }
//! # }
//! # struct Ticks;
//! # impl Clock for Ticks { fn now_ms(&self) -> u64 { 0 } }
//!
//! let options = ConnectionOptions::new("broker.local", "greenhouse-7");
//! let mut client = Client::new(options, Modem, Ticks, |event: Event<'_>| {
//!     if let Event::Received(message) = event {
//!         // act on message.topic / message.content
//!     }
//! });
//!
//! client.connect();
//! loop {
//!     client.poll();
//!     if client.is_connected() {
//!         client.publish("greenhouse/7/temperature", b"23.5", QoS::AtMostOnce, false).ok();
//!     }
//! }
//! ```

use super::codec::{self, ConnectReturnCode, ControlPacketType, MAX_PACKET_LEN, MAX_PAYLOAD_LEN, MAX_TOPIC_LEN, QoS};
use super::error::{ClientError, Error};
use super::event::{Event, EventSink, Notice};
use super::options::ConnectionOptions;
use super::timer::{Clock, Timer};
use crate::network::error::Error as NetworkError;
use crate::network::{self, Close, Connect, Read};
use heapless::{Deque, FnvIndexMap, String, Vec};

/// Interval of the reconnect watchdog.
pub const WATCHDOG_INTERVAL_MS: u64 = 5_000;

/// Interval between two PINGREQs while connected.
pub const KEEP_ALIVE_INTERVAL_MS: u64 = 40_000;

/// Maximum number of unacknowledged QoS 1 publishes.
pub const MAX_INFLIGHT: usize = 8;

/// Maximum number of PUBACKs queued while a read is being dispatched.
pub const MAX_PENDING_ACKS: usize = 8;

/// Size of the stack buffer used for a single transport read.
const READ_CHUNK_LEN: usize = 512;

/// Where the client is in its connection lifecycle.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ClientState {
    /// Created, [`Client::connect`] not called yet.
    Idle,
    /// The connector is opening the transport.
    AwaitingNetwork,
    /// CONNECT sent, waiting for CONNACK.
    AwaitingConnAck,
    /// The broker accepted the connection.
    Connected,
    /// The last attempt failed or the connection dropped; the watchdog retries.
    Disconnected,
    /// Closed by [`Client::disconnect`]; nothing happens until `connect` is called again.
    Closed,
}

/// A QoS 1 publish waiting for its PUBACK.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct InFlight {
    /// Topic the message was published to.
    pub topic: String<MAX_TOPIC_LEN>,
    /// Message body.
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
    /// Retain flag of the original publish.
    pub retain: bool,
}

/// Hands out packet identifiers 1, 2, ..., 65535, 1, ...
#[derive(Debug)]
struct PacketIds {
    next: u16,
}

impl PacketIds {
    fn new() -> Self {
        Self { next: 1 }
    }

    fn next(&mut self) -> u16 {
        let id = self.next;
        self.next = if id == u16::MAX { 1 } else { id + 1 };
        id
    }
}

/// An MQTT 3.1.1 client.
///
/// # Type Parameters
///
/// * `N` - The connector used to open transport connections
/// * `K` - The clock that drives the timers
/// * `S` - The sink receiving [`Event`]s
pub struct Client<'a, N, K, S>
where
    N: Connect,
    K: Clock,
    S: EventSink,
{
    options: ConnectionOptions<'a>,
    network: N,
    clock: K,
    sink: S,
    connection: Option<N::Connection>,
    state: ClientState,
    watchdog: Timer,
    keep_alive: Timer,
    awaiting_pong: bool,
    packet_ids: PacketIds,
    inflight: FnvIndexMap<u16, InFlight, MAX_INFLIGHT>,
    pending_acks: Deque<u16, MAX_PENDING_ACKS>,
    partial: Vec<u8, MAX_PACKET_LEN>,
    skip: usize,
}

impl<'a, N, K, S> Client<'a, N, K, S>
where
    N: Connect,
    K: Clock,
    S: EventSink,
{
    /// Create an idle client. No connection is attempted until [`connect`](Self::connect).
    pub fn new(options: ConnectionOptions<'a>, network: N, clock: K, sink: S) -> Self {
        Self {
            options,
            network,
            clock,
            sink,
            connection: None,
            state: ClientState::Idle,
            watchdog: Timer::new(WATCHDOG_INTERVAL_MS),
            keep_alive: Timer::new(KEEP_ALIVE_INTERVAL_MS),
            awaiting_pong: false,
            packet_ids: PacketIds::new(),
            inflight: FnvIndexMap::new(),
            pending_acks: Deque::new(),
            partial: Vec::new(),
            skip: 0,
        }
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// Whether the broker has accepted the current connection.
    pub fn is_connected(&self) -> bool {
        self.state == ClientState::Connected
    }

    /// The options the client was created with.
    pub fn options(&self) -> &ConnectionOptions<'a> {
        &self.options
    }

    /// The event sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Number of QoS 1 publishes still waiting for a PUBACK.
    pub fn inflight(&self) -> usize {
        self.inflight.len()
    }

    /// The unacknowledged publish sent with `pid`, if any.
    pub fn inflight_message(&self, pid: u16) -> Option<&InFlight> {
        self.inflight.get(&pid)
    }

    /// Start connecting to the broker.
    ///
    /// Arms the watchdog unless it is already running, then opens a fresh
    /// transport connection, dropping any previous one. Failures are reported
    /// as events and retried by the watchdog.
    pub fn connect(&mut self) {
        let now = self.clock.now_ms();
        if !self.watchdog.is_running() {
            self.watchdog.start(now);
        }
        self.open();
    }

    /// Close the connection and stop reconnecting.
    ///
    /// Sends DISCONNECT when a connection is attached. Safe to call in any
    /// state, including before the first [`connect`](Self::connect).
    pub fn disconnect(&mut self) {
        self.watchdog.stop();
        if self.connection.is_some() && self.send(&codec::build_disconnect()).is_err() {
            debug!("DISCONNECT could not be written");
        }
        self.teardown();
        self.inflight.clear();
        self.state = ClientState::Closed;
        info!("disconnected by request");
        self.emit(Event::Closed);
    }

    /// Publish `payload` to `topic`.
    ///
    /// Returns the packet identifier for QoS 1 publishes, which stay in
    /// flight until the broker acknowledges them. When the client is not
    /// connected the message is dropped and `Ok(None)` is returned; there is
    /// no offline queue.
    ///
    /// # Errors
    ///
    /// * [`Error::UnsupportedQoS`] - QoS 2 was requested
    /// * [`Error::InflightFull`] - [`MAX_INFLIGHT`] publishes are unacknowledged
    /// * [`Error::BufferOverflow`] - topic and payload do not fit in a packet
    /// * [`Error::Transport`] - the write failed; the connection is considered lost
    pub fn publish(
        &mut self,
        topic: &str,
        payload: &[u8],
        qos: QoS,
        retain: bool,
    ) -> Result<Option<u16>, Error> {
        if qos == QoS::ExactlyOnce {
            return Err(Error::UnsupportedQoS);
        }
        if !self.is_connected() {
            return Ok(self.drop_packet());
        }

        let tracked = if qos == QoS::AtLeastOnce {
            if self.inflight.len() == MAX_INFLIGHT {
                return Err(Error::InflightFull);
            }
            let entry = InFlight {
                topic: String::try_from(topic).map_err(|_| Error::BufferOverflow)?,
                payload: Vec::from_slice(payload).map_err(|_| Error::BufferOverflow)?,
                retain,
            };
            Some((self.allocate_packet_id(), entry))
        } else {
            None
        };

        let pid = tracked.as_ref().map_or(0, |(pid, _)| *pid);
        let packet = codec::build_publish(topic, payload, qos, retain, pid)?;
        self.transmit(&packet)?;

        match tracked {
            Some((pid, entry)) => {
                self.inflight
                    .insert(pid, entry)
                    .map_err(|_| Error::InflightFull)?;
                trace!("publish {} in flight", pid);
                Ok(Some(pid))
            }
            None => Ok(None),
        }
    }

    /// Subscribe to a topic filter.
    ///
    /// Returns the packet identifier the SUBACK will carry, or `None` when
    /// the request was dropped because the client is not connected.
    pub fn subscribe(&mut self, topic: &str, qos: QoS) -> Result<Option<u16>, Error> {
        if qos == QoS::ExactlyOnce {
            return Err(Error::UnsupportedQoS);
        }
        if !self.is_connected() {
            return Ok(self.drop_packet());
        }
        let pid = self.allocate_packet_id();
        let packet = codec::build_subscribe(topic, qos, pid)?;
        self.transmit(&packet)?;
        debug!("subscribing to {} as {}", topic, pid);
        Ok(Some(pid))
    }

    /// Unsubscribe from a topic filter.
    pub fn unsubscribe(&mut self, topic: &str) -> Result<Option<u16>, Error> {
        if !self.is_connected() {
            return Ok(self.drop_packet());
        }
        let pid = self.allocate_packet_id();
        let packet = codec::build_unsubscribe(topic, pid)?;
        self.transmit(&packet)?;
        debug!("unsubscribing from {} as {}", topic, pid);
        Ok(Some(pid))
    }

    /// Drive the client: read and dispatch pending data, then run due timers.
    pub fn poll(&mut self) {
        self.receive();

        let now = self.clock.now_ms();
        if self.watchdog.poll(now) {
            self.on_watchdog();
        }
        if self.keep_alive.poll(now) {
            self.on_keep_alive();
        }
    }

    /// Feed bytes received from the transport.
    ///
    /// [`poll`](Self::poll) calls this for pull-style transports; push-style
    /// transports that deliver data through callbacks call it directly. The
    /// buffer may hold several packets. A trailing partial packet is kept
    /// and completed by the next call. A packet larger than
    /// [`MAX_PACKET_LEN`] is reported once and skipped, however many calls
    /// its bytes span. Data arriving while no connection is attached is
    /// ignored.
    pub fn handle_data(&mut self, data: &[u8]) {
        if self.connection.is_none() {
            debug!("no connection, ignoring {} bytes", data.len());
            return;
        }

        let mut data = data;
        while !data.is_empty() && self.connection.is_some() {
            let used = if self.skip > 0 {
                let n = self.skip.min(data.len());
                self.skip -= n;
                n
            } else if !self.partial.is_empty() {
                self.complete_partial(data)
            } else {
                let consumed = self.dispatch(data);
                self.stash(&data[consumed..]);
                data.len()
            };
            data = &data[used..];
        }
        self.flush_acks();
    }

    /// Report that the transport closed, for push-style transports.
    pub fn handle_close(&mut self) {
        if self.connection.is_some() {
            self.connection_lost(ClientError::ConnectionLost);
        }
    }

    fn open(&mut self) {
        self.teardown();
        self.state = ClientState::AwaitingNetwork;
        info!("connecting to {}:{}", self.options.host, self.options.port);
        self.emit(Event::Info(Notice::Connecting));

        match self.network.connect(self.options.host, self.options.port) {
            Ok(connection) => {
                self.connection = Some(connection);
                self.state = ClientState::AwaitingConnAck;
            }
            Err(_) => {
                warn!("transport connect to {} failed", self.options.host);
                self.state = ClientState::Disconnected;
                self.emit(Event::Error(ClientError::ConnectFailed));
                return;
            }
        }

        match codec::build_connect(&self.options) {
            Ok(packet) => {
                // A failed write already moved us to Disconnected.
                let _ = self.transmit(&packet);
            }
            Err(e) => {
                error!("CONNECT could not be encoded: {}", e);
                self.teardown();
                self.state = ClientState::Disconnected;
                self.emit(Event::Error(ClientError::Encode(e)));
            }
        }
    }

    fn receive(&mut self) {
        let mut buf = [0u8; READ_CHUNK_LEN];
        loop {
            let Some(connection) = self.connection.as_mut() else {
                return;
            };
            match connection.read(&mut buf) {
                Ok(0) => return,
                Ok(n) => self.handle_data(&buf[..n]),
                Err(_) => {
                    self.connection_lost(ClientError::ConnectionLost);
                    return;
                }
            }
        }
    }

    /// Dispatch every complete packet in `data`, returning how many bytes
    /// were used. Unused bytes are the start of a packet that fits in
    /// `partial`.
    fn dispatch(&mut self, data: &[u8]) -> usize {
        let mut offset = 0;
        while offset < data.len() {
            let rest = &data[offset..];
            // Zero padding after the last packet ends the buffer.
            if rest[0] == 0 {
                break;
            }
            let total = match codec::frame_length(rest) {
                Ok(total) => total,
                Err(Error::Incomplete) => match declared_length(rest) {
                    Some(total) if total > MAX_PACKET_LEN => total,
                    _ => return offset,
                },
                Err(e) => {
                    warn!("dropping {} undecodable bytes", rest.len());
                    self.emit(Event::Error(ClientError::Malformed(e)));
                    break;
                }
            };
            if total > MAX_PACKET_LEN {
                let available = total.min(rest.len());
                self.drop_oversized(total, available);
                offset += available;
                continue;
            }
            self.dispatch_packet(&rest[..total]);
            offset += total;
            if self.connection.is_none() {
                break;
            }
        }
        data.len()
    }

    /// Append bytes to the packet held in `partial` until it is complete,
    /// then dispatch it. Returns how many bytes of `data` were used.
    fn complete_partial(&mut self, data: &[u8]) -> usize {
        let mut used = 0;
        loop {
            let needed = match codec::frame_length(&self.partial) {
                Ok(_) => {
                    let packet = core::mem::take(&mut self.partial);
                    self.dispatch_packet(&packet);
                    return used;
                }
                Err(Error::Incomplete) => match declared_length(&self.partial) {
                    Some(total) if total > MAX_PACKET_LEN => {
                        let held = self.partial.len();
                        self.partial.clear();
                        self.drop_oversized(total, held);
                        return used;
                    }
                    Some(total) => total - self.partial.len(),
                    // Still inside the remaining length field.
                    None => 1,
                },
                Err(e) => {
                    self.partial.clear();
                    self.emit(Event::Error(ClientError::Malformed(e)));
                    return data.len();
                }
            };
            if used == data.len() {
                return used;
            }
            let take = needed.min(data.len() - used);
            if self
                .partial
                .extend_from_slice(&data[used..used + take])
                .is_err()
            {
                self.partial.clear();
                self.emit(Event::Error(ClientError::Malformed(Error::BufferOverflow)));
                return data.len();
            }
            used += take;
        }
    }

    /// Report a packet of `total` bytes that cannot be buffered and skip the
    /// part of it not yet seen.
    fn drop_oversized(&mut self, total: usize, seen: usize) {
        warn!("dropping {} byte packet", total);
        self.skip = total - seen;
        self.emit(Event::Error(ClientError::Malformed(Error::BufferOverflow)));
    }

    fn stash(&mut self, rest: &[u8]) {
        if rest.is_empty() {
            return;
        }
        if self.partial.extend_from_slice(rest).is_err() {
            self.partial.clear();
            self.emit(Event::Error(ClientError::Malformed(Error::BufferOverflow)));
        }
    }

    fn dispatch_packet(&mut self, packet: &[u8]) {
        self.awaiting_pong = false;

        let kind = match ControlPacketType::from_header(packet[0]) {
            Ok(kind) => kind,
            Err(_) => {
                self.emit(Event::Error(ClientError::UnexpectedPacket(packet[0] >> 4)));
                return;
            }
        };

        match kind {
            ControlPacketType::ConnAck => self.on_connack(packet),
            ControlPacketType::Publish => match codec::parse_publish(packet) {
                Ok(message) => {
                    trace!("publish on {}", message.topic.as_str());
                    if let (QoS::AtLeastOnce, Some(pid)) = (message.qos, message.pid) {
                        self.queue_ack(pid);
                    }
                    self.emit(Event::Received(&message));
                }
                Err(e) => self.emit(Event::Error(ClientError::Malformed(e))),
            },
            ControlPacketType::PingResp => {
                trace!("PINGRESP");
                self.emit(Event::Debug(Notice::PingResponse));
            }
            ControlPacketType::PubAck => match codec::parse_packet_id(packet) {
                Ok(pid) => {
                    let notice = match self.inflight.remove(&pid) {
                        Some(_) => Notice::PublishAcknowledged(pid),
                        None => Notice::UnknownAcknowledgement(pid),
                    };
                    self.emit(Event::Debug(notice));
                }
                Err(e) => self.emit(Event::Error(ClientError::Malformed(e))),
            },
            ControlPacketType::SubAck => match codec::parse_packet_id(packet) {
                Ok(pid) => self.emit(Event::Debug(Notice::SubscribeAcknowledged(pid))),
                Err(e) => self.emit(Event::Error(ClientError::Malformed(e))),
            },
            ControlPacketType::UnsubAck => match codec::parse_packet_id(packet) {
                Ok(pid) => self.emit(Event::Debug(Notice::UnsubscribeAcknowledged(pid))),
                Err(e) => self.emit(Event::Error(ClientError::Malformed(e))),
            },
            other => {
                warn!("unexpected packet type {}", other as u8);
                self.emit(Event::Error(ClientError::UnexpectedPacket(other as u8)));
            }
        }
    }

    fn on_connack(&mut self, packet: &[u8]) {
        if self.state != ClientState::AwaitingConnAck {
            self.emit(Event::Error(ClientError::UnexpectedPacket(
                ControlPacketType::ConnAck as u8,
            )));
            return;
        }
        match codec::parse_connack(packet) {
            Ok(ConnectReturnCode::Accepted) => {
                self.state = ClientState::Connected;
                self.inflight.clear();
                self.awaiting_pong = false;
                self.keep_alive.start(self.clock.now_ms());
                info!("connected as {}", self.options.client_id);
                self.emit(Event::Connected);
            }
            Ok(code) => {
                warn!("broker refused connection with code {}", code.to_u8());
                self.teardown();
                self.state = ClientState::Disconnected;
                self.emit(Event::Error(ClientError::Refused(code)));
            }
            Err(e) => self.emit(Event::Error(ClientError::Malformed(e))),
        }
    }

    fn on_watchdog(&mut self) {
        match self.state {
            ClientState::Connected => {}
            ClientState::AwaitingNetwork | ClientState::AwaitingConnAck => {
                warn!("no CONNACK within {} ms", WATCHDOG_INTERVAL_MS);
                self.emit(Event::Error(ClientError::ConnAckTimeout));
                self.open();
            }
            ClientState::Disconnected => {
                self.emit(Event::Info(Notice::Reconnecting));
                self.open();
            }
            ClientState::Idle | ClientState::Closed => self.watchdog.stop(),
        }
    }

    fn on_keep_alive(&mut self) {
        if !self.is_connected() {
            self.keep_alive.stop();
            return;
        }
        if self.awaiting_pong {
            warn!("no traffic for {} ms", KEEP_ALIVE_INTERVAL_MS);
            self.connection_lost(ClientError::KeepAliveTimeout);
            return;
        }
        if self.transmit(&codec::build_pingreq()).is_ok() {
            self.awaiting_pong = true;
            self.emit(Event::Debug(Notice::PingSent));
        }
    }

    fn queue_ack(&mut self, pid: u16) {
        if self.pending_acks.push_back(pid).is_err() {
            self.flush_acks();
            let _ = self.pending_acks.push_back(pid);
        }
    }

    fn flush_acks(&mut self) {
        if self.connection.is_none() {
            self.pending_acks.clear();
            return;
        }
        while let Some(pid) = self.pending_acks.pop_front() {
            if self.transmit(&codec::build_puback(pid)).is_err() {
                break;
            }
        }
    }

    fn allocate_packet_id(&mut self) -> u16 {
        // At most MAX_INFLIGHT ids are taken, so this terminates quickly.
        loop {
            let pid = self.packet_ids.next();
            if !self.inflight.contains_key(&pid) {
                return pid;
            }
        }
    }

    fn drop_packet(&mut self) -> Option<u16> {
        debug!("not connected, dropping outgoing packet");
        self.emit(Event::Debug(Notice::Dropped));
        None
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let connection = self
            .connection
            .as_mut()
            .ok_or(Error::Transport(NetworkError::NotOpen))?;
        network::write_all(connection, bytes)?;
        Ok(())
    }

    /// Write `bytes`, treating a failure as loss of the connection.
    fn transmit(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let result = self.send(bytes);
        if result.is_err() {
            self.connection_lost(ClientError::ConnectionLost);
        }
        result
    }

    fn connection_lost(&mut self, reason: ClientError) {
        let was_connected = self.is_connected();
        self.teardown();
        self.state = ClientState::Disconnected;
        warn!("connection lost: {}", reason);
        self.emit(Event::Error(reason));
        if was_connected {
            self.emit(Event::Disconnected);
        }
    }

    /// Drop the transport connection and everything tied to it.
    fn teardown(&mut self) {
        self.keep_alive.stop();
        self.awaiting_pong = false;
        self.pending_acks.clear();
        self.partial.clear();
        self.skip = 0;
        if let Some(connection) = self.connection.take() {
            if connection.close().is_err() {
                debug!("transport close failed");
            }
        }
    }

    fn emit(&mut self, event: Event<'_>) {
        self.sink.on_event(event);
    }
}

/// Total size announced by the fixed header at the start of `buf`, if the
/// remaining length field is complete.
fn declared_length(buf: &[u8]) -> Option<usize> {
    let (remaining, len_bytes) = codec::decode_remaining_length(buf.get(1..)?).ok()?;
    Some(1 + len_bytes + remaining as usize)
}

impl<N, K, S> core::fmt::Debug for Client<'_, N, K, S>
where
    N: Connect,
    K: Clock,
    S: EventSink,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Client")
            .field("client_id", &self.options.client_id)
            .field("state", &self.state)
            .field("inflight", &self.inflight.len())
            .finish()
    }
}
