//! Round trip against a real broker.
//!
//! Ignored by default. Run with
//! `cargo test --features std -- --ignored` and optionally set
//! `TEST_MQTT_ADDRESS=host:port` in the environment or a `.env` file.

#![cfg(feature = "std")]

use dotenvy::dotenv;
use libiot_mqtt::network::application::mqtt::{
    Client, ConnectionOptions, Event, Notice, QoS, StdClock,
};
use libiot_mqtt::network::tcp::TcpConnector;
use std::cell::RefCell;
use std::env;
use std::rc::Rc;
use std::time::{Duration, Instant};

#[derive(Debug, Default)]
struct Seen {
    connected: bool,
    acknowledged: bool,
    suback: bool,
    payloads: Vec<Vec<u8>>,
}

fn broker_address() -> (String, u16) {
    dotenv().ok();
    let address = env::var("TEST_MQTT_ADDRESS").unwrap_or("test.mosquitto.org:1883".to_string());
    let (host, port) = address.rsplit_once(':').expect("address must be host:port");
    (host.to_string(), port.parse().expect("invalid port"))
}

fn poll_until<F>(client: &mut impl FnMut(), mut done: F)
where
    F: FnMut() -> bool,
{
    let start = Instant::now();
    while !done() {
        assert!(start.elapsed() < Duration::from_secs(15), "broker did not answer in time");
        client();
        std::thread::sleep(Duration::from_millis(20));
    }
}

#[test]
#[ignore]
fn test_publish_subscribe_round_trip() {
    let (host, port) = broker_address();
    let seen = Rc::new(RefCell::new(Seen::default()));
    let sink = {
        let seen = seen.clone();
        move |event: Event<'_>| {
            let mut seen = seen.borrow_mut();
            match event {
                Event::Connected => seen.connected = true,
                Event::Debug(Notice::PublishAcknowledged(_)) => seen.acknowledged = true,
                Event::Debug(Notice::SubscribeAcknowledged(_)) => seen.suback = true,
                Event::Received(message) => seen.payloads.push(message.content.to_vec()),
                _ => {}
            }
        }
    };

    let options = ConnectionOptions::new(&host, "libiot-mqtt-test").with_port(port);
    let mut client = Client::new(options, TcpConnector::new(), StdClock::new(), sink);
    client.connect();

    let client = RefCell::new(client);
    let mut poll = || client.borrow_mut().poll();

    poll_until(&mut poll, || seen.borrow().connected);

    client
        .borrow_mut()
        .subscribe("libiot-mqtt/test/echo", QoS::AtLeastOnce)
        .unwrap();
    poll_until(&mut poll, || seen.borrow().suback);

    client
        .borrow_mut()
        .publish("libiot-mqtt/test/echo", b"ping", QoS::AtLeastOnce, false)
        .unwrap();
    poll_until(&mut poll, || {
        let seen = seen.borrow();
        seen.acknowledged && seen.payloads.iter().any(|p| p == b"ping")
    });

    client.borrow_mut().disconnect();
    assert!(!client.borrow().is_connected());
}
