use criterion::{BatchSize, Criterion, Throughput};
use libiot_mqtt::network::application::mqtt::codec::build_publish;
use libiot_mqtt::network::application::mqtt::{Client, Clock, ConnectionOptions, Event, QoS};
use libiot_mqtt::network::error::Error;
use libiot_mqtt::network::{Close, Connect, Connection, Read, Write};
use std::hint::black_box;

/// Accepts every write and answers the first read with a CONNACK.
struct NullConnection {
    connack: bool,
}

impl Read for NullConnection {
    type Error = Error;
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if self.connack {
            return Ok(0);
        }
        self.connack = true;
        buf[..4].copy_from_slice(&[0x20, 0x02, 0x00, 0x00]);
        Ok(4)
    }
}

impl Write for NullConnection {
    type Error = Error;
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Close for NullConnection {
    type Error = Error;
    fn close(self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl Connection for NullConnection {}

struct NullNetwork;

impl Connect for NullNetwork {
    type Connection = NullConnection;
    type Error = Error;
    fn connect(&mut self, _host: &str, _port: u16) -> Result<NullConnection, Error> {
        Ok(NullConnection { connack: false })
    }
}

struct FrozenClock;

impl Clock for FrozenClock {
    fn now_ms(&self) -> u64 {
        0
    }
}

type BenchClient = Client<'static, NullNetwork, FrozenClock, fn(Event<'_>)>;

fn ignore(event: Event<'_>) {
    black_box(event);
}

fn setup_client() -> BenchClient {
    let options = ConnectionOptions::new("bench.local", "libiot-bench");
    let mut client = Client::new(options, NullNetwork, FrozenClock, ignore as fn(Event<'_>));
    client.connect();
    client.poll();
    assert!(client.is_connected(), "Failed to connect");
    client
}

pub fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish");
    let payload = b"hello world from bench";
    group.throughput(Throughput::Bytes(payload.len() as u64 * 50));
    group.bench_function("publish_qos0", |b| {
        b.iter_batched_ref(
            setup_client,
            |client| {
                for _ in 0..50 {
                    client
                        .publish("libiot/bench-topic", payload, QoS::AtMostOnce, false)
                        .expect("Failed to publish");
                }
            },
            BatchSize::SmallInput,
        )
    });
    group.finish();
}

pub fn bench_handle_data(c: &mut Criterion) {
    let mut group = c.benchmark_group("handle_data");
    let mut data = Vec::new();
    for i in 0..20u16 {
        let packet = build_publish("libiot/bench-topic", b"23.5", QoS::AtLeastOnce, false, i + 1)
            .expect("Failed to build");
        data.extend_from_slice(&packet);
    }
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("twenty_qos1_publishes", |b| {
        b.iter_batched_ref(
            setup_client,
            |client| client.handle_data(black_box(&data)),
            BatchSize::SmallInput,
        )
    });
    group.finish();
}
