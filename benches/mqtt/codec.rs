use criterion::{Criterion, Throughput};
use libiot_mqtt::network::application::mqtt::codec::{
    MAX_REMAINING_LENGTH, build_publish, encode_remaining_length, parse_publish,
};
use libiot_mqtt::network::application::mqtt::QoS;
use std::hint::black_box;

pub fn bench_encode_remaining_length(c: &mut Criterion) {
    c.bench_function("encode_remaining_length", |b| {
        b.iter(|| {
            for len in [0, 127, 128, 16_383, 16_384, 2_097_152, MAX_REMAINING_LENGTH] {
                black_box(encode_remaining_length(black_box(len)));
            }
        })
    });
}

pub fn bench_build_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_publish");
    let payload = [0x5Au8; 512];
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("qos1_512b", |b| {
        b.iter(|| {
            build_publish(
                black_box("libiot/bench/topic"),
                black_box(&payload),
                QoS::AtLeastOnce,
                false,
                42,
            )
            .expect("Failed to build")
        })
    });
    group.finish();
}

pub fn bench_parse_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse_publish");
    let payload = [0x5Au8; 512];
    let packet = build_publish("libiot/bench/topic", &payload, QoS::AtLeastOnce, false, 42)
        .expect("Failed to build");
    group.throughput(Throughput::Bytes(packet.len() as u64));
    group.bench_function("qos1_512b", |b| {
        b.iter(|| parse_publish(black_box(&packet)).expect("Failed to parse"))
    });
    group.finish();
}
