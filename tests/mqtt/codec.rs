use libiot_mqtt::network::application::mqtt::codec::*;
use libiot_mqtt::network::application::mqtt::{ConnectionOptions, Error, Will};
use rand::distributions::Alphanumeric;
use rand::{Rng, thread_rng};

#[test]
fn test_remaining_length_boundaries() {
    let cases: [(u32, &[u8]); 8] = [
        (0, &[0x00]),
        (127, &[0x7F]),
        (128, &[0x80, 0x01]),
        (16_383, &[0xFF, 0x7F]),
        (16_384, &[0x80, 0x80, 0x01]),
        (2_097_151, &[0xFF, 0xFF, 0x7F]),
        (2_097_152, &[0x80, 0x80, 0x80, 0x01]),
        (MAX_REMAINING_LENGTH, &[0xFF, 0xFF, 0xFF, 0x7F]),
    ];
    for (value, bytes) in cases {
        assert_eq!(&encode_remaining_length(value)[..], bytes, "encoding {value}");
        assert_eq!(decode_remaining_length(bytes), Ok((value, bytes.len())));
    }
}

#[test]
#[should_panic]
fn test_remaining_length_overflow_panics() {
    encode_remaining_length(MAX_REMAINING_LENGTH + 1);
}

#[test]
fn test_decode_remaining_length_errors() {
    assert_eq!(
        decode_remaining_length(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01]),
        Err(Error::MalformedRemainingLength)
    );
    assert_eq!(decode_remaining_length(&[0x80, 0x80]), Err(Error::Incomplete));
    assert_eq!(decode_remaining_length(&[]), Err(Error::Incomplete));
}

#[test]
fn test_frame_length() {
    assert_eq!(frame_length(&[0xD0, 0x00]), Ok(2));
    assert_eq!(frame_length(&[0x40, 0x02, 0x00, 0x01, 0x30]), Ok(4));
    assert_eq!(frame_length(&[0x40, 0x02, 0x00]), Err(Error::Incomplete));
}

#[test]
fn test_connect_flags() {
    let base = ConnectionOptions::new("h", "c");
    assert_eq!(connect_flags(&base), 0x02);

    let mut user_only = base.with_credentials("user", None);
    assert_eq!(connect_flags(&user_only), 0x82);
    assert_eq!(connect_flags(&base.with_credentials("user", Some("pw"))), 0xC2);

    // A password without a user name is never sent.
    user_only.username = None;
    user_only.password = Some("pw");
    assert_eq!(connect_flags(&user_only), 0x02);

    let will = Will {
        qos: QoS::AtLeastOnce,
        retain: true,
        ..Will::new("c/status", "offline")
    };
    assert_eq!(connect_flags(&base.with_will(will)), 0x2E);
    assert_eq!(
        connect_flags(&base.with_will(will).with_credentials("u", Some("p"))),
        0xEE
    );
}

#[test]
fn test_build_connect_minimal() {
    let packet = build_connect(&ConnectionOptions::new("h", "c")).unwrap();
    assert_eq!(
        &packet[..],
        &[
            0x10, 13, 0x00, 0x04, b'M', b'Q', b'T', b'T', 0x04, 0x02, 0x00, 0x3C, 0x00, 0x01, b'c'
        ]
    );
}

#[test]
fn test_build_connect_payload_order() {
    let options = ConnectionOptions::new("h", "id")
        .with_will(Will::new("w", "bye"))
        .with_credentials("u", Some("p"));
    let packet = build_connect(&options).unwrap();
    let payload = &packet[12..];
    assert_eq!(
        payload,
        &[0, 2, b'i', b'd', 0, 1, b'w', 0, 3, b'b', b'y', b'e', 0, 1, b'u', 0, 1, b'p']
    );
}

#[test]
fn test_fixed_packets() {
    assert_eq!(build_pingreq(), [0xC0, 0x00]);
    assert_eq!(build_disconnect(), [0xE0, 0x00]);
    assert_eq!(build_puback(0x1234), [0x40, 0x02, 0x12, 0x34]);
}

#[test]
fn test_build_subscribe() {
    let packet = build_subscribe("a/b", QoS::AtLeastOnce, 10).unwrap();
    assert_eq!(&packet[..], &[0x82, 8, 0, 10, 0, 3, b'a', b'/', b'b', 1]);
}

#[test]
fn test_build_unsubscribe() {
    let packet = build_unsubscribe("a/b", 11).unwrap();
    assert_eq!(&packet[..], &[0xA2, 7, 0, 11, 0, 3, b'a', b'/', b'b']);
}

#[test]
fn test_return_code_descriptions() {
    let expected = [
        "Connection Accepted.",
        "Connection Refused, unacceptable protocol version.",
        "Connection Refused, identifier rejected.",
        "Connection Refused, server unavailable.",
        "Connection Refused, bad user name or password.",
        "Connection Refused, not authorized.",
    ];
    for (code, text) in expected.iter().enumerate() {
        assert_eq!(describe_connect_return_code(code as u8), *text);
    }
    assert_eq!(describe_connect_return_code(6), "unknown return code: 6.");
    assert_eq!(describe_connect_return_code(255), "unknown return code: 255.");
}

#[test]
fn test_parse_connack() {
    assert_eq!(parse_connack(&[0x20, 0x02, 0x00, 0x00]), Ok(ConnectReturnCode::Accepted));
    assert_eq!(
        parse_connack(&[0x20, 0x02, 0x00, 0x04]),
        Ok(ConnectReturnCode::BadUserNameOrPassword)
    );
    assert_eq!(parse_connack(&[0x20, 0x02, 0x00, 0x09]), Ok(ConnectReturnCode::Unknown(9)));
    assert_eq!(parse_connack(&[0x20, 0x02, 0x00]), Err(Error::Incomplete));
    assert_eq!(parse_connack(&[0x30, 0x02, 0x00, 0x00]), Err(Error::MalformedPacket));
}

#[test]
fn test_parse_packet_id() {
    assert_eq!(parse_packet_id(&[0x40, 0x02, 0xAB, 0xCD]), Ok(0xABCD));
    assert_eq!(parse_packet_id(&[0x90, 0x03, 0x00, 0x07, 0x01]), Ok(7));
    assert_eq!(parse_packet_id(&[0x40, 0x01, 0xAB]), Err(Error::MalformedPacket));
}

#[test]
fn test_packet_type_from_header() {
    assert_eq!(ControlPacketType::from_header(0x32), Ok(ControlPacketType::Publish));
    assert_eq!(ControlPacketType::from_header(0xD0), Ok(ControlPacketType::PingResp));
    assert_eq!(ControlPacketType::try_from(0), Err(Error::InvalidPacketType));
    assert_eq!(ControlPacketType::try_from(15), Err(Error::InvalidPacketType));
}

#[test]
fn test_publish_round_trip() {
    for qos in [QoS::AtMostOnce, QoS::AtLeastOnce] {
        for retain in [false, true] {
            let packet = build_publish("home/kitchen", b"21.0", qos, retain, 99).unwrap();
            let message = parse_publish(&packet).unwrap();
            assert_eq!(message.topic.as_str(), "home/kitchen");
            assert_eq!(&message.content[..], b"21.0");
            assert_eq!(message.qos, qos);
            assert_eq!(message.retain, retain);
            assert_eq!(message.pid, (qos == QoS::AtLeastOnce).then_some(99));
        }
    }
}

#[test]
fn test_publish_long_payload() {
    let payload = [0xA5u8; 200];
    let packet = build_publish("big", &payload, QoS::AtMostOnce, false, 0).unwrap();
    // 2 + 3 topic bytes + 200 payload bytes need two length bytes.
    assert_eq!(&packet[1..3], &[0xCD, 0x01]);

    let message = parse_publish(&packet).unwrap();
    assert_eq!(message.content.len(), 200);
    assert_eq!(&message.content[..], &payload[..]);
}

#[test]
fn test_publish_next_offset() {
    let first = build_publish("a", b"1", QoS::AtMostOnce, false, 0).unwrap();
    let second = build_publish("b", b"2", QoS::AtLeastOnce, false, 5).unwrap();
    let mut buf = first.to_vec();
    buf.extend_from_slice(&second);

    let message = parse_publish(&buf).unwrap();
    assert_eq!(message.next, Some(first.len()));
    let message = parse_publish(&buf[first.len()..]).unwrap();
    assert_eq!(message.topic.as_str(), "b");
    assert_eq!(message.next, None);

    let mut padded = first.to_vec();
    padded.extend_from_slice(&[0, 0]);
    assert_eq!(parse_publish(&padded).unwrap().next, None);
}

#[test]
fn test_publish_random_round_trip() {
    let mut rng = thread_rng();
    for _ in 0..200 {
        let topic_len = rng.gen_range(1..=MAX_TOPIC_LEN);
        let topic: String = (&mut rng)
            .sample_iter(Alphanumeric)
            .take(topic_len)
            .map(char::from)
            .collect();
        let mut payload = vec![0u8; rng.gen_range(0..=MAX_PAYLOAD_LEN - 16)];
        rng.fill(&mut payload[..]);
        let qos = if rng.gen_bool(0.5) {
            QoS::AtLeastOnce
        } else {
            QoS::AtMostOnce
        };
        let pid = rng.gen_range(1..=u16::MAX);

        let packet = build_publish(&topic, &payload, qos, false, pid).unwrap();
        assert_eq!(frame_length(&packet), Ok(packet.len()));
        let message = parse_publish(&packet).unwrap();
        assert_eq!(message.topic.as_str(), topic);
        assert_eq!(&message.content[..], &payload[..]);
    }
}

#[test]
fn test_publish_too_large() {
    let payload = [0u8; MAX_PACKET_LEN];
    assert_eq!(
        build_publish("t", &payload, QoS::AtMostOnce, false, 0),
        Err(Error::BufferOverflow)
    );
}

#[test]
fn test_parse_publish_errors() {
    assert_eq!(
        parse_publish(&[0x30, 0x05, 0x00, 0x02, 0xFF, 0xFE, b'x']),
        Err(Error::InvalidUtf8)
    );
    assert_eq!(parse_publish(&[0x30, 0x0A, 0x00, 0x01]), Err(Error::Incomplete));
    assert_eq!(parse_publish(&[0x30, 0x02, 0x00, 0x05]), Err(Error::MalformedPacket));
    assert_eq!(parse_publish(&[0x36, 0x02, 0x00, 0x00]), Err(Error::MalformedPacket));
    assert_eq!(parse_publish(&[0x40, 0x02, 0x00, 0x01]), Err(Error::MalformedPacket));
}

#[test]
fn test_pack_string() {
    let packed: heapless::Vec<u8, 8> = pack_string("abc").unwrap();
    assert_eq!(&packed[..], &[0, 3, b'a', b'b', b'c']);

    let long = "x".repeat(65_536);
    assert_eq!(pack_string::<16>(&long), Err(Error::StringTooLong));
    assert_eq!(pack_string::<4>("abc"), Err(Error::BufferOverflow));
}
