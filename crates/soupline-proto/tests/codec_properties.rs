//! Property tests for the wire codec.
//!
//! Two laws hold for every input proptest can find:
//!
//! - Framing: any frame sequence, serialized back to back and cut at arbitrary
//!   points, comes out of [`FrameReader`] unchanged and in order.
//! - Round trip: decoding an encoded packet or record yields the value that
//!   went in, as long as every text field fits its width.

use bytes::{Bytes, BytesMut};
use proptest::prelude::*;
use soupline_proto::{
    ClientMessage, ExchangeMessage, Frame, FrameReader, Price, SessionPacket, Side,
    ouch::{
        CancelOrder, CancelOrderById, EnterOrder, MassQuote, MassQuoteAck, MassQuoteReject,
        OrderAck, OrderCancelAck, OrderExecuted, OrderReject, OrderReplaceAck, QuoteEntry,
        ReplaceOrder,
    },
    packet::{LoginAccepted, LoginRequest},
};

fn side() -> impl Strategy<Value = Side> {
    prop_oneof![Just(Side::Buy), Just(Side::Sell), Just(Side::ShortSell)]
}

fn price() -> impl Strategy<Value = Price> {
    prop_oneof![
        Just(Price::ZERO),
        Just(Price::from_minor(i32::MIN)),
        Just(Price::from_minor(i32::MAX)),
        any::<i32>().prop_map(Price::from_minor),
    ]
}

fn quantity() -> impl Strategy<Value = u64> {
    prop_oneof![Just(0u64), Just(u64::MAX), any::<u64>()]
}

fn reason() -> impl Strategy<Value = i8> {
    prop_oneof![Just(0i8), Just(i8::MIN), Just(i8::MAX), any::<i8>()]
}

/// Text that survives pad stripping: no trailing pad byte can be generated.
fn text(max: usize) -> impl Strategy<Value = String> {
    proptest::string::string_regex(&format!("[A-Za-z0-9]{{0,{max}}}")).unwrap()
}

fn frame() -> impl Strategy<Value = Frame> {
    (any::<u8>(), proptest::collection::vec(any::<u8>(), 0..64))
        .prop_map(|(packet_type, payload)| Frame::new(packet_type, payload))
}

fn enter_order() -> impl Strategy<Value = EnterOrder> {
    (
        (text(14), any::<u32>(), side(), quantity(), price()),
        (any::<u8>(), any::<u8>(), text(16), text(15), text(32)),
        (quantity(), any::<u8>(), any::<u8>(), any::<[u8; 7]>()),
    )
        .prop_map(
            |(
                (order_token, order_book_id, side, quantity, price),
                (time_in_force, open_close, client_account, customer_info, exchange_info),
                (display_quantity, client_category, off_hours, reserved),
            )| EnterOrder {
                order_token,
                order_book_id,
                side,
                quantity,
                price,
                time_in_force,
                open_close,
                client_account,
                customer_info,
                exchange_info,
                display_quantity,
                client_category,
                off_hours,
                reserved,
            },
        )
}

fn replace_order() -> impl Strategy<Value = ReplaceOrder> {
    (
        (text(14), text(14), quantity(), price(), any::<u8>()),
        (text(16), text(15), text(32), quantity(), any::<u8>(), any::<[u8; 8]>()),
    )
        .prop_map(
            |(
                (existing_order_token, replacement_order_token, quantity, price, open_close),
                (
                    client_account,
                    customer_info,
                    exchange_info,
                    display_quantity,
                    client_category,
                    reserved,
                ),
            )| ReplaceOrder {
                existing_order_token,
                replacement_order_token,
                quantity,
                price,
                open_close,
                client_account,
                customer_info,
                exchange_info,
                display_quantity,
                client_category,
                reserved,
            },
        )
}

fn mass_quote() -> impl Strategy<Value = MassQuote> {
    let entry = (any::<u32>(), price(), price(), quantity(), quantity()).prop_map(
        |(order_book_id, bid_price, offer_price, bid_size, offer_size)| QuoteEntry {
            order_book_id,
            bid_price,
            offer_price,
            bid_size,
            offer_size,
        },
    );
    (text(14), any::<u8>(), text(16), text(16), proptest::collection::vec(entry, 1..=5)).prop_map(
        |(order_token, client_category, client_account, exchange_info, entries)| MassQuote {
            order_token,
            client_category,
            client_account,
            exchange_info,
            entries,
        },
    )
}

fn client_message() -> impl Strategy<Value = ClientMessage> {
    prop_oneof![
        enter_order().prop_map(ClientMessage::EnterOrder),
        replace_order().prop_map(ClientMessage::ReplaceOrder),
        text(14).prop_map(|order_token| ClientMessage::CancelOrder(CancelOrder { order_token })),
        (any::<u32>(), side(), any::<u64>()).prop_map(|(order_book_id, side, order_id)| {
            ClientMessage::CancelOrderById(CancelOrderById { order_book_id, side, order_id })
        }),
        mass_quote().prop_map(ClientMessage::MassQuote),
    ]
}

fn order_ack() -> impl Strategy<Value = OrderAck> {
    (
        (any::<u64>(), text(14), any::<u32>(), side(), any::<u64>(), quantity()),
        (price(), any::<u8>(), any::<u8>(), text(16), any::<u8>(), text(15)),
        (text(32), quantity(), quantity(), any::<u8>(), any::<u8>(), any::<[u8; 3]>()),
    )
        .prop_map(
            |(
                (timestamp, order_token, order_book_id, side, order_id, quantity),
                (price, time_in_force, open_close, client_account, order_state, customer_info),
                (
                    exchange_info,
                    pretrade_quantity,
                    display_quantity,
                    client_category,
                    off_hours,
                    reserved,
                ),
            )| OrderAck {
                timestamp,
                order_token,
                order_book_id,
                side,
                order_id,
                quantity,
                price,
                time_in_force,
                open_close,
                client_account,
                order_state,
                customer_info,
                exchange_info,
                pretrade_quantity,
                display_quantity,
                client_category,
                off_hours,
                reserved,
            },
        )
}

fn order_replace_ack() -> impl Strategy<Value = OrderReplaceAck> {
    (
        (any::<u64>(), text(14), text(14), any::<u32>(), side(), any::<u64>()),
        (quantity(), price(), any::<u8>(), any::<u8>(), text(16), any::<u8>()),
        (text(15), text(32), quantity(), quantity(), any::<u8>(), any::<[u8; 8]>()),
    )
        .prop_map(
            |(
                (
                    timestamp,
                    replacement_order_token,
                    previous_order_token,
                    order_book_id,
                    side,
                    order_id,
                ),
                (quantity, price, time_in_force, open_close, client_account, order_state),
                (
                    customer_info,
                    exchange_info,
                    pretrade_quantity,
                    display_quantity,
                    client_category,
                    reserved,
                ),
            )| OrderReplaceAck {
                timestamp,
                replacement_order_token,
                previous_order_token,
                order_book_id,
                side,
                order_id,
                quantity,
                price,
                time_in_force,
                open_close,
                client_account,
                order_state,
                customer_info,
                exchange_info,
                pretrade_quantity,
                display_quantity,
                client_category,
                reserved,
            },
        )
}

fn exchange_message() -> impl Strategy<Value = ExchangeMessage> {
    prop_oneof![
        order_ack().prop_map(ExchangeMessage::OrderAck),
        order_replace_ack().prop_map(ExchangeMessage::OrderReplaceAck),
        (any::<u64>(), text(14), any::<i32>()).prop_map(|(timestamp, order_token, reject_code)| {
            ExchangeMessage::OrderReject(OrderReject { timestamp, order_token, reject_code })
        }),
        (any::<u64>(), text(14), any::<u32>(), side(), any::<u64>(), reason()).prop_map(
            |(timestamp, order_token, order_book_id, side, order_id, reason)| {
                ExchangeMessage::OrderCancelAck(OrderCancelAck {
                    timestamp,
                    order_token,
                    order_book_id,
                    side,
                    order_id,
                    reason,
                })
            }
        ),
        (
            (any::<u64>(), text(14), any::<u32>(), quantity(), quantity()),
            (price(), any::<u64>(), any::<u8>(), any::<[u8; 16]>()),
        )
            .prop_map(
                |(
                    (timestamp, order_token, order_book_id, traded_quantity, leaves_quantity),
                    (trade_price, match_id, client_category, reserved),
                )| {
                    ExchangeMessage::OrderExecuted(OrderExecuted {
                        timestamp,
                        order_token,
                        order_book_id,
                        traded_quantity,
                        leaves_quantity,
                        trade_price,
                        match_id,
                        client_category,
                        reserved,
                    })
                }
            ),
        (
            (any::<u64>(), text(14), any::<u32>(), side()),
            (any::<u32>(), quantity(), quantity(), price()),
        )
            .prop_map(
                |(
                    (timestamp, order_token, order_book_id, side),
                    (quote_status, quantity, traded_quantity, price),
                )| {
                    ExchangeMessage::MassQuoteAck(MassQuoteAck {
                        timestamp,
                        order_token,
                        order_book_id,
                        side,
                        quote_status,
                        quantity,
                        traded_quantity,
                        price,
                    })
                }
            ),
        (any::<u64>(), text(14), any::<u32>(), any::<i32>()).prop_map(
            |(timestamp, order_token, order_book_id, reject_code)| {
                ExchangeMessage::MassQuoteReject(MassQuoteReject {
                    timestamp,
                    order_token,
                    order_book_id,
                    reject_code,
                })
            }
        ),
    ]
}

fn session_packet() -> impl Strategy<Value = SessionPacket> {
    let data = proptest::collection::vec(any::<u8>(), 0..200).prop_map(Bytes::from);
    prop_oneof![
        (text(6), text(10), text(10), any::<u64>()).prop_map(
            |(username, password, requested_session, requested_sequence)| {
                SessionPacket::LoginRequest(LoginRequest {
                    username,
                    password,
                    requested_session,
                    requested_sequence,
                })
            }
        ),
        (text(10), any::<u64>()).prop_map(|(session, sequence)| {
            SessionPacket::LoginAccepted(LoginAccepted { session, sequence })
        }),
        text(1).prop_map(|reason| SessionPacket::LoginRejected { reason }),
        data.clone().prop_map(|message| SessionPacket::SequencedData { message }),
        data.prop_map(|message| SessionPacket::UnsequencedData { message }),
        text(80).prop_map(|text| SessionPacket::Debug { text }),
        Just(SessionPacket::ClientHeartbeat),
        Just(SessionPacket::ServerHeartbeat),
        Just(SessionPacket::LogoutRequest),
        Just(SessionPacket::EndOfSession),
    ]
}

proptest! {
    /// Frames survive any chunking of the byte stream, including one byte at a time.
    #[test]
    fn prop_framing_survives_chunking(
        frames in proptest::collection::vec(frame(), 0..20),
        cuts in proptest::collection::vec(1usize..32, 1..64),
    ) {
        let mut wire = BytesMut::new();
        for frame in &frames {
            frame.encode(&mut wire).unwrap();
        }

        let mut reader = FrameReader::new();
        let mut out = Vec::new();
        let mut rest = &wire[..];
        let mut sizes = cuts.iter().cycle();
        while !rest.is_empty() {
            let size = (*sizes.next().unwrap()).min(rest.len());
            let (chunk, tail) = rest.split_at(size);
            out.extend(reader.feed(chunk).unwrap());
            rest = tail;
        }

        prop_assert_eq!(out, frames);
        prop_assert!(reader.is_empty());
    }

    #[test]
    fn prop_framing_one_byte_at_a_time(frames in proptest::collection::vec(frame(), 1..8)) {
        let mut wire = BytesMut::new();
        for frame in &frames {
            frame.encode(&mut wire).unwrap();
        }

        let mut reader = FrameReader::new();
        let mut out = Vec::new();
        for byte in wire.iter() {
            out.extend(reader.feed(std::slice::from_ref(byte)).unwrap());
        }
        prop_assert_eq!(out, frames);
    }

    #[test]
    fn prop_session_packet_round_trip(packet in session_packet()) {
        let mut wire = BytesMut::new();
        packet.encode(&mut wire).unwrap();

        let frames = FrameReader::new().feed(&wire).unwrap();
        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(SessionPacket::from_frame(&frames[0]).unwrap(), packet);
    }

    #[test]
    fn prop_client_message_round_trip(msg in client_message()) {
        let bytes = msg.encode().unwrap();
        prop_assert_eq!(bytes[0], msg.tag());
        prop_assert_eq!(ClientMessage::parse(&bytes).unwrap(), msg);
    }

    #[test]
    fn prop_exchange_message_round_trip(msg in exchange_message()) {
        let bytes = msg.encode().unwrap();
        prop_assert_eq!(bytes[0], msg.tag());
        prop_assert_eq!(ExchangeMessage::parse(&bytes).unwrap(), msg);
    }

    /// A record cut short anywhere is reported, never read past.
    #[test]
    fn prop_truncated_records_are_errors(msg in exchange_message(), cut in any::<prop::sample::Index>()) {
        let bytes = msg.encode().unwrap();
        let len = 1 + cut.index(bytes.len() - 1);
        prop_assert!(ExchangeMessage::parse(&bytes[..len]).is_err());
    }

    #[test]
    fn prop_price_text_round_trip(minor in any::<i32>()) {
        let price = Price::from_minor(minor);
        let parsed: Price = price.to_string().parse().unwrap();
        prop_assert_eq!(parsed, price);
    }
}

#[test]
fn serde_derives_survive_cbor() {
    let msg = ClientMessage::CancelOrderById(CancelOrderById {
        order_book_id: 12,
        side: Side::ShortSell,
        order_id: 42,
    });

    let mut buf = Vec::new();
    ciborium::into_writer(&msg, &mut buf).unwrap();
    let decoded: ClientMessage = ciborium::from_reader(buf.as_slice()).unwrap();
    assert_eq!(decoded, msg);

    let price = Price::from_minor(2200);
    let mut buf = Vec::new();
    ciborium::into_writer(&price, &mut buf).unwrap();
    let as_int: i32 = ciborium::from_reader(buf.as_slice()).unwrap();
    assert_eq!(as_int, 2200);
}

#[test]
fn unknown_session_tag_is_reported() {
    let frames = FrameReader::new().feed(&[0x00, 0x01, 0xFF]).unwrap();
    assert_eq!(
        SessionPacket::from_frame(&frames[0]).unwrap_err(),
        soupline_proto::ProtocolError::UnknownMessageType { tag: 0xFF }
    );
}

#[test]
fn hex_dump_of_login_request() {
    let packet = SessionPacket::LoginRequest(LoginRequest {
        username: "alice".into(),
        password: "secret".into(),
        requested_session: String::new(),
        requested_sequence: 0,
    });
    let wire = packet.to_frame().to_bytes().unwrap();
    assert_eq!(hex::encode(&wire[..19]), "002f4c616c6963652073656372657420202020");
    assert_eq!(wire.len(), 49);
}
