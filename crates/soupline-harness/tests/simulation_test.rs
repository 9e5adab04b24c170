//! End-to-end session tests over the simulated network.
//!
//! A scripted exchange runs on one turmoil host, the real session client on
//! another. Covers:
//! - Login, order flow and logout
//! - Login rejection
//! - Heartbeats in both directions and the liveness alarm
//! - Exchange-initiated end of session and abrupt stream loss
//! - Ordering under network latency

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use soupline_client::{SessionClient, SessionConfig};
use soupline_core::{Credentials, SessionError, SessionEvent, SessionState};
use soupline_harness::{ExchangeConfig, ExchangeLog, SessionEnd, SimEnv, SimExchange, SimTransport};
use soupline_proto::{
    ClientMessage, ExchangeMessage, PacketType, Price, SessionPacket, Side,
    ouch::{CancelOrder, EnterOrder, MassQuote, QuoteEntry, ReplaceOrder, time_in_force},
    packet::{LoginAccepted, REJECT_NOT_AUTHORIZED},
};
use tokio::{io::AsyncWriteExt, sync::broadcast};

const EXCHANGE_ADDR: &str = "exchange:9000";

type Events = broadcast::Receiver<SessionEvent>;
type SharedEnd = Arc<Mutex<Option<SessionEnd>>>;

/// Helper to convert any error to Box<dyn Error>
fn to_box_err<E: std::error::Error + 'static>(e: E) -> Box<dyn std::error::Error> {
    Box::new(e)
}

/// Run a scripted exchange on the `exchange` host.
fn spawn_exchange(sim: &mut turmoil::Sim<'_>, config: ExchangeConfig) -> (ExchangeLog, SharedEnd) {
    let log = ExchangeLog::default();
    let end: SharedEnd = Arc::new(Mutex::new(None));
    let (host_log, host_end) = (log.clone(), Arc::clone(&end));

    sim.host("exchange", move || {
        let config = config.clone();
        let log = host_log.clone();
        let end = Arc::clone(&host_end);
        async move {
            let listener = SimTransport::bind("0.0.0.0:9000").await?;
            let (stream, _) = listener.accept().await?;
            let outcome = SimExchange::with_log(config, log).serve(stream).await?;
            *end.lock().map_err(|_| "end poisoned")? = Some(outcome);
            Ok(())
        }
    });

    (log, end)
}

async fn connect(password: &str) -> Result<(SessionClient<SimEnv>, Events), Box<dyn std::error::Error>> {
    SessionClient::connect(
        &SimTransport,
        EXCHANGE_ADDR,
        Credentials::new("alice", password),
        SimEnv::new(),
        SessionConfig::default(),
    )
    .await
    .map_err(to_box_err)
}

/// Next event matching `wanted`, skipping the rest.
async fn wait_for(
    events: &mut Events,
    wanted: impl Fn(&SessionEvent) -> bool,
) -> Result<SessionEvent, Box<dyn std::error::Error>> {
    loop {
        let event = events.recv().await?;
        if wanted(&event) {
            return Ok(event);
        }
    }
}

async fn next_message(
    events: &mut Events,
) -> Result<(ExchangeMessage, Option<u64>), Box<dyn std::error::Error>> {
    match wait_for(events, |e| matches!(e, SessionEvent::Message { .. })).await? {
        SessionEvent::Message { message, sequence } => Ok((message, sequence)),
        other => Err(format!("expected a message, got {other:?}").into()),
    }
}

fn enter_order(token: &str, price: i32) -> ClientMessage {
    ClientMessage::EnterOrder(EnterOrder {
        order_token: token.into(),
        order_book_id: 12,
        side: Side::Buy,
        quantity: 100,
        price: Price::from_minor(price),
        time_in_force: time_in_force::DAY,
        open_close: 0,
        client_account: "ACC1".into(),
        customer_info: String::new(),
        exchange_info: String::new(),
        display_quantity: 0,
        client_category: 1,
        off_hours: 0,
        reserved: [0; 7],
    })
}

fn end_of(end: &SharedEnd) -> Option<SessionEnd> {
    *end.lock().unwrap()
}

#[test]
fn order_entry_round_trip() -> turmoil::Result {
    let mut sim = turmoil::Builder::new().build();
    let (log, end) = spawn_exchange(&mut sim, ExchangeConfig::default());

    sim.client("trader", async move {
        let (client, mut events) = connect("secret").await?;

        let accepted = wait_for(&mut events, |e| matches!(e, SessionEvent::LoginAccepted { .. }))
            .await?;
        assert_eq!(accepted, SessionEvent::LoginAccepted { session: "S1".into(), sequence: 1 });
        assert_eq!(client.state(), SessionState::LoggedIn);

        client.send_order(&enter_order("ORD1", 2200))?;
        let (message, sequence) = next_message(&mut events).await?;
        assert_eq!(sequence, Some(1));
        let ExchangeMessage::OrderAck(ack) = message else {
            return Err(format!("expected an order ack, got {message:?}").into());
        };
        assert_eq!(ack.order_token, "ORD1");
        assert_eq!(ack.price, Price::from_minor(2200));
        assert_eq!(client.expected_sequence(), 2);

        client.disconnect()?;
        wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { error: None })).await?;

        // Let the logout reach the exchange before the simulation stops.
        tokio::time::sleep(Duration::from_millis(100)).await;
        Ok(())
    });

    sim.run()?;

    assert_eq!(end_of(&end), Some(SessionEnd::Logout));
    assert_eq!(log.count(PacketType::LoginRequest), 1);
    assert_eq!(log.messages(), vec![enter_order("ORD1", 2200)]);
    assert_eq!(log.packets().last(), Some(&SessionPacket::LogoutRequest));
    Ok(())
}

#[test]
fn replace_and_cancel_resolve_against_the_book() -> turmoil::Result {
    let mut sim = turmoil::Builder::new().build();
    let (_log, _end) = spawn_exchange(&mut sim, ExchangeConfig::default());

    sim.client("trader", async move {
        let (client, mut events) = connect("secret").await?;
        wait_for(&mut events, |e| matches!(e, SessionEvent::LoginAccepted { .. })).await?;

        client.send_order(&enter_order("ORD1", 1000))?;
        let (ack, _) = next_message(&mut events).await?;
        assert!(matches!(ack, ExchangeMessage::OrderAck(_)));

        client.send_order(&ClientMessage::ReplaceOrder(ReplaceOrder {
            existing_order_token: "ORD1".into(),
            replacement_order_token: "ORD2".into(),
            quantity: 50,
            price: Price::from_minor(1010),
            open_close: 0,
            client_account: "ACC1".into(),
            customer_info: String::new(),
            exchange_info: String::new(),
            display_quantity: 0,
            client_category: 1,
            reserved: [0; 8],
        }))?;
        let (replaced, _) = next_message(&mut events).await?;
        let ExchangeMessage::OrderReplaceAck(replaced) = replaced else {
            return Err(format!("expected a replace ack, got {replaced:?}").into());
        };
        assert_eq!(replaced.previous_order_token, "ORD1");
        assert_eq!(replaced.replacement_order_token, "ORD2");
        assert_eq!(replaced.quantity, 50);

        // The original token is gone from the book.
        client.send_order(&ClientMessage::CancelOrder(CancelOrder { order_token: "ORD1".into() }))?;
        let (rejected, _) = next_message(&mut events).await?;
        assert!(matches!(rejected, ExchangeMessage::OrderReject(ref r) if r.order_token == "ORD1"));

        client.send_order(&ClientMessage::CancelOrder(CancelOrder { order_token: "ORD2".into() }))?;
        let (cancelled, sequence) = next_message(&mut events).await?;
        assert!(matches!(cancelled, ExchangeMessage::OrderCancelAck(ref c) if c.order_token == "ORD2"));
        assert_eq!(sequence, Some(4));

        client.disconnect()?;
        client.closed().await;
        Ok(())
    });

    sim.run()
}

#[test]
fn mass_quote_acknowledges_both_sides() -> turmoil::Result {
    let mut sim = turmoil::Builder::new().build();
    let (_log, _end) = spawn_exchange(&mut sim, ExchangeConfig::default());

    sim.client("trader", async move {
        let (client, mut events) = connect("secret").await?;
        wait_for(&mut events, |e| matches!(e, SessionEvent::LoginAccepted { .. })).await?;

        let entry = |order_book_id| QuoteEntry {
            order_book_id,
            bid_price: Price::from_minor(990),
            offer_price: Price::from_minor(1010),
            bid_size: 10,
            offer_size: 20,
        };
        client.send_order(&ClientMessage::MassQuote(MassQuote {
            order_token: "Q1".into(),
            client_category: 1,
            client_account: "ACC1".into(),
            exchange_info: String::new(),
            entries: vec![entry(1), entry(2)],
        }))?;

        let mut sides = Vec::new();
        for _ in 0..4 {
            let (message, _) = next_message(&mut events).await?;
            let ExchangeMessage::MassQuoteAck(ack) = message else {
                return Err(format!("expected a quote ack, got {message:?}").into());
            };
            sides.push((ack.order_book_id, ack.side, ack.quantity));
        }
        assert_eq!(sides, vec![
            (1, Side::Buy, 10),
            (1, Side::Sell, 20),
            (2, Side::Buy, 10),
            (2, Side::Sell, 20),
        ]);
        assert_eq!(client.expected_sequence(), 5);

        client.disconnect()?;
        Ok(())
    });

    sim.run()
}

#[test]
fn rejected_login_disconnects() -> turmoil::Result {
    let mut sim = turmoil::Builder::new().build();
    let (log, end) = spawn_exchange(&mut sim, ExchangeConfig::default());

    sim.client("trader", async move {
        let (client, mut events) = connect("wrong").await?;

        let rejected =
            wait_for(&mut events, |e| matches!(e, SessionEvent::LoginRejected { .. })).await?;
        assert_eq!(rejected, SessionEvent::LoginRejected { reason: REJECT_NOT_AUTHORIZED.into() });

        let disconnected =
            wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await?;
        assert_eq!(disconnected, SessionEvent::Disconnected {
            error: Some(SessionError::LoginRejected { reason: REJECT_NOT_AUTHORIZED.into() })
        });
        assert_eq!(client.state(), SessionState::Disconnected);
        assert!(client.send_order(&enter_order("ORD1", 100)).is_err());
        Ok(())
    });

    sim.run()?;
    assert_eq!(end_of(&end), Some(SessionEnd::Rejected));
    assert_eq!(log.count(PacketType::LogoutRequest), 0);
    Ok(())
}

#[test]
fn idle_session_exchanges_heartbeats() -> turmoil::Result {
    let mut sim = turmoil::Builder::new().simulation_duration(Duration::from_secs(60)).build();
    let (log, _end) = spawn_exchange(&mut sim, ExchangeConfig::default());

    sim.client("trader", async move {
        let (client, mut events) = connect("secret").await?;
        wait_for(&mut events, |e| matches!(e, SessionEvent::LoginAccepted { .. })).await?;

        tokio::time::sleep(Duration::from_secs(20)).await;

        // The exchange heartbeats every second, so the alarm never fires.
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, SessionEvent::LivenessAlarm { .. }), "unexpected {event:?}");
        }
        assert_eq!(client.state(), SessionState::LoggedIn);

        client.disconnect()?;
        client.closed().await;
        Ok(())
    });

    sim.run()?;

    // Threshold 5s polled every second: one heartbeat about every 6s.
    let heartbeats = log.count(PacketType::ClientHeartbeat);
    assert!((3..=4).contains(&heartbeats), "client sent {heartbeats} heartbeats");
    Ok(())
}

#[test]
fn silent_exchange_raises_one_alarm() -> turmoil::Result {
    let mut sim = turmoil::Builder::new().simulation_duration(Duration::from_secs(60)).build();
    let config = ExchangeConfig { heartbeat_interval: None, ..ExchangeConfig::default() };
    let (_log, _end) = spawn_exchange(&mut sim, config);

    sim.client("trader", async move {
        let (client, mut events) = connect("secret").await?;
        wait_for(&mut events, |e| matches!(e, SessionEvent::LoginAccepted { .. })).await?;

        let alarm = wait_for(&mut events, |e| matches!(e, SessionEvent::LivenessAlarm { .. }))
            .await?;
        let SessionEvent::LivenessAlarm { silence } = alarm else {
            return Err("expected an alarm".into());
        };
        assert!(silence > Duration::from_secs(10));

        // Still silent: no second alarm, and the session stays up.
        tokio::time::sleep(Duration::from_secs(15)).await;
        while let Ok(event) = events.try_recv() {
            assert!(!matches!(event, SessionEvent::LivenessAlarm { .. }), "repeat alarm");
        }
        assert_eq!(client.state(), SessionState::LoggedIn);

        client.disconnect()?;
        Ok(())
    });

    sim.run()
}

#[test]
fn exchange_ends_the_session() -> turmoil::Result {
    let mut sim = turmoil::Builder::new().build();
    let config = ExchangeConfig { end_after_orders: Some(1), ..ExchangeConfig::default() };
    let (_log, end) = spawn_exchange(&mut sim, config);

    sim.client("trader", async move {
        let (client, mut events) = connect("secret").await?;
        wait_for(&mut events, |e| matches!(e, SessionEvent::LoginAccepted { .. })).await?;

        client.send_order(&enter_order("ORD1", 500))?;
        next_message(&mut events).await?;
        assert_eq!(
            wait_for(&mut events, |e| !matches!(e, SessionEvent::Message { .. })).await?,
            SessionEvent::EndOfSession
        );
        assert_eq!(
            wait_for(&mut events, |_| true).await?,
            SessionEvent::Disconnected { error: None }
        );
        client.closed().await;
        assert_eq!(client.state(), SessionState::Disconnected);
        Ok(())
    });

    sim.run()?;
    assert_eq!(end_of(&end), Some(SessionEnd::Ended));
    Ok(())
}

#[test]
fn dropped_stream_is_a_clean_disconnect() -> turmoil::Result {
    let mut sim = turmoil::Builder::new().build();

    // Accepts the login, then hangs up.
    sim.host("exchange", || async {
        let listener = SimTransport::bind("0.0.0.0:9000").await?;
        let (mut stream, _) = listener.accept().await?;
        let accepted = SessionPacket::LoginAccepted(LoginAccepted { session: "S9".into(), sequence: 3 });
        stream.write_all(&accepted.to_frame().to_bytes().map_err(to_box_err)?).await?;
        tokio::time::sleep(Duration::from_millis(100)).await;
        drop(stream);
        Ok(())
    });

    sim.client("trader", async move {
        let (client, mut events) = connect("secret").await?;
        wait_for(&mut events, |e| matches!(e, SessionEvent::LoginAccepted { .. })).await?;
        assert_eq!(client.session_id().as_deref(), Some("S9"));

        let disconnected =
            wait_for(&mut events, |e| matches!(e, SessionEvent::Disconnected { .. })).await?;
        assert_eq!(disconnected, SessionEvent::Disconnected { error: None });
        assert!(client.is_closed());
        Ok(())
    });

    sim.run()
}

#[test]
fn order_flow_keeps_its_order_under_latency() -> turmoil::Result {
    let mut sim = turmoil::Builder::new()
        .min_message_latency(Duration::from_millis(5))
        .max_message_latency(Duration::from_millis(50))
        .rng_seed(12345)
        .build();
    let (log, _end) = spawn_exchange(&mut sim, ExchangeConfig::default());

    sim.client("trader", async move {
        let (client, mut events) = connect("secret").await?;
        wait_for(&mut events, |e| matches!(e, SessionEvent::LoginAccepted { .. })).await?;

        for i in 0..20 {
            client.send_order(&enter_order(&format!("ORD{i}"), 100 + i))?;
        }

        let mut sequences = Vec::new();
        let mut tokens = Vec::new();
        for _ in 0..20 {
            let (message, sequence) = next_message(&mut events).await?;
            tokens.push(message.order_token().to_owned());
            sequences.push(sequence);
        }

        let expected: Vec<String> = (0..20).map(|i| format!("ORD{i}")).collect();
        assert_eq!(tokens, expected);
        assert_eq!(sequences, (1..=20).map(Some).collect::<Vec<_>>());

        client.disconnect()?;
        client.closed().await;
        Ok(())
    });

    sim.run()?;
    assert_eq!(log.messages().len(), 20);
    Ok(())
}
