//! Scripted exchange for end-to-end simulation.
//!
//! [`SimExchange`] serves one session over a simulated stream: it checks the
//! login, answers order flow with acknowledgments on the sequenced stream,
//! keeps a small book of resting orders so cancels and replaces can be
//! resolved, and sends server heartbeats when it has been quiet.
//!
//! Every packet it receives is recorded in an [`ExchangeLog`] that the test
//! keeps a handle to.

use std::{
    collections::HashMap,
    io,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use bytes::BytesMut;
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use soupline_proto::{
    ClientMessage, ExchangeMessage, FrameReader, PacketType, Price, ProtocolError, SessionPacket,
    Side,
    ouch::{
        CancelOrder, CancelOrderById, EnterOrder, MassQuote, MassQuoteAck, OrderAck,
        OrderCancelAck, OrderReject, OrderReplaceAck, ReplaceOrder, order_state,
    },
    packet::{LoginAccepted, REJECT_NOT_AUTHORIZED},
};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::Instant,
};
use tracing::{debug, info, warn};

/// Reject code for a cancel or replace naming an order the book does not hold.
pub const REJECT_UNKNOWN_ORDER: i32 = -800_002;

/// Cancel reason: requested by the client.
pub const CANCEL_REASON_USER: i8 = 1;

/// Quote status: accepted.
pub const QUOTE_ACCEPTED: u32 = 0;

/// How the exchange behaves.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Username that logs in
    pub username: String,
    /// Password that logs in
    pub password: String,
    /// Session id handed out on login
    pub session: String,
    /// Sequence number of the first sequenced message
    pub first_sequence: u64,
    /// Idle time before a server heartbeat; `None` keeps the exchange silent
    pub heartbeat_interval: Option<Duration>,
    /// Send `EndOfSession` after acknowledging this many orders
    pub end_after_orders: Option<usize>,
    /// Seed for exchange-assigned order ids
    pub seed: u64,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            username: "alice".into(),
            password: "secret".into(),
            session: "S1".into(),
            first_sequence: 1,
            heartbeat_interval: Some(Duration::from_secs(1)),
            end_after_orders: None,
            seed: 0,
        }
    }
}

/// Packets the exchange received, shared with the test.
#[derive(Debug, Clone, Default)]
pub struct ExchangeLog {
    packets: Arc<Mutex<Vec<SessionPacket>>>,
}

impl ExchangeLog {
    fn record(&self, packet: SessionPacket) {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner).push(packet);
    }

    /// Snapshot of everything received so far, in arrival order.
    pub fn packets(&self) -> Vec<SessionPacket> {
        self.packets.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Packets of one type received so far.
    pub fn count(&self, packet_type: PacketType) -> usize {
        self.packets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| p.packet_type() == packet_type)
            .count()
    }

    /// Application messages received so far, sequenced or not.
    pub fn messages(&self) -> Vec<ClientMessage> {
        self.packets()
            .iter()
            .filter_map(|packet| match packet {
                SessionPacket::SequencedData { message }
                | SessionPacket::UnsequencedData { message } => ClientMessage::parse(message).ok(),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
struct RestingOrder {
    token: String,
    order_book_id: u32,
    side: Side,
    order_id: u64,
}

/// How a session ended from the exchange's side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// Client logged out
    Logout,
    /// Client closed the stream
    Closed,
    /// Login refused
    Rejected,
    /// Exchange sent `EndOfSession`
    Ended,
}

/// One-session scripted exchange.
#[derive(Debug)]
pub struct SimExchange {
    config: ExchangeConfig,
    log: ExchangeLog,
    rng: ChaCha8Rng,
    next_sequence: u64,
    orders: HashMap<String, RestingOrder>,
    acknowledged: usize,
    logged_in: bool,
}

impl SimExchange {
    /// Exchange with its own empty log.
    pub fn new(config: ExchangeConfig) -> Self {
        Self::with_log(config, ExchangeLog::default())
    }

    /// Exchange recording into `log`.
    pub fn with_log(config: ExchangeConfig, log: ExchangeLog) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            next_sequence: config.first_sequence,
            orders: HashMap::new(),
            acknowledged: 0,
            logged_in: false,
            config,
            log,
        }
    }

    /// Handle to the receive log.
    pub fn log(&self) -> ExchangeLog {
        self.log.clone()
    }

    /// Serve one session until it ends.
    pub async fn serve<S>(&mut self, mut stream: S) -> io::Result<SessionEnd>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let mut frames = FrameReader::new();
        let mut buf = vec![0u8; 4096];
        let mut last_sent = Instant::now();

        loop {
            let idle = self.config.heartbeat_interval.filter(|_| self.logged_in);
            let deadline = last_sent + idle.unwrap_or_default();

            let mut replies = Vec::new();
            let mut end = None;
            tokio::select! {
                read = stream.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        info!("client closed the stream");
                        return Ok(SessionEnd::Closed);
                    }
                    for frame in frames.feed(&buf[..n]).map_err(invalid_data)? {
                        let packet = SessionPacket::from_frame(&frame).map_err(invalid_data)?;
                        end = self.handle(packet, &mut replies).or(end);
                    }
                },
                () = tokio::time::sleep_until(deadline), if idle.is_some() => {
                    replies.push(SessionPacket::ServerHeartbeat);
                },
            }

            if !replies.is_empty() {
                write_packets(&mut stream, &replies).await?;
                last_sent = Instant::now();
            }
            if let Some(end) = end {
                info!(?end, "session over");
                return Ok(end);
            }
        }
    }

    fn handle(
        &mut self,
        packet: SessionPacket,
        replies: &mut Vec<SessionPacket>,
    ) -> Option<SessionEnd> {
        debug!(packet_type = ?packet.packet_type(), "exchange received");
        self.log.record(packet.clone());

        match packet {
            SessionPacket::LoginRequest(login) => {
                if login.username == self.config.username && login.password == self.config.password
                {
                    self.logged_in = true;
                    replies.push(SessionPacket::LoginAccepted(LoginAccepted {
                        session: self.config.session.clone(),
                        sequence: self.next_sequence,
                    }));
                    None
                } else {
                    warn!(username = %login.username, "refusing login");
                    replies
                        .push(SessionPacket::LoginRejected { reason: REJECT_NOT_AUTHORIZED.into() });
                    Some(SessionEnd::Rejected)
                }
            },
            SessionPacket::SequencedData { message } | SessionPacket::UnsequencedData { message } => {
                match ClientMessage::parse(&message) {
                    Ok(message) => self.respond(message, replies),
                    Err(error) => {
                        warn!(%error, "undecodable order message");
                        replies.push(SessionPacket::Debug { text: error.to_string() });
                        None
                    },
                }
            },
            SessionPacket::LogoutRequest => Some(SessionEnd::Logout),
            _ => None,
        }
    }

    fn respond(
        &mut self,
        message: ClientMessage,
        replies: &mut Vec<SessionPacket>,
    ) -> Option<SessionEnd> {
        let responses = match message {
            ClientMessage::EnterOrder(order) => vec![self.enter(&order)],
            ClientMessage::ReplaceOrder(replace) => vec![self.replace(&replace)],
            ClientMessage::CancelOrder(cancel) => vec![self.cancel(&cancel)],
            ClientMessage::CancelOrderById(cancel) => vec![self.cancel_by_id(&cancel)],
            ClientMessage::MassQuote(quote) => self.quote(&quote),
        };

        for response in responses {
            match response.encode() {
                Ok(message) => {
                    self.next_sequence += 1;
                    replies.push(SessionPacket::SequencedData { message });
                },
                Err(error) => warn!(%error, "could not encode response"),
            }
        }

        self.acknowledged += 1;
        if self.config.end_after_orders.is_some_and(|limit| self.acknowledged >= limit) {
            replies.push(SessionPacket::EndOfSession);
            return Some(SessionEnd::Ended);
        }
        None
    }

    fn enter(&mut self, order: &EnterOrder) -> ExchangeMessage {
        let order_id = self.rng.next_u64();
        self.orders.insert(order.order_token.clone(), RestingOrder {
            token: order.order_token.clone(),
            order_book_id: order.order_book_id,
            side: order.side,
            order_id,
        });

        ExchangeMessage::OrderAck(OrderAck {
            timestamp: timestamp(),
            order_token: order.order_token.clone(),
            order_book_id: order.order_book_id,
            side: order.side,
            order_id,
            quantity: order.quantity,
            price: order.price,
            time_in_force: order.time_in_force,
            open_close: order.open_close,
            client_account: order.client_account.clone(),
            order_state: order_state::ON_BOOK,
            customer_info: order.customer_info.clone(),
            exchange_info: order.exchange_info.clone(),
            pretrade_quantity: 0,
            display_quantity: order.display_quantity,
            client_category: order.client_category,
            off_hours: order.off_hours,
            reserved: [0; 3],
        })
    }

    fn replace(&mut self, replace: &ReplaceOrder) -> ExchangeMessage {
        let Some(mut resting) = self.orders.remove(&replace.existing_order_token) else {
            return reject(&replace.replacement_order_token);
        };
        resting.token.clone_from(&replace.replacement_order_token);
        let acked = resting.clone();
        self.orders.insert(resting.token.clone(), resting);

        ExchangeMessage::OrderReplaceAck(OrderReplaceAck {
            timestamp: timestamp(),
            replacement_order_token: replace.replacement_order_token.clone(),
            previous_order_token: replace.existing_order_token.clone(),
            order_book_id: acked.order_book_id,
            side: acked.side,
            order_id: acked.order_id,
            quantity: replace.quantity,
            price: replace.price,
            time_in_force: 0,
            open_close: replace.open_close,
            client_account: replace.client_account.clone(),
            order_state: order_state::ON_BOOK,
            customer_info: replace.customer_info.clone(),
            exchange_info: replace.exchange_info.clone(),
            pretrade_quantity: 0,
            display_quantity: replace.display_quantity,
            client_category: replace.client_category,
            reserved: [0; 8],
        })
    }

    fn cancel(&mut self, cancel: &CancelOrder) -> ExchangeMessage {
        match self.orders.remove(&cancel.order_token) {
            Some(resting) => cancel_ack(&resting),
            None => reject(&cancel.order_token),
        }
    }

    fn cancel_by_id(&mut self, cancel: &CancelOrderById) -> ExchangeMessage {
        let token = self
            .orders
            .values()
            .find(|o| o.order_id == cancel.order_id && o.order_book_id == cancel.order_book_id)
            .map(|o| o.token.clone());

        match token.and_then(|token| self.orders.remove(&token)) {
            Some(resting) => cancel_ack(&resting),
            None => reject(""),
        }
    }

    fn quote(&self, quote: &MassQuote) -> Vec<ExchangeMessage> {
        let side_ack = |order_book_id: u32, side: Side, quantity: u64, price: Price| {
            ExchangeMessage::MassQuoteAck(MassQuoteAck {
                timestamp: timestamp(),
                order_token: quote.order_token.clone(),
                order_book_id,
                side,
                quote_status: QUOTE_ACCEPTED,
                quantity,
                traded_quantity: 0,
                price,
            })
        };

        quote
            .entries
            .iter()
            .flat_map(|entry| {
                [
                    side_ack(entry.order_book_id, Side::Buy, entry.bid_size, entry.bid_price),
                    side_ack(entry.order_book_id, Side::Sell, entry.offer_size, entry.offer_price),
                ]
            })
            .collect()
    }
}

fn cancel_ack(resting: &RestingOrder) -> ExchangeMessage {
    ExchangeMessage::OrderCancelAck(OrderCancelAck {
        timestamp: timestamp(),
        order_token: resting.token.clone(),
        order_book_id: resting.order_book_id,
        side: resting.side,
        order_id: resting.order_id,
        reason: CANCEL_REASON_USER,
    })
}

fn reject(token: &str) -> ExchangeMessage {
    ExchangeMessage::OrderReject(OrderReject {
        timestamp: timestamp(),
        order_token: token.to_owned(),
        reject_code: REJECT_UNKNOWN_ORDER,
    })
}

fn timestamp() -> u64 {
    turmoil::elapsed().as_nanos() as u64
}

fn invalid_data(error: ProtocolError) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, error)
}

async fn write_packets<W>(stream: &mut W, packets: &[SessionPacket]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut buf = BytesMut::new();
    for packet in packets {
        packet.encode(&mut buf).map_err(invalid_data)?;
    }
    stream.write_all(&buf).await?;
    stream.flush().await
}
