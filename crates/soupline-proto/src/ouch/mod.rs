//! OUCH application messages.
//!
//! Records ride inside session data packets with their tag as the first byte.
//! Tags are only unique per direction (`U` is a replace request going out and
//! a replace acknowledgment coming back), so each direction gets its own
//! closed enum: [`ClientMessage`] for what the client sends and
//! [`ExchangeMessage`] for what the exchange sends back.

mod orders;
mod responses;

use bytes::{BufMut, Bytes, BytesMut};
use serde::{Deserialize, Serialize};

pub use self::{
    orders::{CancelOrder, CancelOrderById, EnterOrder, MassQuote, QuoteEntry, ReplaceOrder},
    responses::{
        MassQuoteAck, MassQuoteReject, OrderAck, OrderCancelAck, OrderExecuted, OrderReject,
        OrderReplaceAck,
    },
};
use crate::{
    errors::{ProtocolError, Result},
    fields::{self, FieldCursor},
};

/// Width of order token fields.
pub const TOKEN_WIDTH: usize = 14;
/// Width of client account fields.
pub const ACCOUNT_WIDTH: usize = 16;
/// Width of customer info fields.
pub const CUSTOMER_INFO_WIDTH: usize = 15;
/// Width of exchange info fields on orders.
pub const EXCHANGE_INFO_WIDTH: usize = 32;

/// Time-in-force codes.
pub mod time_in_force {
    /// Good for the trading day.
    pub const DAY: u8 = 0;
    /// Fill what is possible now, cancel the rest.
    pub const IMMEDIATE_OR_CANCEL: u8 = 3;
    /// Fill completely now or cancel.
    pub const FILL_OR_KILL: u8 = 4;
}

/// Order states reported in acknowledgments.
pub mod order_state {
    /// Resting on the book.
    pub const ON_BOOK: u8 = 1;
    /// Not on the book (filled or expired on entry).
    pub const NOT_ON_BOOK: u8 = 2;
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// `B`
    Buy,
    /// `S`
    Sell,
    /// `T`
    ShortSell,
}

impl Side {
    /// Parse a side byte.
    pub fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            b'B' => Some(Self::Buy),
            b'S' => Some(Self::Sell),
            b'T' => Some(Self::ShortSell),
            _ => None,
        }
    }

    /// Side byte on the wire.
    pub fn to_u8(self) -> u8 {
        match self {
            Self::Buy => b'B',
            Self::Sell => b'S',
            Self::ShortSell => b'T',
        }
    }
}

/// A fixed-layout OUCH record.
///
/// `encode_body` writes everything after the tag; `decode` reads the same
/// bytes back and must reject any length other than the record's own.
pub trait OuchRecord: Sized {
    /// Message tag.
    const TAG: u8;

    /// Body size in bytes, excluding the tag.
    const SIZE: usize;

    /// Append the body to `buf`.
    fn encode_body(&self, buf: &mut BytesMut) -> Result<()>;

    /// Read the body from an exactly sized cursor.
    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self>;

    /// Decode a body, checking its length first.
    fn decode(body: &[u8]) -> Result<Self> {
        fields::expect_len(Self::TAG, body, Self::SIZE)?;
        Self::decode_fields(&mut FieldCursor::new(Self::TAG, body))
    }

    /// Tag plus body.
    fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(1 + Self::SIZE);
        buf.put_u8(Self::TAG);
        self.encode_body(&mut buf)?;
        Ok(buf.freeze())
    }
}

pub(crate) fn read_side(c: &mut FieldCursor<'_>, field: &'static str) -> Result<Side> {
    let byte = c.u8()?;
    Side::from_u8(byte).ok_or_else(|| {
        ProtocolError::InvalidField { field, reason: format!("unknown side 0x{byte:02x}") }
    })
}

fn split_tag(message: &[u8]) -> Result<(u8, &[u8])> {
    match message.split_first() {
        Some((&tag, body)) => Ok((tag, body)),
        None => Err(ProtocolError::TruncatedMessage { tag: 0, expected: 1, actual: 0 }),
    }
}

/// Messages the client sends to the exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// `O`: new order
    EnterOrder(EnterOrder),
    /// `U`: modify a resting order
    ReplaceOrder(ReplaceOrder),
    /// `X`: cancel by token
    CancelOrder(CancelOrder),
    /// `Y`: cancel by exchange order id
    CancelOrderById(CancelOrderById),
    /// `Q`: two-sided quotes for up to five books
    MassQuote(MassQuote),
}

impl ClientMessage {
    /// Message tag.
    pub fn tag(&self) -> u8 {
        match self {
            Self::EnterOrder(_) => EnterOrder::TAG,
            Self::ReplaceOrder(_) => ReplaceOrder::TAG,
            Self::CancelOrder(_) => CancelOrder::TAG,
            Self::CancelOrderById(_) => CancelOrderById::TAG,
            Self::MassQuote(_) => MassQuote::TAG,
        }
    }

    /// Encode tag and body.
    ///
    /// Fails only for a mass quote whose entry count is outside `1..=5`.
    pub fn encode(&self) -> Result<Bytes> {
        match self {
            Self::EnterOrder(m) => m.to_bytes(),
            Self::ReplaceOrder(m) => m.to_bytes(),
            Self::CancelOrder(m) => m.to_bytes(),
            Self::CancelOrderById(m) => m.to_bytes(),
            Self::MassQuote(m) => m.to_bytes(),
        }
    }

    /// Decode a body given its tag.
    pub fn decode(tag: u8, body: &[u8]) -> Result<Self> {
        Ok(match tag {
            EnterOrder::TAG => Self::EnterOrder(EnterOrder::decode(body)?),
            ReplaceOrder::TAG => Self::ReplaceOrder(ReplaceOrder::decode(body)?),
            CancelOrder::TAG => Self::CancelOrder(CancelOrder::decode(body)?),
            CancelOrderById::TAG => Self::CancelOrderById(CancelOrderById::decode(body)?),
            MassQuote::TAG => Self::MassQuote(MassQuote::decode(body)?),
            _ => return Err(ProtocolError::UnknownMessageType { tag }),
        })
    }

    /// Decode a record whose first byte is the tag.
    pub fn parse(message: &[u8]) -> Result<Self> {
        let (tag, body) = split_tag(message)?;
        Self::decode(tag, body)
    }
}

/// Messages the exchange sends to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExchangeMessage {
    /// `A`: order accepted
    OrderAck(OrderAck),
    /// `J`: enter, replace or cancel rejected
    OrderReject(OrderReject),
    /// `U`: replace accepted
    OrderReplaceAck(OrderReplaceAck),
    /// `C`: order cancelled
    OrderCancelAck(OrderCancelAck),
    /// `E`: fill
    OrderExecuted(OrderExecuted),
    /// `K`: per-side quote status
    MassQuoteAck(MassQuoteAck),
    /// `R`: quote rejected
    MassQuoteReject(MassQuoteReject),
}

impl ExchangeMessage {
    /// Message tag.
    pub fn tag(&self) -> u8 {
        match self {
            Self::OrderAck(_) => OrderAck::TAG,
            Self::OrderReject(_) => OrderReject::TAG,
            Self::OrderReplaceAck(_) => OrderReplaceAck::TAG,
            Self::OrderCancelAck(_) => OrderCancelAck::TAG,
            Self::OrderExecuted(_) => OrderExecuted::TAG,
            Self::MassQuoteAck(_) => MassQuoteAck::TAG,
            Self::MassQuoteReject(_) => MassQuoteReject::TAG,
        }
    }

    /// Order token the message refers to.
    pub fn order_token(&self) -> &str {
        match self {
            Self::OrderAck(m) => &m.order_token,
            Self::OrderReject(m) => &m.order_token,
            Self::OrderReplaceAck(m) => &m.replacement_order_token,
            Self::OrderCancelAck(m) => &m.order_token,
            Self::OrderExecuted(m) => &m.order_token,
            Self::MassQuoteAck(m) => &m.order_token,
            Self::MassQuoteReject(m) => &m.order_token,
        }
    }

    /// Encode tag and body.
    pub fn encode(&self) -> Result<Bytes> {
        match self {
            Self::OrderAck(m) => m.to_bytes(),
            Self::OrderReject(m) => m.to_bytes(),
            Self::OrderReplaceAck(m) => m.to_bytes(),
            Self::OrderCancelAck(m) => m.to_bytes(),
            Self::OrderExecuted(m) => m.to_bytes(),
            Self::MassQuoteAck(m) => m.to_bytes(),
            Self::MassQuoteReject(m) => m.to_bytes(),
        }
    }

    /// Decode a body given its tag.
    pub fn decode(tag: u8, body: &[u8]) -> Result<Self> {
        Ok(match tag {
            OrderAck::TAG => Self::OrderAck(OrderAck::decode(body)?),
            OrderReject::TAG => Self::OrderReject(OrderReject::decode(body)?),
            OrderReplaceAck::TAG => Self::OrderReplaceAck(OrderReplaceAck::decode(body)?),
            OrderCancelAck::TAG => Self::OrderCancelAck(OrderCancelAck::decode(body)?),
            OrderExecuted::TAG => Self::OrderExecuted(OrderExecuted::decode(body)?),
            MassQuoteAck::TAG => Self::MassQuoteAck(MassQuoteAck::decode(body)?),
            MassQuoteReject::TAG => Self::MassQuoteReject(MassQuoteReject::decode(body)?),
            _ => return Err(ProtocolError::UnknownMessageType { tag }),
        })
    }

    /// Decode a record whose first byte is the tag.
    pub fn parse(message: &[u8]) -> Result<Self> {
        let (tag, body) = split_tag(message)?;
        Self::decode(tag, body)
    }
}
