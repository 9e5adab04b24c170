//! Exchange → client acknowledgments, rejects and executions.
//!
//! Every record opens with an exchange timestamp in nanoseconds since midnight
//! followed by the order token the message refers to.

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::{
    ACCOUNT_WIDTH, CUSTOMER_INFO_WIDTH, EXCHANGE_INFO_WIDTH, OuchRecord, Side, TOKEN_WIDTH,
    read_side,
};
use crate::{
    errors::Result,
    fields::{self, FieldCursor, NUL},
    price::Price,
};

/// Order accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAck {
    /// Exchange timestamp (ns)
    pub timestamp: u64,
    /// Token from the entering order
    pub order_token: String,
    /// Instrument
    pub order_book_id: u32,
    /// Side
    pub side: Side,
    /// Exchange-assigned order id
    pub order_id: u64,
    /// Open quantity
    pub quantity: u64,
    /// Limit price
    pub price: Price,
    /// See [`super::time_in_force`]
    pub time_in_force: u8,
    /// Position effect
    pub open_close: u8,
    /// Clearing account
    pub client_account: String,
    /// See [`super::order_state`]
    pub order_state: u8,
    /// Free text from the order
    pub customer_info: String,
    /// Exchange-specific account data
    pub exchange_info: String,
    /// Quantity matched before the order rested
    pub pretrade_quantity: u64,
    /// Visible quantity
    pub display_quantity: u64,
    /// Client category code
    pub client_category: u8,
    /// Off-hours flag
    pub off_hours: u8,
    /// Reserved bytes
    pub reserved: [u8; 3],
}

impl OuchRecord for OrderAck {
    const TAG: u8 = b'A';
    const SIZE: usize = 134;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u64(self.timestamp);
        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        buf.put_u32(self.order_book_id);
        buf.put_u8(self.side.to_u8());
        buf.put_u64(self.order_id);
        buf.put_u64(self.quantity);
        buf.put_i32(self.price.minor());
        buf.put_u8(self.time_in_force);
        buf.put_u8(self.open_close);
        fields::put_ascii(buf, &self.client_account, ACCOUNT_WIDTH, NUL);
        buf.put_u8(self.order_state);
        fields::put_ascii(buf, &self.customer_info, CUSTOMER_INFO_WIDTH, NUL);
        fields::put_ascii(buf, &self.exchange_info, EXCHANGE_INFO_WIDTH, NUL);
        buf.put_u64(self.pretrade_quantity);
        buf.put_u64(self.display_quantity);
        buf.put_u8(self.client_category);
        buf.put_u8(self.off_hours);
        buf.put_slice(&self.reserved);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            timestamp: c.u64()?,
            order_token: c.ascii("order_token", TOKEN_WIDTH, NUL)?,
            order_book_id: c.u32()?,
            side: read_side(c, "side")?,
            order_id: c.u64()?,
            quantity: c.u64()?,
            price: Price::from_minor(c.i32()?),
            time_in_force: c.u8()?,
            open_close: c.u8()?,
            client_account: c.ascii("client_account", ACCOUNT_WIDTH, NUL)?,
            order_state: c.u8()?,
            customer_info: c.ascii("customer_info", CUSTOMER_INFO_WIDTH, NUL)?,
            exchange_info: c.ascii("exchange_info", EXCHANGE_INFO_WIDTH, NUL)?,
            pretrade_quantity: c.u64()?,
            display_quantity: c.u64()?,
            client_category: c.u8()?,
            off_hours: c.u8()?,
            reserved: c.array()?,
        })
    }
}

/// Enter, replace or cancel refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReject {
    /// Exchange timestamp (ns)
    pub timestamp: u64,
    /// Token of the refused request
    pub order_token: String,
    /// Venue reject code
    pub reject_code: i32,
}

impl OuchRecord for OrderReject {
    const TAG: u8 = b'J';
    const SIZE: usize = 26;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u64(self.timestamp);
        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        buf.put_i32(self.reject_code);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            timestamp: c.u64()?,
            order_token: c.ascii("order_token", TOKEN_WIDTH, NUL)?,
            reject_code: c.i32()?,
        })
    }
}

/// Replace accepted; the order now carries `replacement_order_token`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderReplaceAck {
    /// Exchange timestamp (ns)
    pub timestamp: u64,
    /// Token the order carries from now on
    pub replacement_order_token: String,
    /// Token the order carried before
    pub previous_order_token: String,
    /// Instrument
    pub order_book_id: u32,
    /// Side
    pub side: Side,
    /// Exchange-assigned order id
    pub order_id: u64,
    /// Open quantity
    pub quantity: u64,
    /// Limit price
    pub price: Price,
    /// See [`super::time_in_force`]
    pub time_in_force: u8,
    /// Position effect
    pub open_close: u8,
    /// Clearing account
    pub client_account: String,
    /// See [`super::order_state`]
    pub order_state: u8,
    /// Free text from the order
    pub customer_info: String,
    /// Exchange-specific account data
    pub exchange_info: String,
    /// Quantity matched before the order rested
    pub pretrade_quantity: u64,
    /// Visible quantity
    pub display_quantity: u64,
    /// Client category code
    pub client_category: u8,
    /// Reserved bytes
    pub reserved: [u8; 8],
}

impl OuchRecord for OrderReplaceAck {
    const TAG: u8 = b'U';
    const SIZE: usize = 152;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u64(self.timestamp);
        fields::put_ascii(buf, &self.replacement_order_token, TOKEN_WIDTH, NUL);
        fields::put_ascii(buf, &self.previous_order_token, TOKEN_WIDTH, NUL);
        buf.put_u32(self.order_book_id);
        buf.put_u8(self.side.to_u8());
        buf.put_u64(self.order_id);
        buf.put_u64(self.quantity);
        buf.put_i32(self.price.minor());
        buf.put_u8(self.time_in_force);
        buf.put_u8(self.open_close);
        fields::put_ascii(buf, &self.client_account, ACCOUNT_WIDTH, NUL);
        buf.put_u8(self.order_state);
        fields::put_ascii(buf, &self.customer_info, CUSTOMER_INFO_WIDTH, NUL);
        fields::put_ascii(buf, &self.exchange_info, EXCHANGE_INFO_WIDTH, NUL);
        buf.put_u64(self.pretrade_quantity);
        buf.put_u64(self.display_quantity);
        buf.put_u8(self.client_category);
        buf.put_slice(&self.reserved);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            timestamp: c.u64()?,
            replacement_order_token: c.ascii("replacement_order_token", TOKEN_WIDTH, NUL)?,
            previous_order_token: c.ascii("previous_order_token", TOKEN_WIDTH, NUL)?,
            order_book_id: c.u32()?,
            side: read_side(c, "side")?,
            order_id: c.u64()?,
            quantity: c.u64()?,
            price: Price::from_minor(c.i32()?),
            time_in_force: c.u8()?,
            open_close: c.u8()?,
            client_account: c.ascii("client_account", ACCOUNT_WIDTH, NUL)?,
            order_state: c.u8()?,
            customer_info: c.ascii("customer_info", CUSTOMER_INFO_WIDTH, NUL)?,
            exchange_info: c.ascii("exchange_info", EXCHANGE_INFO_WIDTH, NUL)?,
            pretrade_quantity: c.u64()?,
            display_quantity: c.u64()?,
            client_category: c.u8()?,
            reserved: c.array()?,
        })
    }
}

/// Order removed from the book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderCancelAck {
    /// Exchange timestamp (ns)
    pub timestamp: u64,
    /// Token of the cancelled order
    pub order_token: String,
    /// Instrument
    pub order_book_id: u32,
    /// Side
    pub side: Side,
    /// Exchange-assigned order id
    pub order_id: u64,
    /// Venue cancel reason code
    pub reason: i8,
}

impl OuchRecord for OrderCancelAck {
    const TAG: u8 = b'C';
    const SIZE: usize = 36;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u64(self.timestamp);
        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        buf.put_u32(self.order_book_id);
        buf.put_u8(self.side.to_u8());
        buf.put_u64(self.order_id);
        buf.put_i8(self.reason);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            timestamp: c.u64()?,
            order_token: c.ascii("order_token", TOKEN_WIDTH, NUL)?,
            order_book_id: c.u32()?,
            side: read_side(c, "side")?,
            order_id: c.u64()?,
            reason: c.i8()?,
        })
    }
}

/// Fill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderExecuted {
    /// Exchange timestamp (ns)
    pub timestamp: u64,
    /// Token of the filled order
    pub order_token: String,
    /// Leg instrument for combination orders, 0 otherwise
    pub order_book_id: u32,
    /// Quantity filled by this execution
    pub traded_quantity: u64,
    /// Quantity still open
    pub leaves_quantity: u64,
    /// Execution price
    pub trade_price: Price,
    /// Match id shared by both counterparties
    pub match_id: u64,
    /// Client category code
    pub client_category: u8,
    /// Reserved bytes
    pub reserved: [u8; 16],
}

impl OrderExecuted {
    /// Whether the order is fully filled.
    pub fn is_complete(&self) -> bool {
        self.leaves_quantity == 0
    }
}

impl OuchRecord for OrderExecuted {
    const TAG: u8 = b'E';
    const SIZE: usize = 71;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u64(self.timestamp);
        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        buf.put_u32(self.order_book_id);
        buf.put_u64(self.traded_quantity);
        buf.put_u64(self.leaves_quantity);
        buf.put_i32(self.trade_price.minor());
        buf.put_u64(self.match_id);
        buf.put_u8(self.client_category);
        buf.put_slice(&self.reserved);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            timestamp: c.u64()?,
            order_token: c.ascii("order_token", TOKEN_WIDTH, NUL)?,
            order_book_id: c.u32()?,
            traded_quantity: c.u64()?,
            leaves_quantity: c.u64()?,
            trade_price: Price::from_minor(c.i32()?),
            match_id: c.u64()?,
            client_category: c.u8()?,
            reserved: c.array()?,
        })
    }
}

/// Status of one side of one quote from a [`super::MassQuote`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassQuoteAck {
    /// Exchange timestamp (ns)
    pub timestamp: u64,
    /// Token of the mass quote
    pub order_token: String,
    /// Instrument
    pub order_book_id: u32,
    /// Quote side
    pub side: Side,
    /// Venue quote status code
    pub quote_status: u32,
    /// Quoted quantity
    pub quantity: u64,
    /// Quantity traded so far
    pub traded_quantity: u64,
    /// Quoted price
    pub price: Price,
}

impl OuchRecord for MassQuoteAck {
    const TAG: u8 = b'K';
    const SIZE: usize = 51;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u64(self.timestamp);
        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        buf.put_u32(self.order_book_id);
        buf.put_u8(self.side.to_u8());
        buf.put_u32(self.quote_status);
        buf.put_u64(self.quantity);
        buf.put_u64(self.traded_quantity);
        buf.put_i32(self.price.minor());
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            timestamp: c.u64()?,
            order_token: c.ascii("order_token", TOKEN_WIDTH, NUL)?,
            order_book_id: c.u32()?,
            side: read_side(c, "side")?,
            quote_status: c.u32()?,
            quantity: c.u64()?,
            traded_quantity: c.u64()?,
            price: Price::from_minor(c.i32()?),
        })
    }
}

/// Quote refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassQuoteReject {
    /// Exchange timestamp (ns)
    pub timestamp: u64,
    /// Token of the mass quote
    pub order_token: String,
    /// Rejected instrument; 0 when the whole mass quote was refused
    pub order_book_id: u32,
    /// Venue reject code
    pub reject_code: i32,
}

impl MassQuoteReject {
    /// Whether every quote in the mass quote was refused.
    pub fn rejects_all(&self) -> bool {
        self.order_book_id == 0
    }
}

impl OuchRecord for MassQuoteReject {
    const TAG: u8 = b'R';
    const SIZE: usize = 30;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u64(self.timestamp);
        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        buf.put_u32(self.order_book_id);
        buf.put_i32(self.reject_code);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            timestamp: c.u64()?,
            order_token: c.ascii("order_token", TOKEN_WIDTH, NUL)?,
            order_book_id: c.u32()?,
            reject_code: c.i32()?,
        })
    }
}
