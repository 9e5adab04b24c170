//! Client → exchange order entry records.

use bytes::{BufMut, BytesMut};
use serde::{Deserialize, Serialize};

use super::{
    ACCOUNT_WIDTH, CUSTOMER_INFO_WIDTH, EXCHANGE_INFO_WIDTH, OuchRecord, Side, TOKEN_WIDTH,
    read_side,
};
use crate::{
    errors::{ProtocolError, Result},
    fields::{self, FieldCursor, NUL},
    price::Price,
};

/// New order.
///
/// | offset | width | field |
/// |---|---|---|
/// | 0 | 14 | order_token |
/// | 14 | 4 | order_book_id |
/// | 18 | 1 | side |
/// | 19 | 8 | quantity |
/// | 27 | 4 | price |
/// | 31 | 1 | time_in_force |
/// | 32 | 1 | open_close |
/// | 33 | 16 | client_account |
/// | 49 | 15 | customer_info |
/// | 64 | 32 | exchange_info |
/// | 96 | 8 | display_quantity |
/// | 104 | 1 | client_category |
/// | 105 | 1 | off_hours |
/// | 106 | 7 | reserved |
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnterOrder {
    /// Client-chosen token, unique per session
    pub order_token: String,
    /// Instrument
    pub order_book_id: u32,
    /// Buy, sell or short sell
    pub side: Side,
    /// Total quantity
    pub quantity: u64,
    /// Limit price
    pub price: Price,
    /// See [`super::time_in_force`]
    pub time_in_force: u8,
    /// Position effect
    pub open_close: u8,
    /// Clearing account
    pub client_account: String,
    /// Free text echoed back
    pub customer_info: String,
    /// Exchange-specific account data
    pub exchange_info: String,
    /// Visible quantity for reserve orders; 0 shows everything
    pub display_quantity: u64,
    /// Client category code
    pub client_category: u8,
    /// Off-hours flag
    pub off_hours: u8,
    /// Reserved bytes, carried verbatim
    pub reserved: [u8; 7],
}

impl OuchRecord for EnterOrder {
    const TAG: u8 = b'O';
    const SIZE: usize = 113;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        buf.put_u32(self.order_book_id);
        buf.put_u8(self.side.to_u8());
        buf.put_u64(self.quantity);
        buf.put_i32(self.price.minor());
        buf.put_u8(self.time_in_force);
        buf.put_u8(self.open_close);
        fields::put_ascii(buf, &self.client_account, ACCOUNT_WIDTH, NUL);
        fields::put_ascii(buf, &self.customer_info, CUSTOMER_INFO_WIDTH, NUL);
        fields::put_ascii(buf, &self.exchange_info, EXCHANGE_INFO_WIDTH, NUL);
        buf.put_u64(self.display_quantity);
        buf.put_u8(self.client_category);
        buf.put_u8(self.off_hours);
        buf.put_slice(&self.reserved);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            order_token: c.ascii("order_token", TOKEN_WIDTH, NUL)?,
            order_book_id: c.u32()?,
            side: read_side(c, "side")?,
            quantity: c.u64()?,
            price: Price::from_minor(c.i32()?),
            time_in_force: c.u8()?,
            open_close: c.u8()?,
            client_account: c.ascii("client_account", ACCOUNT_WIDTH, NUL)?,
            customer_info: c.ascii("customer_info", CUSTOMER_INFO_WIDTH, NUL)?,
            exchange_info: c.ascii("exchange_info", EXCHANGE_INFO_WIDTH, NUL)?,
            display_quantity: c.u64()?,
            client_category: c.u8()?,
            off_hours: c.u8()?,
            reserved: c.array()?,
        })
    }
}

/// Modify quantity, price or account data of a resting order.
///
/// A zero price or display quantity leaves that field unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplaceOrder {
    /// Token of the order being replaced
    pub existing_order_token: String,
    /// Token the order carries afterwards
    pub replacement_order_token: String,
    /// New total quantity
    pub quantity: u64,
    /// New price; zero for no change
    pub price: Price,
    /// Position effect
    pub open_close: u8,
    /// Clearing account
    pub client_account: String,
    /// Free text echoed back
    pub customer_info: String,
    /// Exchange-specific account data
    pub exchange_info: String,
    /// New visible quantity; zero for no change
    pub display_quantity: u64,
    /// Client category code
    pub client_category: u8,
    /// Reserved bytes, carried verbatim
    pub reserved: [u8; 8],
}

impl OuchRecord for ReplaceOrder {
    const TAG: u8 = b'U';
    const SIZE: usize = 121;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        fields::put_ascii(buf, &self.existing_order_token, TOKEN_WIDTH, NUL);
        fields::put_ascii(buf, &self.replacement_order_token, TOKEN_WIDTH, NUL);
        buf.put_u64(self.quantity);
        buf.put_i32(self.price.minor());
        buf.put_u8(self.open_close);
        fields::put_ascii(buf, &self.client_account, ACCOUNT_WIDTH, NUL);
        fields::put_ascii(buf, &self.customer_info, CUSTOMER_INFO_WIDTH, NUL);
        fields::put_ascii(buf, &self.exchange_info, EXCHANGE_INFO_WIDTH, NUL);
        buf.put_u64(self.display_quantity);
        buf.put_u8(self.client_category);
        buf.put_slice(&self.reserved);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            existing_order_token: c.ascii("existing_order_token", TOKEN_WIDTH, NUL)?,
            replacement_order_token: c.ascii("replacement_order_token", TOKEN_WIDTH, NUL)?,
            quantity: c.u64()?,
            price: Price::from_minor(c.i32()?),
            open_close: c.u8()?,
            client_account: c.ascii("client_account", ACCOUNT_WIDTH, NUL)?,
            customer_info: c.ascii("customer_info", CUSTOMER_INFO_WIDTH, NUL)?,
            exchange_info: c.ascii("exchange_info", EXCHANGE_INFO_WIDTH, NUL)?,
            display_quantity: c.u64()?,
            client_category: c.u8()?,
            reserved: c.array()?,
        })
    }
}

/// Cancel an order by its token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrder {
    /// Token of the order to cancel
    pub order_token: String,
}

impl OuchRecord for CancelOrder {
    const TAG: u8 = b'X';
    const SIZE: usize = TOKEN_WIDTH;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self { order_token: c.ascii("order_token", TOKEN_WIDTH, NUL)? })
    }
}

/// Cancel an order by exchange-assigned id, e.g. one entered by another session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelOrderById {
    /// Instrument
    pub order_book_id: u32,
    /// Side of the order
    pub side: Side,
    /// Exchange order id from the acknowledgment
    pub order_id: u64,
}

impl OuchRecord for CancelOrderById {
    const TAG: u8 = b'Y';
    const SIZE: usize = 13;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_u32(self.order_book_id);
        buf.put_u8(self.side.to_u8());
        buf.put_u64(self.order_id);
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self { order_book_id: c.u32()?, side: read_side(c, "side")?, order_id: c.u64()? })
    }
}

/// One order book's two-sided quote inside a [`MassQuote`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteEntry {
    /// Instrument
    pub order_book_id: u32,
    /// Bid price
    pub bid_price: Price,
    /// Offer price
    pub offer_price: Price,
    /// Bid size; zero pulls the bid
    pub bid_size: u64,
    /// Offer size; zero pulls the offer
    pub offer_size: u64,
}

impl QuoteEntry {
    /// Encoded entry size.
    pub const SIZE: usize = 28;

    fn encode(&self, buf: &mut BytesMut) {
        buf.put_u32(self.order_book_id);
        buf.put_i32(self.bid_price.minor());
        buf.put_i32(self.offer_price.minor());
        buf.put_u64(self.bid_size);
        buf.put_u64(self.offer_size);
    }

    fn decode(c: &mut FieldCursor<'_>) -> Result<Self> {
        Ok(Self {
            order_book_id: c.u32()?,
            bid_price: Price::from_minor(c.i32()?),
            offer_price: Price::from_minor(c.i32()?),
            bid_size: c.u64()?,
            offer_size: c.u64()?,
        })
    }
}

/// Quotes for up to five order books in one message.
///
/// A 49-byte header is followed by `entry_count` 28-byte [`QuoteEntry`]
/// blocks; the count must be between 1 and 5.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MassQuote {
    /// Token shared by every quote in the message
    pub order_token: String,
    /// Client category code
    pub client_category: u8,
    /// Clearing account
    pub client_account: String,
    /// Exchange-specific account data
    pub exchange_info: String,
    /// Quote entries
    pub entries: Vec<QuoteEntry>,
}

impl MassQuote {
    /// Fewest entries a mass quote may carry.
    pub const MIN_ENTRIES: usize = 1;
    /// Most entries a mass quote may carry.
    pub const MAX_ENTRIES: usize = 5;
    /// Width of the exchange info field in a mass quote.
    pub const EXCHANGE_INFO_WIDTH: usize = 16;

    /// Body size for a given entry count.
    pub const fn size_for(entries: usize) -> usize {
        Self::SIZE + entries * QuoteEntry::SIZE
    }

    fn check_entries(entries: usize, expected: usize, actual: usize) -> Result<()> {
        if !(Self::MIN_ENTRIES..=Self::MAX_ENTRIES).contains(&entries) || expected != actual {
            return Err(ProtocolError::MalformedRepeatingBlock { entries, expected, actual });
        }
        Ok(())
    }
}

impl OuchRecord for MassQuote {
    const TAG: u8 = b'Q';
    /// Header size; entries follow.
    const SIZE: usize = TOKEN_WIDTH + 1 + ACCOUNT_WIDTH + Self::EXCHANGE_INFO_WIDTH + 2;

    fn encode_body(&self, buf: &mut BytesMut) -> Result<()> {
        let count = self.entries.len();
        Self::check_entries(count, Self::size_for(count), Self::size_for(count))?;

        fields::put_ascii(buf, &self.order_token, TOKEN_WIDTH, NUL);
        buf.put_u8(self.client_category);
        fields::put_ascii(buf, &self.client_account, ACCOUNT_WIDTH, NUL);
        fields::put_ascii(buf, &self.exchange_info, Self::EXCHANGE_INFO_WIDTH, NUL);
        buf.put_u16(count as u16);
        for entry in &self.entries {
            entry.encode(buf);
        }
        Ok(())
    }

    fn decode_fields(c: &mut FieldCursor<'_>) -> Result<Self> {
        let order_token = c.ascii("order_token", TOKEN_WIDTH, NUL)?;
        let client_category = c.u8()?;
        let client_account = c.ascii("client_account", ACCOUNT_WIDTH, NUL)?;
        let exchange_info = c.ascii("exchange_info", Self::EXCHANGE_INFO_WIDTH, NUL)?;
        let count = usize::from(c.u16()?);

        let body_len = Self::SIZE + c.remaining();
        Self::check_entries(count, Self::size_for(count), body_len)?;

        let entries = (0..count).map(|_| QuoteEntry::decode(c)).collect::<Result<Vec<_>>>()?;
        Ok(Self { order_token, client_category, client_account, exchange_info, entries })
    }

    fn decode(body: &[u8]) -> Result<Self> {
        if body.len() < Self::SIZE {
            return Err(ProtocolError::TruncatedMessage {
                tag: Self::TAG,
                expected: Self::SIZE,
                actual: body.len(),
            });
        }
        Self::decode_fields(&mut FieldCursor::new(Self::TAG, body))
    }
}
