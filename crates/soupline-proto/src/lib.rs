//! Wire format for SoupBinTCP sessions carrying OUCH order entry.
//!
//! Two layers share one byte stream. The session layer frames everything as
//! `length:u16 | type:u8 | payload` and handles login, sequencing and
//! heartbeats. The application layer rides inside sequenced and unsequenced
//! data packets as fixed-width binary records whose first byte is a message
//! tag.
//!
//! Every layout here is fixed width: ASCII fields are left-justified and
//! padded, integers are big-endian, and prices are signed integer minor units.
//! A field that is one byte off silently corrupts a live order-entry session,
//! so all decoding goes through a bounds-checked cursor and every record is
//! length-checked before a single field is read.
//!
//! # Components
//!
//! - [`Frame`] and [`FrameReader`]: session-layer framing over a chunked stream
//! - [`SessionPacket`]: session-layer packets (login, data, heartbeats)
//! - [`ClientMessage`] / [`ExchangeMessage`]: OUCH records in each direction
//! - [`Price`]: minor-unit price type
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod errors;
pub mod fields;
pub mod frame;
pub mod ouch;
pub mod packet;
pub mod price;
pub mod reader;

pub use errors::{ProtocolError, Result};
pub use frame::Frame;
pub use ouch::{ClientMessage, ExchangeMessage, Side};
pub use packet::{PacketType, SessionPacket};
pub use price::Price;
pub use reader::FrameReader;
