//! Integer minor-unit prices.
//!
//! Prices travel as signed 32-bit integers holding the value times 100. They
//! are never represented as floating point: text input is parsed digit by
//! digit and anything finer than a minor unit is rejected rather than rounded.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::errors::ProtocolError;

/// Price in minor currency units (value × 100).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(i32);

impl Price {
    /// Minor units per major unit.
    pub const SCALE: i32 = 100;

    /// Number of fractional digits a price may carry.
    pub const DECIMALS: usize = 2;

    /// Zero, also "no change" in replace requests.
    pub const ZERO: Self = Self(0);

    /// Wrap a raw minor-unit value.
    pub const fn from_minor(minor: i32) -> Self {
        Self(minor)
    }

    /// Raw minor-unit value as carried on the wire.
    pub const fn minor(self) -> i32 {
        self.0
    }
}

impl From<i32> for Price {
    fn from(minor: i32) -> Self {
        Self(minor)
    }
}

impl FromStr for Price {
    type Err = ProtocolError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| ProtocolError::InvalidPrice { input: input.to_string(), reason };

        let text = input.trim();
        let (negative, unsigned) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text.strip_prefix('+').unwrap_or(text)),
        };
        let (whole, fraction) = unsigned.split_once('.').unwrap_or((unsigned, ""));

        if whole.is_empty() && fraction.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(invalid("expected decimal digits"));
        }
        if fraction.len() > Self::DECIMALS {
            return Err(invalid("finer than one minor unit"));
        }

        let digits = whole.bytes().chain(fraction.bytes()).chain(
            std::iter::repeat_n(b'0', Self::DECIMALS - fraction.len()),
        );
        let mut minor: i64 = 0;
        for digit in digits {
            minor = minor * 10 + i64::from(digit - b'0');
            if minor > i64::from(i32::MAX) + 1 {
                return Err(invalid("out of range"));
            }
        }
        let minor = if negative { -minor } else { minor };

        i32::try_from(minor).map(Self).map_err(|_| invalid("out of range"))
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let minor = i64::from(self.0);
        let sign = if minor < 0 { "-" } else { "" };
        let abs = minor.abs();
        let scale = i64::from(Self::SCALE);
        write!(f, "{sign}{}.{:02}", abs / scale, abs % scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_whole_and_fractional() {
        assert_eq!("22.00".parse::<Price>().unwrap().minor(), 2200);
        assert_eq!("22".parse::<Price>().unwrap().minor(), 2200);
        assert_eq!("22.5".parse::<Price>().unwrap().minor(), 2250);
        assert_eq!("0.01".parse::<Price>().unwrap().minor(), 1);
        assert_eq!(".75".parse::<Price>().unwrap().minor(), 75);
        assert_eq!("-0.50".parse::<Price>().unwrap().minor(), -50);
    }

    #[test]
    fn rejects_sub_minor_precision() {
        let err = "22.001".parse::<Price>().unwrap_err();
        assert!(matches!(err, ProtocolError::InvalidPrice { .. }));
    }

    #[test]
    fn rejects_text_and_overflow() {
        assert!("abc".parse::<Price>().is_err());
        assert!("".parse::<Price>().is_err());
        assert!("1e3".parse::<Price>().is_err());
        assert!("21474836.48".parse::<Price>().is_err());
        assert_eq!("21474836.47".parse::<Price>().unwrap().minor(), i32::MAX);
        assert_eq!("-21474836.48".parse::<Price>().unwrap().minor(), i32::MIN);
    }

    #[test]
    fn displays_two_decimals() {
        assert_eq!(Price::from_minor(2200).to_string(), "22.00");
        assert_eq!(Price::from_minor(-5).to_string(), "-0.05");
        assert_eq!(Price::from_minor(i32::MIN).to_string(), "-21474836.48");
    }
}
