use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Color drawn in place of a source color whose channels are out of range.
pub const FALLBACK_COLOR: Color = Color::new(0x00, 0x00, 0x00);

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ColorError {
    #[error("channel {channel} out of range [0, 255]: {value}")]
    ChannelOutOfRange { channel: char, value: i64 },

    #[error("invalid hex color {0:?}, expected 6 hex digits")]
    InvalidHex(String),
}

/// A 24-bit RGB color. On the wire it is always the lowercase `rrggbb` form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Builds a color from wide integer channels, rejecting anything outside `[0, 255]`.
    pub fn from_channels(r: i64, g: i64, b: i64) -> Result<Self, ColorError> {
        let channel = |channel: char, value: i64| {
            u8::try_from(value).map_err(|_| ColorError::ChannelOutOfRange { channel, value })
        };
        Ok(Self::new(channel('r', r)?, channel('g', g)?, channel('b', b)?))
    }

    pub fn to_hex(&self) -> String {
        format!("{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = ColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ColorError::InvalidHex(s.to_owned());
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&s[i..i + 2], 16).map_err(|_| invalid());
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl TryFrom<String> for Color {
    type Error = ColorError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_as_lowercase_hex() {
        assert_eq!(Color::new(0xAB, 0x01, 0xFF).to_hex(), "ab01ff");
        assert_eq!(Color::new(0, 0, 0).to_string(), "000000");
    }

    #[test]
    fn parses_either_case() {
        assert_eq!("AB01ff".parse::<Color>(), Ok(Color::new(0xab, 0x01, 0xff)));
    }

    #[test]
    fn rejects_malformed_hex() {
        for input in ["", "12345", "1234567", "gg0000", "#12345"] {
            assert!(input.parse::<Color>().is_err(), "{input:?} should not parse");
        }
    }

    #[test]
    fn validates_channel_range() {
        assert_eq!(Color::from_channels(0, 128, 255), Ok(Color::new(0, 128, 255)));
        assert_eq!(
            Color::from_channels(0, 256, 0),
            Err(ColorError::ChannelOutOfRange {
                channel: 'g',
                value: 256
            })
        );
        assert!(Color::from_channels(-1, 0, 0).is_err());
    }
}
