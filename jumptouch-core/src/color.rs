use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ColorParseError {
    #[error("color `{0}` must start with '#'")]
    MissingHash(String),
    #[error("color `{0}` must have 3, 6 or 8 hex digits")]
    BadLength(String),
    #[error("color `{0}` contains a non-hex digit")]
    BadDigit(String),
}

/// Straight (non-premultiplied) RGBA color.
///
/// Serialized as a CSS-style hex string so trial configuration files can
/// say `"#666666"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba(pub [u8; 4]);

impl Rgba {
    pub const BLACK: Rgba = Rgba([0, 0, 0, 255]);
    pub const WHITE: Rgba = Rgba([255, 255, 255, 255]);
    pub const GREY: Rgba = Rgba([0x66, 0x66, 0x66, 255]);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Rgba([r, g, b, 255])
    }

    pub fn r(&self) -> u8 {
        self.0[0]
    }
    pub fn g(&self) -> u8 {
        self.0[1]
    }
    pub fn b(&self) -> u8 {
        self.0[2]
    }
    pub fn a(&self) -> u8 {
        self.0[3]
    }

    pub fn is_opaque(&self) -> bool {
        self.0[3] == 255
    }
}

impl FromStr for Rgba {
    type Err = ColorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .trim()
            .strip_prefix('#')
            .ok_or_else(|| ColorParseError::MissingHash(s.to_string()))?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ColorParseError::BadDigit(s.to_string()));
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16);
        let parsed = match hex.len() {
            3 => {
                let nib = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).map(|v| v * 17);
                [nib(0), nib(1), nib(2), Ok(255)]
            }
            6 => [byte(0), byte(2), byte(4), Ok(255)],
            8 => [byte(0), byte(2), byte(4), byte(6)],
            _ => return Err(ColorParseError::BadLength(s.to_string())),
        };
        let mut out = [0u8; 4];
        for (slot, v) in out.iter_mut().zip(parsed) {
            *slot = v.map_err(|_| ColorParseError::BadDigit(s.to_string()))?;
        }
        Ok(Rgba(out))
    }
}

impl TryFrom<String> for Rgba {
    type Error = ColorParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Rgba> for String {
    fn from(c: Rgba) -> Self {
        c.to_string()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [r, g, b, a] = self.0;
        if a == 255 {
            write!(f, "#{r:02X}{g:02X}{b:02X}")
        } else {
            write!(f, "#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}
