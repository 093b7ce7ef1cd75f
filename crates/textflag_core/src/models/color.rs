//! Flag colors: the named review palette plus custom hex values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Color attached to a flag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum FlagColor {
    Red,
    Yellow,
    Green,
    /// Lowercase `#rrggbb`.
    Custom(String),
}

/// Reasons a color string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid color '{0}': expected red, yellow, green, #rgb or #rrggbb")]
pub struct InvalidColor(pub String);

impl FlagColor {
    /// Hex value used when painting markers.
    pub fn hex(&self) -> &str {
        match self {
            FlagColor::Red => "#ef5350",
            FlagColor::Yellow => "#ffeb3b",
            FlagColor::Green => "#4caf50",
            FlagColor::Custom(hex) => hex.as_str(),
        }
    }

    /// Red, green and blue channels of [`FlagColor::hex`].
    pub fn rgb(&self) -> (u8, u8, u8) {
        let hex = &self.hex()[1..];
        let channel = |index: usize| u8::from_str_radix(&hex[index..index + 2], 16).unwrap_or(0);
        (channel(0), channel(2), channel(4))
    }
}

impl FromStr for FlagColor {
    type Err = InvalidColor;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "red" => return Ok(FlagColor::Red),
            "yellow" => return Ok(FlagColor::Yellow),
            "green" => return Ok(FlagColor::Green),
            _ => {}
        }

        let digits = trimmed
            .strip_prefix('#')
            .filter(|digits| digits.chars().all(|ch| ch.is_ascii_hexdigit()))
            .ok_or_else(|| InvalidColor(value.to_string()))?;
        let expanded = match digits.len() {
            3 => digits.chars().flat_map(|ch| [ch, ch]).collect::<String>(),
            6 => digits.to_string(),
            _ => return Err(InvalidColor(value.to_string())),
        };
        Ok(FlagColor::Custom(format!("#{}", expanded.to_ascii_lowercase())))
    }
}

impl TryFrom<String> for FlagColor {
    type Error = InvalidColor;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<FlagColor> for String {
    fn from(value: FlagColor) -> Self {
        value.to_string()
    }
}

impl fmt::Display for FlagColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlagColor::Red => f.write_str("red"),
            FlagColor::Yellow => f.write_str("yellow"),
            FlagColor::Green => f.write_str("green"),
            FlagColor::Custom(hex) => f.write_str(hex),
        }
    }
}
