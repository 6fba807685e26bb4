//! Color values, parsing and formatting.
//!
//! Colors are plain RGB triples. Text input accepts `#RRGGBB`, `RRGGBB`,
//! color names and `r,g,b` decimal triples; out-of-range channels are
//! rejected rather than clamped.

use std::fmt;

use serde::{Serialize, Serializer};

use super::{Brightness, ValueError, check_range};

/// An RGB color, one byte per channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::new(0, 0, 0);
    pub const WHITE: Color = Color::new(255, 255, 255);
    pub const RED: Color = Color::new(255, 0, 0);
    pub const GREEN: Color = Color::new(0, 255, 0);
    pub const BLUE: Color = Color::new(0, 0, 255);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Color { r, g, b }
    }

    /// Build a color from wide integers, rejecting any channel outside 0–255.
    pub fn from_channels(r: i64, g: i64, b: i64) -> Result<Self, ValueError> {
        let r = check_range("red", r, 0, 255)?;
        let g = check_range("green", g, 0, 255)?;
        let b = check_range("blue", b, 0, 255)?;
        Ok(Color::new(r as u8, g as u8, b as u8))
    }

    /// Scale every channel by a brightness percentage (rounded to nearest).
    pub fn scaled(self, brightness: Brightness) -> Self {
        let pct = u16::from(brightness.percent());
        let scale = |c: u8| ((u16::from(c) * pct + 50) / 100) as u8;
        Color::new(scale(self.r), scale(self.g), scale(self.b))
    }

    pub fn is_off(self) -> bool {
        self == Color::BLACK
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl std::str::FromStr for Color {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_color(s)
    }
}

/// Presence states with their conventional light colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Available,
    Busy,
    Away,
    Off,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Available, Status::Busy, Status::Away, Status::Off];

    pub fn color(self) -> Color {
        match self {
            Status::Available => Color::new(0, 179, 26),
            Status::Busy => Color::new(179, 0, 0),
            Status::Away => Color::new(255, 255, 0),
            Status::Off => Color::BLACK,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Status::Available => "available",
            Status::Busy => "busy",
            Status::Away => "away",
            Status::Off => "off",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        let s = s.trim();
        Status::ALL
            .into_iter()
            .find(|st| st.name().eq_ignore_ascii_case(s))
    }
}

/// Parse a color string.
///
/// Accepts:
/// - Hex: `"#FF0000"`, `"FF0000"`, `"#ff0000"`
/// - Named: `"red"`, `"green"`, `"blue"`, `"white"`, `"orange"`, `"yellow"`,
///   `"purple"`, `"cyan"`, `"magenta"`, `"off"`/`"black"`
/// - Decimal triple: `"255,0,128"` (each channel 0–255)
pub fn parse_color(s: &str) -> Result<Color, ValueError> {
    let s = s.trim();

    match s.to_lowercase().as_str() {
        "red" => return Ok(Color::RED),
        "green" => return Ok(Color::GREEN),
        "blue" => return Ok(Color::BLUE),
        "white" => return Ok(Color::WHITE),
        "orange" => return Ok(Color::new(255, 128, 0)),
        "yellow" => return Ok(Color::new(255, 255, 0)),
        "purple" => return Ok(Color::new(128, 0, 255)),
        "cyan" => return Ok(Color::new(0, 255, 255)),
        "magenta" => return Ok(Color::new(255, 0, 255)),
        "off" | "black" => return Ok(Color::BLACK),
        _ => {}
    }

    if s.contains(',') {
        let parts: Vec<&str> = s.split(',').map(str::trim).collect();
        let [r, g, b] = parts.as_slice() else {
            return Err(ValueError::Parse(format!(
                "{s} (expected three channels r,g,b)"
            )));
        };
        let channel = |v: &str| {
            v.parse::<i64>()
                .map_err(|_| ValueError::Parse(format!("{s} (channel \"{v}\" is not a number)")))
        };
        return Color::from_channels(channel(*r)?, channel(*g)?, channel(*b)?);
    }

    let hex = s.strip_prefix('#').unwrap_or(s);
    if hex.len() != 6 {
        return Err(ValueError::Parse(format!(
            "{s} (use #RRGGBB, r,g,b or a color name)"
        )));
    }
    let val = u32::from_str_radix(hex, 16)
        .map_err(|_| ValueError::Parse(format!("{s} (invalid hex color)")))?;
    Ok(Color::new(
        ((val >> 16) & 0xFF) as u8,
        ((val >> 8) & 0xFF) as u8,
        (val & 0xFF) as u8,
    ))
}

/// Format a color as `#RRGGBB`.
pub fn format_color(color: Color) -> String {
    color.to_string()
}
