//! Light values: colors, fade speed, brightness and effect descriptions.

mod color;
mod effect;
mod level;

use std::fmt;

pub use color::{Color, Status, format_color, parse_color};
pub use effect::{Effect, LedTarget, Pattern, WaveType};
pub use level::{Brightness, TransitionSpeed};

/// Rejected input value. Raised before any device I/O happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueError {
    /// A numeric value outside the range the device accepts.
    OutOfRange {
        field: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
    /// Text that could not be parsed into a value.
    Parse(String),
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::OutOfRange {
                field,
                value,
                min,
                max,
            } => write!(f, "{field} out of range: {value} (expected {min}..={max})"),
            ValueError::Parse(e) => write!(f, "Invalid value: {e}"),
        }
    }
}

impl std::error::Error for ValueError {}

/// Range-check a wide integer against `min..=max`.
pub(crate) fn check_range(
    field: &'static str,
    value: i64,
    min: i64,
    max: i64,
) -> Result<i64, ValueError> {
    if (min..=max).contains(&value) {
        Ok(value)
    } else {
        Err(ValueError::OutOfRange {
            field,
            value,
            min,
            max,
        })
    }
}
