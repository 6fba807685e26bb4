//! Fade speed and brightness levels.

use std::fmt;

use serde::Serialize;

use super::{ValueError, check_range};

/// Fade duration byte sent with color changes. `0` switches instantly,
/// larger values fade more slowly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize)]
#[serde(transparent)]
pub struct TransitionSpeed(u8);

impl TransitionSpeed {
    pub const INSTANT: TransitionSpeed = TransitionSpeed(0);
    pub const MAX: u8 = u8::MAX;

    pub const fn new(speed: u8) -> Self {
        TransitionSpeed(speed)
    }

    /// Validate a wide integer against the device range (0–255).
    pub fn checked(value: i64) -> Result<Self, ValueError> {
        let v = check_range("transition speed", value, 0, i64::from(Self::MAX))?;
        Ok(TransitionSpeed(v as u8))
    }

    pub fn get(self) -> u8 {
        self.0
    }

    pub fn is_instant(self) -> bool {
        self.0 == 0
    }
}

impl From<u8> for TransitionSpeed {
    fn from(speed: u8) -> Self {
        TransitionSpeed(speed)
    }
}

impl fmt::Display for TransitionSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Output brightness as a percentage of the requested color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Brightness(u8);

impl Brightness {
    pub const NORMAL: Brightness = Brightness(100);
    pub const DIMMED: Brightness = Brightness(10);

    pub fn new(percent: u8) -> Result<Self, ValueError> {
        Self::checked(i64::from(percent))
    }

    pub fn checked(value: i64) -> Result<Self, ValueError> {
        let v = check_range("brightness", value, 0, 100)?;
        Ok(Brightness(v as u8))
    }

    /// `DIMMED` when `dimmed` is set, `NORMAL` otherwise.
    pub fn for_dimmed(dimmed: bool) -> Self {
        if dimmed { Self::DIMMED } else { Self::NORMAL }
    }

    pub fn percent(self) -> u8 {
        self.0
    }
}

impl Default for Brightness {
    fn default() -> Self {
        Self::NORMAL
    }
}

impl fmt::Display for Brightness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.0)
    }
}
