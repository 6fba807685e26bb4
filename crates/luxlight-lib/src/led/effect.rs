//! Animated effects built into the light's firmware.

use super::{Color, TransitionSpeed, ValueError, check_range};
use crate::protocol;

/// Which LEDs a command addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LedTarget {
    #[default]
    All,
    Front,
    Back,
    /// One LED, numbered 1–6.
    Single(u8),
}

impl LedTarget {
    pub fn single(index: i64) -> Result<Self, ValueError> {
        let i = check_range("LED index", index, 1, i64::from(protocol::LED_COUNT))?;
        Ok(LedTarget::Single(i as u8))
    }

    /// Target byte as it appears in a report.
    pub fn code(self) -> u8 {
        match self {
            LedTarget::All => protocol::TARGET_ALL,
            LedTarget::Front => protocol::TARGET_FRONT,
            LedTarget::Back => protocol::TARGET_BACK,
            LedTarget::Single(i) => i,
        }
    }
}

/// Built-in firmware patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pattern {
    TrafficLights,
    Random1,
    Random2,
    Random3,
    Police,
    Random4,
    Random5,
    Rainbow,
}

impl Pattern {
    pub const ALL: [Pattern; 8] = [
        Pattern::TrafficLights,
        Pattern::Random1,
        Pattern::Random2,
        Pattern::Random3,
        Pattern::Police,
        Pattern::Random4,
        Pattern::Random5,
        Pattern::Rainbow,
    ];

    pub fn id(self) -> u8 {
        match self {
            Pattern::TrafficLights => 1,
            Pattern::Random1 => 2,
            Pattern::Random2 => 3,
            Pattern::Random3 => 4,
            Pattern::Police => 5,
            Pattern::Random4 => 6,
            Pattern::Random5 => 7,
            Pattern::Rainbow => 8,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Pattern::TrafficLights => "traffic-lights",
            Pattern::Random1 => "random1",
            Pattern::Random2 => "random2",
            Pattern::Random3 => "random3",
            Pattern::Police => "police",
            Pattern::Random4 => "random4",
            Pattern::Random5 => "random5",
            Pattern::Rainbow => "rainbow",
        }
    }

    pub fn from_name(s: &str) -> Result<Self, ValueError> {
        let s = s.trim();
        Pattern::ALL
            .into_iter()
            .find(|p| p.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValueError::Parse(format!("unknown pattern \"{s}\"")))
    }
}

/// Wave shapes supported by the wave command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaveType {
    Short,
    Long,
    OverlappingShort,
    OverlappingLong,
}

impl WaveType {
    pub const ALL: [WaveType; 4] = [
        WaveType::Short,
        WaveType::Long,
        WaveType::OverlappingShort,
        WaveType::OverlappingLong,
    ];

    pub fn id(self) -> u8 {
        match self {
            WaveType::Short => 1,
            WaveType::Long => 2,
            WaveType::OverlappingShort => 3,
            WaveType::OverlappingLong => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            WaveType::Short => "short",
            WaveType::Long => "long",
            WaveType::OverlappingShort => "overlapping-short",
            WaveType::OverlappingLong => "overlapping-long",
        }
    }

    pub fn from_name(s: &str) -> Result<Self, ValueError> {
        let s = s.trim();
        WaveType::ALL
            .into_iter()
            .find(|w| w.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValueError::Parse(format!("unknown wave type \"{s}\"")))
    }
}

/// A one-shot animation. Effects do not change the stored color; the light
/// returns to whatever the firmware shows after the animation ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Strobe {
        target: LedTarget,
        color: Color,
        speed: TransitionSpeed,
        repeat: u8,
    },
    Wave {
        wave: WaveType,
        color: Color,
        speed: TransitionSpeed,
        repeat: u8,
    },
    Pattern {
        pattern: Pattern,
        repeat: u8,
    },
}
