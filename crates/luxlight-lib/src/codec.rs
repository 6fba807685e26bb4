//! Wire codec: intents to output reports, input reports to acknowledgements.
//!
//! Encoding never fails: every value type is already range-checked when it
//! is constructed. Decoding treats anything unexpected as
//! [`ProtocolError::Malformed`].

use std::fmt;

use crate::led::{Color, Effect, LedTarget, Pattern, TransitionSpeed, WaveType};
use crate::protocol::*;

/// Acknowledgement decoding errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    Malformed(String),
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolError::Malformed(e) => write!(f, "Malformed device report: {e}"),
        }
    }
}

impl std::error::Error for ProtocolError {}

/// Known command codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Static,
    Fade,
    Strobe,
    Wave,
    Pattern,
}

impl Command {
    pub fn code(self) -> u8 {
        match self {
            Command::Static => CMD_STATIC,
            Command::Fade => CMD_FADE,
            Command::Strobe => CMD_STROBE,
            Command::Wave => CMD_WAVE,
            Command::Pattern => CMD_PATTERN,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CMD_STATIC => Some(Command::Static),
            CMD_FADE => Some(Command::Fade),
            CMD_STROBE => Some(Command::Strobe),
            CMD_WAVE => Some(Command::Wave),
            CMD_PATTERN => Some(Command::Pattern),
            _ => None,
        }
    }
}

/// One fixed-size output report, without the report ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Report([u8; REPORT_LEN]);

impl Report {
    pub fn as_bytes(&self) -> &[u8; REPORT_LEN] {
        &self.0
    }

    /// Command this report carries. Reports are only built by this module,
    /// so byte 0 is always a known code.
    pub fn command(&self) -> Command {
        Command::from_code(self.0[0]).unwrap_or(Command::Static)
    }
}

/// A decoded acknowledgement: the device echoes the command it executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack {
    pub command: Command,
    pub raw: [u8; REPORT_LEN],
}

/// Set a color. Speed 0 switches instantly (static command), any other
/// speed fades.
pub fn encode_color(color: Color, speed: TransitionSpeed, target: LedTarget) -> Report {
    if speed.is_instant() {
        Report([CMD_STATIC, target.code(), color.r, color.g, color.b, 0, 0, 0])
    } else {
        Report([
            CMD_FADE,
            target.code(),
            color.r,
            color.g,
            color.b,
            speed.get(),
            0,
            0,
        ])
    }
}

/// Switch every LED off.
pub fn encode_off() -> Report {
    encode_color(Color::BLACK, TransitionSpeed::INSTANT, LedTarget::All)
}

pub fn encode_strobe(target: LedTarget, color: Color, speed: TransitionSpeed, repeat: u8) -> Report {
    Report([
        CMD_STROBE,
        target.code(),
        color.r,
        color.g,
        color.b,
        speed.get(),
        0,
        repeat,
    ])
}

pub fn encode_wave(wave: WaveType, color: Color, speed: TransitionSpeed, repeat: u8) -> Report {
    Report([
        CMD_WAVE,
        wave.id(),
        color.r,
        color.g,
        color.b,
        0,
        repeat,
        speed.get(),
    ])
}

pub fn encode_pattern(pattern: Pattern, repeat: u8) -> Report {
    Report([CMD_PATTERN, pattern.id(), repeat, 0, 0, 0, 0, 0])
}

pub fn encode_effect(effect: &Effect) -> Report {
    match *effect {
        Effect::Strobe {
            target,
            color,
            speed,
            repeat,
        } => encode_strobe(target, color, speed, repeat),
        Effect::Wave {
            wave,
            color,
            speed,
            repeat,
        } => encode_wave(wave, color, speed, repeat),
        Effect::Pattern { pattern, repeat } => encode_pattern(pattern, repeat),
    }
}

/// Decode an input report.
///
/// Accepts exactly [`REPORT_LEN`] bytes, or one more when the first byte is
/// the zero report ID some HID backends leave in place.
pub fn decode_ack(bytes: &[u8]) -> Result<Ack, ProtocolError> {
    let body = match bytes.len() {
        REPORT_LEN => bytes,
        n if n == REPORT_LEN + 1 && bytes[0] == REPORT_ID => &bytes[1..],
        0 => return Err(ProtocolError::Malformed("empty report".into())),
        n => {
            return Err(ProtocolError::Malformed(format!(
                "unexpected length {n} (expected {REPORT_LEN})"
            )));
        }
    };
    let command = Command::from_code(body[0]).ok_or_else(|| {
        ProtocolError::Malformed(format!("unknown command code 0x{:02X}", body[0]))
    })?;
    let mut raw = [0u8; REPORT_LEN];
    raw.copy_from_slice(body);
    Ok(Ack { command, raw })
}
