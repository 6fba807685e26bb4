//! Protocol constants for Luxafor Flag-compatible status lights.
//!
//! The device is a plain HID class device without numbered reports. Every
//! command is one 8-byte output report; hidapi expects a leading report ID
//! of zero on write, which the transport adds.
//!
//! ## Report layout
//!
//! ```text
//! byte  0     1           2  3  4  5      6       7
//!       cmd   target/id   r  g  b  ...command specific...
//! ```
//!
//! See `codec` for the per-command layout.

use std::time::Duration;

// ── USB identifiers ──

/// Microchip vendor ID (used by Luxafor).
pub const LUXAFOR_VID: u16 = 0x04D8;

/// Luxafor Flag product ID.
pub const LUXAFOR_PID: u16 = 0xF372;

// ── Report framing ──

/// Size of every output and input report, excluding the report ID.
pub const REPORT_LEN: usize = 8;

/// Report ID prefixed on write (device has no numbered reports).
pub const REPORT_ID: u8 = 0x00;

// ── Command codes (byte 0) ──

/// Set color immediately.
pub const CMD_STATIC: u8 = 0x01;

/// Fade to color; byte 5 carries the fade speed.
pub const CMD_FADE: u8 = 0x02;

/// Strobe a color; byte 5 speed, byte 7 repeat count.
pub const CMD_STROBE: u8 = 0x03;

/// Wave effect; byte 1 wave type, byte 6 repeat, byte 7 speed.
pub const CMD_WAVE: u8 = 0x04;

/// Built-in pattern; byte 1 pattern id, byte 2 repeat count.
pub const CMD_PATTERN: u8 = 0x06;

// ── LED targets (byte 1 for color/strobe commands) ──

/// All six LEDs.
pub const TARGET_ALL: u8 = 0xFF;

/// LEDs on the front (tab) side.
pub const TARGET_FRONT: u8 = 0x41;

/// LEDs on the back side.
pub const TARGET_BACK: u8 = 0x42;

/// Number of individually addressable LEDs.
pub const LED_COUNT: u8 = 6;

// ── Timing defaults ──

/// Default bound on a single report write.
pub const DEFAULT_WRITE_TIMEOUT: Duration = Duration::from_millis(500);

/// Default bound on waiting for an acknowledgement report.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(100);

/// Default bound a caller waits for the worker to finish its request.
pub const DEFAULT_OPERATION_TIMEOUT: Duration = Duration::from_secs(3);

/// Delay before re-sending the last color after the device attaches.
/// The firmware plays its own power-on flashes first.
pub const DEFAULT_REAPPLY_DELAY: Duration = Duration::from_secs(2);

/// Interval between USB enumeration polls for attach/detach detection.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Consecutive I/O failures after which the connection is marked faulted.
pub const DEFAULT_FAULT_THRESHOLD: u32 = 3;
