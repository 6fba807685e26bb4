//! CLI subcommands: light control, effects, device info, watch mode.

mod config_cmd;
mod devices;
mod effect;
mod light;
mod status;
mod watch;

use std::path::Path;

use clap::Subcommand;
use serde::Serialize;

pub(super) use crate::RUNNING;
pub(super) use luxlight_lib::LuxlightError;
pub(super) use luxlight_lib::config::{self, Config};
pub(super) use luxlight_lib::controller::DeviceController;
pub(super) use luxlight_lib::error::Result;
pub(super) use luxlight_lib::led;
pub(super) use luxlight_lib::store::DeviceSnapshot;
pub(super) use luxlight_lib::transport::{DiscoveredDevice, enumerate_devices};

const PADDING: usize = 2;
const INDENT: &str = "  ";

/// Value column for a block of `key: value` lines, shared by top-level keys
/// and keys printed under a heading with [`kv_indent`].
pub(super) fn kv_width(top: &[&str], indent: &[&str]) -> usize {
    let widest = |keys: &[&str], extra: usize| {
        keys.iter()
            .map(|k| k.len() + PADDING + extra)
            .max()
            .unwrap_or(0)
    };
    widest(top, 0).max(widest(indent, INDENT.len()))
}

pub(super) fn format_kv(key: &str, value: impl std::fmt::Display, w: usize) -> String {
    format!("{key:<w$}{value}")
}

pub(super) fn kv(key: &str, value: impl std::fmt::Display, w: usize) {
    println!("{}", format_kv(key, value, w));
}

pub(super) fn kv_indent(key: &str, value: impl std::fmt::Display, w: usize) {
    println!(
        "{INDENT}{}",
        format_kv(key, value, w.saturating_sub(INDENT.len()))
    );
}

pub(super) fn print_json(value: &impl Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| LuxlightError::Config(format!("JSON serialization failed: {e}")))?;
    println!("{json}");
    Ok(())
}

/// Load the config from `custom_path` or the platform default, logging
/// parse and validation problems.
pub(super) fn load_config(custom_path: Option<&Path>) -> Config {
    let (config, warnings) = match custom_path {
        Some(p) => Config::load_from(p),
        None => Config::load_with_warnings(),
    };
    for w in &warnings {
        log::warn!("{w}");
    }
    if let Err(errors) = config.validate() {
        for e in &errors {
            log::warn!("[config] {e}");
        }
    }
    config
}

/// Start a controller for a one-shot command and open the light.
///
/// The stored color is not re-sent on connect; the command writes what it
/// needs itself.
pub(super) fn open_controller(config: &Config) -> Result<DeviceController> {
    let mut options = config.controller_options();
    options.reapply_delay = None;
    let controller = DeviceController::start(config.transport(), options)?;
    controller.connect()?;
    Ok(controller)
}

// ── JSON output structs ──

#[derive(Serialize)]
pub(super) struct StatusOutput {
    pub version: String,
    pub device: Option<DeviceStatusJson>,
    pub config: ConfigSummaryJson,
}

#[derive(Serialize)]
pub(super) struct DeviceStatusJson {
    pub path: String,
    pub product: Option<String>,
    pub serial: Option<String>,
}

#[derive(Serialize)]
pub(super) struct ConfigSummaryJson {
    pub default_color: String,
    pub transition_speed: u8,
    pub brightness: u8,
    pub productivity_mode: bool,
    pub productivity_policy: String,
}

#[derive(Serialize)]
pub(super) struct ConfigOutput {
    pub config_file: Option<String>,
    pub config_file_exists: bool,
    pub settings: Config,
    pub issues: Vec<String>,
}

#[derive(Serialize)]
pub(super) struct DevicesOutput {
    pub count: usize,
    pub devices: Vec<DiscoveredDevice>,
}

#[derive(Serialize)]
pub(super) struct SnapshotEvent {
    pub state: String,
    pub snapshot: DeviceSnapshot,
}

#[derive(Subcommand)]
pub enum Command {
    /// Set a static color (hex, name, r,g,b or a status name)
    Color {
        color: String,
        /// Fade speed, 0-255 (default: from config)
        #[arg(long)]
        speed: Option<i64>,
        /// Show the color at reduced brightness
        #[arg(long)]
        dim: bool,
    },

    /// Set a static color from red, green and blue channel values (0-255)
    Rgb {
        red: i64,
        green: i64,
        blue: i64,
        /// Fade speed, 0-255 (default: from config)
        #[arg(long)]
        speed: Option<i64>,
        /// Show the color at reduced brightness
        #[arg(long)]
        dim: bool,
    },

    /// Show a presence status color (available, busy, away, off)
    Preset { status: String },

    /// Turn the light off
    Off,

    /// Play a built-in pattern (traffic-lights, police, rainbow, random1-5)
    Pattern {
        name: String,
        /// Number of times to play the pattern
        #[arg(long, default_value_t = 1)]
        repeat: u8,
    },

    /// Play a wave animation (short, long, overlapping-short, overlapping-long)
    Wave {
        wave: String,
        color: String,
        /// Animation speed, 0-255
        #[arg(long, default_value_t = 30)]
        speed: u8,
        /// Number of waves
        #[arg(long, default_value_t = 2)]
        repeat: u8,
    },

    /// Flash a color
    Strobe {
        color: String,
        /// LEDs to flash: all, front, back or an index 1-6
        #[arg(long, default_value = "all")]
        led: String,
        /// Flash speed, 0-255
        #[arg(long, default_value_t = 20)]
        speed: u8,
        /// Number of flashes
        #[arg(long, default_value_t = 3)]
        repeat: u8,
    },

    /// Show device presence and effective settings
    Status,

    /// List connected Luxafor devices
    Devices,

    /// Show current configuration and file paths
    Config {
        /// Write a default config file if none exists
        #[arg(long)]
        init: bool,
    },

    /// Keep the light connected and report state changes until Ctrl+C
    Watch {
        /// Leave the light on when exiting
        #[arg(long)]
        keep: bool,
    },
}

fn warn_json_ignored(command: &str) {
    log::warn!("`{command}` has no JSON output; ignoring --json");
}

pub fn run(cmd: Command, json: bool, config_path: Option<&Path>) -> Result<()> {
    let name = match &cmd {
        Command::Color { .. } => Some("color"),
        Command::Rgb { .. } => Some("rgb"),
        Command::Preset { .. } => Some("preset"),
        Command::Off => Some("off"),
        Command::Pattern { .. } => Some("pattern"),
        Command::Wave { .. } => Some("wave"),
        Command::Strobe { .. } => Some("strobe"),
        _ => None,
    };
    if json && let Some(name) = name {
        warn_json_ignored(name);
    }

    match cmd {
        Command::Color { color, speed, dim } => {
            let color = config::parse_color_or_status(&color)?;
            light::cmd_color(color, speed, dim, config_path)
        }
        Command::Rgb {
            red,
            green,
            blue,
            speed,
            dim,
        } => {
            let color = led::Color::from_channels(red, green, blue)?;
            light::cmd_color(color, speed, dim, config_path)
        }
        Command::Preset { status } => light::cmd_preset(&status, config_path),
        Command::Off => light::cmd_off(config_path),
        Command::Pattern { name, repeat } => effect::cmd_pattern(&name, repeat, config_path),
        Command::Wave {
            wave,
            color,
            speed,
            repeat,
        } => effect::cmd_wave(&wave, &color, speed, repeat, config_path),
        Command::Strobe {
            color,
            led,
            speed,
            repeat,
        } => effect::cmd_strobe(&color, &led, speed, repeat, config_path),
        Command::Status => status::cmd_status(json, config_path),
        Command::Devices => devices::cmd_devices(json, config_path),
        Command::Config { init } => config_cmd::cmd_config(json, init, config_path),
        Command::Watch { keep } => watch::cmd_watch(json, keep, config_path),
    }
}


#[cfg(test)]
mod json_output_tests {
    use super::*;

    #[test]
    fn status_output_with_null_device() {
        let output = StatusOutput {
            version: "0.1.0".into(),
            device: None,
            config: ConfigSummaryJson {
                default_color: "#00B31A".into(),
                transition_speed: 0,
                brightness: 100,
                productivity_mode: false,
                productivity_policy: "passthrough".into(),
            },
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["version"], "0.1.0");
        assert!(parsed["device"].is_null());
        assert_eq!(parsed["config"]["brightness"], 100);
        assert_eq!(parsed.as_object().unwrap().len(), 3);
    }

    #[test]
    fn config_output_carries_settings_and_issues() {
        let output = ConfigOutput {
            config_file: None,
            config_file_exists: false,
            settings: Config::default(),
            issues: vec!["brightness must be between 0 and 100".into()],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert!(parsed["config_file"].is_null());
        assert_eq!(parsed["settings"]["default_color"], "available");
        assert_eq!(parsed["settings"]["transition_speed"], 0);
        assert_eq!(parsed["issues"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn devices_output_with_devices() {
        let output = DevicesOutput {
            count: 2,
            devices: vec![
                DiscoveredDevice {
                    path: "usb:001/002".into(),
                    serial: Some("SERIAL1".into()),
                    product: Some("LUXAFOR FLAG".into()),
                },
                DiscoveredDevice {
                    path: "usb:001/003".into(),
                    serial: None,
                    product: None,
                },
            ],
        };
        let parsed = serde_json::to_value(&output).unwrap();
        assert_eq!(parsed["count"], 2);
        let devices = parsed["devices"].as_array().unwrap();
        assert_eq!(devices[0]["serial"], "SERIAL1");
        assert!(devices[1]["serial"].is_null());
    }

    #[test]
    fn snapshot_event_serializes_color_as_hex() {
        let event = SnapshotEvent {
            state: "connected".into(),
            snapshot: DeviceSnapshot {
                color: led::Color::RED,
                connected: true,
                ..DeviceSnapshot::default()
            },
        };
        let parsed = serde_json::to_value(&event).unwrap();
        assert_eq!(parsed["state"], "connected");
        assert_eq!(parsed["snapshot"]["color"], "#FF0000");
        assert_eq!(parsed["snapshot"]["connected"], true);
    }
}
