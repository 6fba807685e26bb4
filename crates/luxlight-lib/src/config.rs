//! Application configuration: TOML-based, platform-aware paths.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::controller::{
    ControllerOptions, ForceColor, PassThrough, ProductivityPolicy, SuppressChanges,
};
use crate::led::{Brightness, Color, Status, TransitionSpeed, ValueError, parse_color};
use crate::store::DeviceSnapshot;
use crate::transport::{DeviceSelector, HidTransport};

const CONFIG_FILE: &str = "config.toml";

const CONFIG_HEADER: &str =
    "# luxlight configuration. Changes made outside the app may be overwritten.\n\n";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Color shown after the light connects (hex, name, `r,g,b` or a status
    /// name such as "available"). Default: "available".
    #[serde(default = "default_color")]
    pub default_color: String,

    /// Fade speed for color changes, 0–255. 0 = instant.
    #[serde(default)]
    pub transition_speed: i64,

    /// Output brightness in percent, 0–100. Ignored while `dimmed` is set.
    #[serde(default = "default_brightness")]
    pub brightness: i64,

    /// Dim the light to 10 %.
    #[serde(default)]
    pub dimmed: bool,

    /// Start with productivity mode enabled.
    #[serde(default)]
    pub productivity_mode: bool,

    /// What productivity mode does with color requests:
    /// "passthrough", "force" (show `productivity_color`) or "suppress".
    #[serde(default = "default_policy")]
    pub productivity_policy: String,

    /// Color forced by the "force" policy. Default: "busy".
    #[serde(default = "default_productivity_color")]
    pub productivity_color: String,

    /// Preferred device serial number. Empty = first device found.
    #[serde(default)]
    pub device_serial: String,

    /// Read and check the device's acknowledgement after each write.
    #[serde(default)]
    pub read_acks: bool,

    #[serde(default = "default_write_timeout_ms")]
    pub write_timeout_ms: u64,

    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,

    /// Upper bound a caller waits for one operation to complete.
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Consecutive I/O failures before the connection is marked faulted.
    #[serde(default = "default_fault_threshold")]
    pub fault_threshold: u32,

    /// Delay before re-sending the color after the device attaches.
    /// 0 = immediately.
    #[serde(default = "default_reapply_delay_ms")]
    pub reapply_delay_ms: u64,

    /// USB polling interval for attach/detach detection.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Command to run when the light connects. Empty = disabled.
    #[serde(default)]
    pub on_connect_command: String,

    /// Command to run when the light disconnects. Empty = disabled.
    #[serde(default)]
    pub on_disconnect_command: String,
}

fn default_color() -> String {
    "available".into()
}
fn default_brightness() -> i64 {
    100
}
fn default_policy() -> String {
    "passthrough".into()
}
fn default_productivity_color() -> String {
    "busy".into()
}
fn default_write_timeout_ms() -> u64 {
    500
}
fn default_read_timeout_ms() -> u64 {
    100
}
fn default_operation_timeout_ms() -> u64 {
    3000
}
fn default_fault_threshold() -> u32 {
    3
}
fn default_reapply_delay_ms() -> u64 {
    2000
}
fn default_poll_interval_ms() -> u64 {
    500
}

impl Default for Config {
    fn default() -> Self {
        Config {
            default_color: default_color(),
            transition_speed: 0,
            brightness: default_brightness(),
            dimmed: false,
            productivity_mode: false,
            productivity_policy: default_policy(),
            productivity_color: default_productivity_color(),
            device_serial: String::new(),
            read_acks: false,
            write_timeout_ms: default_write_timeout_ms(),
            read_timeout_ms: default_read_timeout_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
            fault_threshold: default_fault_threshold(),
            reapply_delay_ms: default_reapply_delay_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            on_connect_command: String::new(),
            on_disconnect_command: String::new(),
        }
    }
}

/// Parsed `productivity_policy` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    PassThrough,
    Force,
    Suppress,
}

impl PolicyKind {
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "passthrough" | "pass-through" => Some(PolicyKind::PassThrough),
            "force" => Some(PolicyKind::Force),
            "suppress" => Some(PolicyKind::Suppress),
            _ => None,
        }
    }
}

impl fmt::Display for PolicyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyKind::PassThrough => write!(f, "passthrough"),
            PolicyKind::Force => write!(f, "force"),
            PolicyKind::Suppress => write!(f, "suppress"),
        }
    }
}

/// Validation errors that [`Config::validate`] can return.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A color field could not be parsed.
    InvalidColor { field: &'static str, reason: String },
    /// A numeric field is outside its range.
    OutOfRange { field: &'static str, reason: String },
    /// `productivity_policy` is not a known policy name.
    UnknownPolicy(String),
    /// A timeout or interval is zero.
    ZeroDuration(&'static str),
    /// `fault_threshold` is zero.
    ZeroFaultThreshold,
    /// `operation_timeout_ms` cannot cover one write plus its ack read.
    ShortOperationTimeout { operation_ms: u64, io_ms: u64 },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidColor { field, reason } => {
                write!(f, "Invalid {field}: {reason}")
            }
            ValidationError::OutOfRange { field, reason } => {
                write!(f, "Invalid {field}: {reason}")
            }
            ValidationError::UnknownPolicy(name) => write!(
                f,
                "Unknown productivity policy \"{name}\" (expected passthrough, force or suppress)"
            ),
            ValidationError::ZeroDuration(field) => write!(f, "{field} must be greater than 0"),
            ValidationError::ZeroFaultThreshold => {
                write!(f, "fault_threshold must be at least 1")
            }
            ValidationError::ShortOperationTimeout {
                operation_ms,
                io_ms,
            } => write!(
                f,
                "operation_timeout_ms ({operation_ms}) must be at least \
                 write_timeout_ms + read_timeout_ms ({io_ms})"
            ),
        }
    }
}

/// Parse a color, also accepting status names ("available", "busy", ...).
pub fn parse_color_or_status(s: &str) -> Result<Color, ValueError> {
    match Status::from_name(s) {
        Some(status) => Ok(status.color()),
        None => parse_color(s),
    }
}

impl Config {
    /// `luxlight` under the user's config directory (`Luxlight` on Windows).
    pub fn dir() -> Option<PathBuf> {
        let name = if cfg!(windows) { "Luxlight" } else { "luxlight" };
        dirs::config_dir().map(|base| base.join(name))
    }

    pub fn path() -> Option<PathBuf> {
        Some(Self::dir()?.join(CONFIG_FILE))
    }

    /// Read `path`, falling back to defaults.
    ///
    /// A missing file is not an error. A file that fails to parse yields the
    /// defaults plus one warning naming the file.
    pub fn load_from(path: &Path) -> (Self, Vec<String>) {
        let Ok(text) = fs::read_to_string(path) else {
            return (Self::default(), Vec::new());
        };
        toml::from_str(&text).map_or_else(
            |e| {
                let warning = format!("config parse error in {}: {e}", path.display());
                (Self::default(), vec![warning])
            },
            |config| (config, Vec::new()),
        )
    }

    /// [`Config::load_from`] on the platform path.
    pub fn load_with_warnings() -> (Self, Vec<String>) {
        Self::path().map_or_else(|| (Self::default(), Vec::new()), |p| Self::load_from(&p))
    }

    /// Write the config to `path` with a header comment, creating parent
    /// directories. The file is replaced through a sibling `.tmp` file.
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let body = toml::to_string_pretty(self).map_err(io::Error::other)?;
        let text = [CONFIG_HEADER, body.as_str()].concat();

        let staging = path.with_extension("toml.tmp");
        fs::write(&staging, &text)?;
        if fs::rename(&staging, path).is_ok() {
            return Ok(());
        }
        // Cross-device rename.
        let written = fs::write(path, &text);
        fs::remove_file(&staging).ok();
        written
    }

    /// Check every field, collecting all problems found.
    pub fn validate(&self) -> std::result::Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(e) = parse_color_or_status(&self.default_color) {
            errors.push(ValidationError::InvalidColor {
                field: "default_color",
                reason: e.to_string(),
            });
        }
        if let Err(e) = parse_color_or_status(&self.productivity_color) {
            errors.push(ValidationError::InvalidColor {
                field: "productivity_color",
                reason: e.to_string(),
            });
        }
        if let Err(e) = TransitionSpeed::checked(self.transition_speed) {
            errors.push(ValidationError::OutOfRange {
                field: "transition_speed",
                reason: e.to_string(),
            });
        }
        if let Err(e) = Brightness::checked(self.brightness) {
            errors.push(ValidationError::OutOfRange {
                field: "brightness",
                reason: e.to_string(),
            });
        }
        if PolicyKind::from_name(&self.productivity_policy).is_none() {
            errors.push(ValidationError::UnknownPolicy(
                self.productivity_policy.clone(),
            ));
        }

        for (field, value) in [
            ("write_timeout_ms", self.write_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("operation_timeout_ms", self.operation_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
        ] {
            if value == 0 {
                errors.push(ValidationError::ZeroDuration(field));
            }
        }
        if self.fault_threshold == 0 {
            errors.push(ValidationError::ZeroFaultThreshold);
        }
        let io_ms = self.write_timeout_ms.saturating_add(self.read_timeout_ms);
        if self.operation_timeout_ms != 0 && self.operation_timeout_ms < io_ms {
            errors.push(ValidationError::ShortOperationTimeout {
                operation_ms: self.operation_timeout_ms,
                io_ms,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// `default_color`, or the "available" color if it does not parse.
    pub fn parsed_default_color(&self) -> Color {
        parse_color_or_status(&self.default_color).unwrap_or_else(|e| {
            log::warn!("default_color: {e}, using available");
            Status::Available.color()
        })
    }

    /// `productivity_color`, or the "busy" color if it does not parse.
    pub fn parsed_productivity_color(&self) -> Color {
        parse_color_or_status(&self.productivity_color).unwrap_or_else(|e| {
            log::warn!("productivity_color: {e}, using busy");
            Status::Busy.color()
        })
    }

    pub fn effective_speed(&self) -> TransitionSpeed {
        TransitionSpeed::checked(self.transition_speed).unwrap_or_else(|e| {
            log::warn!("{e}, using instant");
            TransitionSpeed::INSTANT
        })
    }

    /// `DIMMED` when `dimmed` is set, otherwise `brightness` (or 100 % if invalid).
    pub fn effective_brightness(&self) -> Brightness {
        if self.dimmed {
            return Brightness::DIMMED;
        }
        Brightness::checked(self.brightness).unwrap_or_else(|e| {
            log::warn!("{e}, using 100%");
            Brightness::NORMAL
        })
    }

    pub fn policy_kind(&self) -> PolicyKind {
        PolicyKind::from_name(&self.productivity_policy).unwrap_or_else(|| {
            log::warn!(
                "unknown productivity policy \"{}\", using passthrough",
                self.productivity_policy
            );
            PolicyKind::PassThrough
        })
    }

    pub fn policy(&self) -> Arc<dyn ProductivityPolicy> {
        match self.policy_kind() {
            PolicyKind::PassThrough => Arc::new(PassThrough),
            PolicyKind::Force => Arc::new(ForceColor(self.parsed_productivity_color())),
            PolicyKind::Suppress => Arc::new(SuppressChanges),
        }
    }

    pub fn selector(&self) -> DeviceSelector {
        DeviceSelector::with_serial(&self.device_serial)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn transport(&self) -> HidTransport {
        HidTransport::new(self.selector(), self.poll_interval())
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            write_timeout: Duration::from_millis(self.write_timeout_ms.max(1)),
            read_timeout: Duration::from_millis(self.read_timeout_ms.max(1)),
            operation_timeout: Duration::from_millis(self.operation_timeout_ms.max(1)),
            read_acks: self.read_acks,
            fault_threshold: self.fault_threshold.max(1),
            reapply_delay: Some(Duration::from_millis(self.reapply_delay_ms)),
            initial: DeviceSnapshot {
                color: self.parsed_default_color(),
                transition_speed: self.effective_speed(),
                productivity_mode: self.productivity_mode,
                brightness: self.effective_brightness(),
                connected: false,
            },
            policy: self.policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Config defaults ──

    #[test]
    fn defaults() {
        let c = Config::default();
        assert_eq!(c.default_color, "available");
        assert_eq!(c.transition_speed, 0);
        assert_eq!(c.brightness, 100);
        assert!(!c.dimmed);
        assert_eq!(c.productivity_policy, "passthrough");
        assert_eq!(c.fault_threshold, 3);
        assert_eq!(c.reapply_delay_ms, 2000);
    }

    #[test]
    fn serialize_roundtrip() {
        let c = Config {
            default_color: "#00FF00".into(),
            transition_speed: 20,
            dimmed: true,
            productivity_policy: "force".into(),
            ..Config::default()
        };
        let toml_str = toml::to_string_pretty(&c).unwrap();
        let c2: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c2.default_color, "#00FF00");
        assert_eq!(c2.transition_speed, 20);
        assert!(c2.dimmed);
        assert_eq!(c2.productivity_policy, "force");
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: Config = toml::from_str("default_color = \"#0000FF\"").unwrap();
        assert_eq!(c.default_color, "#0000FF");
        // Missing fields get defaults
        assert_eq!(c.brightness, 100);
        assert_eq!(c.write_timeout_ms, 500);
        assert_eq!(c.productivity_color, "busy");
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let c: Config = toml::from_str("").unwrap();
        assert_eq!(c.default_color, "available");
        assert_eq!(c.poll_interval_ms, 500);
        assert!(c.on_connect_command.is_empty());
    }

    #[test]
    fn wrong_type_toml_is_error() {
        let result: std::result::Result<Config, _> = toml::from_str("dimmed = \"yes\"");
        assert!(result.is_err());
    }

    #[test]
    fn config_path_ends_with_toml() {
        if let Some(path) = Config::path() {
            assert_eq!(path.file_name().unwrap(), "config.toml");
        }
    }

    #[test]
    fn load_ignores_header_comment() {
        let toml_str = format!("{CONFIG_HEADER}default_color = \"busy\"\ndimmed = true\n");
        let c: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(c.default_color, "busy");
        assert!(c.dimmed);
    }

    // ── validate ──

    #[test]
    fn validate_default_config_ok() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn validate_invalid_color() {
        let c = Config {
            default_color: "chartreuse".into(),
            ..Config::default()
        };
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 1);
        assert!(matches!(
            &errs[0],
            ValidationError::InvalidColor {
                field: "default_color",
                ..
            }
        ));
    }

    #[test]
    fn validate_speed_and_brightness_ranges() {
        let c = Config {
            transition_speed: 256,
            brightness: 101,
            ..Config::default()
        };
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 2);
        assert!(errs[0].to_string().contains("transition_speed"));
        assert!(errs[1].to_string().contains("brightness"));
    }

    #[test]
    fn validate_collects_multiple_errors() {
        let c = Config {
            productivity_color: "nope".into(),
            productivity_policy: "ignore".into(),
            write_timeout_ms: 0,
            poll_interval_ms: 0,
            fault_threshold: 0,
            ..Config::default()
        };
        let errs = c.validate().unwrap_err();
        assert_eq!(errs.len(), 5);
        assert!(errs.contains(&ValidationError::UnknownPolicy("ignore".into())));
        assert!(errs.contains(&ValidationError::ZeroDuration("write_timeout_ms")));
        assert!(errs.contains(&ValidationError::ZeroDuration("poll_interval_ms")));
        assert!(errs.contains(&ValidationError::ZeroFaultThreshold));
    }

    #[test]
    fn validate_operation_timeout_covers_io() {
        let c = Config {
            write_timeout_ms: 800,
            read_timeout_ms: 300,
            operation_timeout_ms: 1000,
            ..Config::default()
        };
        let errs = c.validate().unwrap_err();
        assert_eq!(
            errs,
            vec![ValidationError::ShortOperationTimeout {
                operation_ms: 1000,
                io_ms: 1100,
            }]
        );
        assert!(errs[0].to_string().contains("write_timeout_ms + read_timeout_ms"));

        let c = Config {
            operation_timeout_ms: 1100,
            ..c
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn validation_error_display() {
        assert_eq!(
            ValidationError::ZeroDuration("read_timeout_ms").to_string(),
            "read_timeout_ms must be greater than 0"
        );
        assert!(
            ValidationError::UnknownPolicy("x".into())
                .to_string()
                .contains("passthrough")
        );
    }

    // ── derived values ──

    #[test]
    fn status_names_are_colors() {
        assert_eq!(parse_color_or_status("busy").unwrap(), Status::Busy.color());
        assert_eq!(parse_color_or_status("#010203").unwrap(), Color::new(1, 2, 3));
    }

    #[test]
    fn dimmed_overrides_brightness() {
        let c = Config {
            brightness: 50,
            dimmed: true,
            ..Config::default()
        };
        assert_eq!(c.effective_brightness(), Brightness::DIMMED);
        let c = Config {
            brightness: 50,
            ..Config::default()
        };
        assert_eq!(c.effective_brightness().percent(), 50);
    }

    #[test]
    fn invalid_values_fall_back() {
        let c = Config {
            default_color: "bogus".into(),
            transition_speed: 999,
            brightness: -4,
            productivity_policy: "bogus".into(),
            ..Config::default()
        };
        assert_eq!(c.parsed_default_color(), Status::Available.color());
        assert_eq!(c.effective_speed(), TransitionSpeed::INSTANT);
        assert_eq!(c.effective_brightness(), Brightness::NORMAL);
        assert_eq!(c.policy_kind(), PolicyKind::PassThrough);
    }

    #[test]
    fn policy_kind_names() {
        assert_eq!(PolicyKind::from_name("Force"), Some(PolicyKind::Force));
        assert_eq!(PolicyKind::from_name("pass-through"), Some(PolicyKind::PassThrough));
        assert_eq!(PolicyKind::from_name("suppress"), Some(PolicyKind::Suppress));
        assert_eq!(PolicyKind::Suppress.to_string(), "suppress");
    }

    #[test]
    fn force_policy_uses_productivity_color() {
        use crate::controller::PolicyDecision;
        let c = Config {
            productivity_policy: "force".into(),
            productivity_color: "blue".into(),
            ..Config::default()
        };
        assert_eq!(c.policy().resolve(Color::RED), PolicyDecision::Apply(Color::BLUE));
    }

    #[test]
    fn controller_options_mapping() {
        let c = Config {
            default_color: "busy".into(),
            transition_speed: 12,
            productivity_mode: true,
            write_timeout_ms: 250,
            reapply_delay_ms: 0,
            fault_threshold: 5,
            read_acks: true,
            ..Config::default()
        };
        let o = c.controller_options();
        assert_eq!(o.write_timeout, Duration::from_millis(250));
        assert_eq!(o.reapply_delay, Some(Duration::ZERO));
        assert_eq!(o.fault_threshold, 5);
        assert!(o.read_acks);
        assert_eq!(o.initial.color, Status::Busy.color());
        assert_eq!(o.initial.transition_speed.get(), 12);
        assert!(o.initial.productivity_mode);
        assert!(!o.initial.connected);
    }

    #[test]
    fn selector_uses_serial() {
        let c = Config {
            device_serial: " ABC ".into(),
            ..Config::default()
        };
        assert_eq!(c.selector().serial.as_deref(), Some("ABC"));
        assert!(Config::default().selector().serial.is_none());
    }

    // ── save_to / load_from ──

    #[test]
    fn save_to_load_from_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let config = Config {
            default_color: "#00FF00".into(),
            transition_speed: 40,
            brightness: 80,
            dimmed: true,
            productivity_mode: true,
            productivity_policy: "suppress".into(),
            productivity_color: "purple".into(),
            device_serial: "ABC123".into(),
            read_acks: true,
            write_timeout_ms: 100,
            read_timeout_ms: 50,
            operation_timeout_ms: 1000,
            fault_threshold: 2,
            reapply_delay_ms: 0,
            poll_interval_ms: 250,
            on_connect_command: "echo connected".into(),
            on_disconnect_command: "echo disconnected".into(),
        };
        config.save_to(&path).unwrap();

        let (loaded, warnings) = Config::load_from(&path);
        assert!(warnings.is_empty());
        assert_eq!(loaded.default_color, config.default_color);
        assert_eq!(loaded.transition_speed, config.transition_speed);
        assert_eq!(loaded.brightness, config.brightness);
        assert_eq!(loaded.dimmed, config.dimmed);
        assert_eq!(loaded.productivity_mode, config.productivity_mode);
        assert_eq!(loaded.productivity_policy, config.productivity_policy);
        assert_eq!(loaded.productivity_color, config.productivity_color);
        assert_eq!(loaded.device_serial, config.device_serial);
        assert_eq!(loaded.read_acks, config.read_acks);
        assert_eq!(loaded.write_timeout_ms, config.write_timeout_ms);
        assert_eq!(loaded.read_timeout_ms, config.read_timeout_ms);
        assert_eq!(loaded.operation_timeout_ms, config.operation_timeout_ms);
        assert_eq!(loaded.fault_threshold, config.fault_threshold);
        assert_eq!(loaded.reapply_delay_ms, config.reapply_delay_ms);
        assert_eq!(loaded.poll_interval_ms, config.poll_interval_ms);
        assert_eq!(loaded.on_connect_command, config.on_connect_command);
        assert_eq!(loaded.on_disconnect_command, config.on_disconnect_command);
    }

    #[test]
    fn save_to_includes_header_comment() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::default().save_to(&path).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(
            contents.starts_with("# luxlight configuration"),
            "saved file should start with header comment"
        );
    }

    #[test]
    fn save_to_cleans_up_tmp() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        Config::default().save_to(&path).unwrap();
        assert!(!dir.path().join("config.toml.tmp").exists());
    }

    #[test]
    fn save_to_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        Config::default().save_to(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn load_from_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let (config, warnings) = Config::load_from(&dir.path().join("nonexistent.toml"));
        assert!(warnings.is_empty());
        assert_eq!(config.default_color, "available");
    }

    #[test]
    fn load_from_invalid_toml_returns_defaults_with_warning() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "this is { not valid toml").unwrap();

        let (config, warnings) = Config::load_from(&path);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("config parse error"));
        assert_eq!(config.brightness, 100);
    }
}
