//! `status` subcommand: show device presence and effective settings.

use std::path::Path;

use super::{
    Config, ConfigSummaryJson, DeviceStatusJson, DiscoveredDevice, Result, StatusOutput,
    enumerate_devices, kv, kv_indent, kv_width, led, load_config, print_json,
};

fn summarize_config(config: &Config) -> ConfigSummaryJson {
    ConfigSummaryJson {
        default_color: led::format_color(config.parsed_default_color()),
        transition_speed: config.effective_speed().get(),
        brightness: config.effective_brightness().percent(),
        productivity_mode: config.productivity_mode,
        productivity_policy: config.policy_kind().to_string(),
    }
}

fn device_status(dev: DiscoveredDevice) -> DeviceStatusJson {
    DeviceStatusJson {
        path: dev.path,
        product: dev.product,
        serial: dev.serial,
    }
}

fn print_status(device: Option<DeviceStatusJson>, config: &Config, json: bool) -> Result<()> {
    let summary = summarize_config(config);

    if json {
        return print_json(&StatusOutput {
            version: env!("CARGO_PKG_VERSION").to_string(),
            device,
            config: summary,
        });
    }

    let w = kv_width(
        &["Version:", "Device:"],
        &[
            "Product:",
            "Serial:",
            "Path:",
            "Default color:",
            "Fade speed:",
            "Brightness:",
            "Productivity:",
        ],
    );

    kv("Version:", env!("CARGO_PKG_VERSION"), w);
    println!();

    match &device {
        Some(dev) => {
            kv("Device:", "PRESENT", w);
            if let Some(ref product) = dev.product {
                kv_indent("Product:", product, w);
            }
            if let Some(ref serial) = dev.serial {
                kv_indent("Serial:", serial, w);
            }
            kv_indent("Path:", &dev.path, w);
        }
        None => kv("Device:", "NOT FOUND", w),
    }
    println!();

    println!("Config:");
    kv_indent("Default color:", &summary.default_color, w);
    let speed = match summary.transition_speed {
        0 => "instant".to_string(),
        s => s.to_string(),
    };
    kv_indent("Fade speed:", speed, w);
    kv_indent("Brightness:", format_args!("{}%", summary.brightness), w);
    let productivity = if summary.productivity_mode {
        format!("on ({})", summary.productivity_policy)
    } else {
        "off".to_string()
    };
    kv_indent("Productivity:", productivity, w);

    Ok(())
}

pub(super) fn cmd_status(json: bool, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let device = enumerate_devices(&config.selector())
        .into_iter()
        .next()
        .map(device_status);
    print_status(device, &config, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_uses_effective_values() {
        let config = Config {
            dimmed: true,
            transition_speed: 400,
            productivity_policy: "force".into(),
            ..Config::default()
        };
        let s = summarize_config(&config);
        assert_eq!(s.default_color, "#00B31A");
        assert_eq!(s.brightness, 10);
        assert_eq!(s.transition_speed, 0, "out-of-range speed falls back");
        assert_eq!(s.productivity_policy, "force");
    }

    #[test]
    fn print_status_without_device_succeeds() {
        assert!(print_status(None, &Config::default(), false).is_ok());
        assert!(print_status(None, &Config::default(), true).is_ok());
    }

    #[test]
    fn print_status_with_device_succeeds() {
        let dev = device_status(DiscoveredDevice {
            path: "usb:001/004".into(),
            serial: Some("LX123".into()),
            product: Some("LUXAFOR FLAG".into()),
        });
        assert!(print_status(Some(dev), &Config::default(), false).is_ok());
    }
}
