//! `config` subcommand: show current configuration and file paths.

use std::path::Path;

use super::{
    Config, ConfigOutput, LuxlightError, Result, config, kv, kv_indent, kv_width, led,
    load_config, print_json,
};

/// `"value -> #RRGGBB"`, or `"value (invalid)"`.
fn color_display(value: &str) -> String {
    match config::parse_color_or_status(value) {
        Ok(c) => format!("{value} -> {}", led::format_color(c)),
        Err(_) => format!("{value} (invalid)"),
    }
}

fn command_display(command: &str) -> &str {
    if command.trim().is_empty() {
        "(none)"
    } else {
        command
    }
}

pub(super) fn cmd_config(json: bool, init: bool, custom_path: Option<&Path>) -> Result<()> {
    let config_path = custom_path.map(|p| p.to_path_buf()).or_else(Config::path);

    if init {
        let Some(path) = &config_path else {
            return Err(LuxlightError::Config("no config directory".into()));
        };
        if path.exists() {
            log::warn!("{} already exists, not overwriting", path.display());
        } else {
            Config::default().save_to(path)?;
            if !json {
                println!("Wrote default config to {}", path.display());
            }
        }
    }

    let config = load_config(custom_path);
    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let issues: Vec<String> = match config.validate() {
        Ok(()) => Vec::new(),
        Err(errors) => errors.iter().map(ToString::to_string).collect(),
    };

    if json {
        return print_json(&ConfigOutput {
            config_file: config_path.as_ref().map(|p| p.display().to_string()),
            config_file_exists: config_exists,
            settings: config,
            issues,
        });
    }

    let w = kv_width(
        &["Config file:"],
        &[
            "default_color:",
            "transition_speed:",
            "brightness:",
            "dimmed:",
            "productivity_mode:",
            "productivity_policy:",
            "productivity_color:",
            "device_serial:",
            "read_acks:",
            "write_timeout_ms:",
            "read_timeout_ms:",
            "operation_timeout_ms:",
            "fault_threshold:",
            "reapply_delay_ms:",
            "poll_interval_ms:",
            "on_connect_command:",
            "on_disconnect_command:",
        ],
    );

    match &config_path {
        Some(p) if config_exists => kv("Config file:", format_args!("{} (loaded)", p.display()), w),
        Some(p) => kv(
            "Config file:",
            format_args!("{} (not found, using defaults)", p.display()),
            w,
        ),
        None => kv("Config file:", "(no config directory)", w),
    }
    println!();

    println!("Light:");
    kv_indent("default_color:", color_display(&config.default_color), w);
    kv_indent("transition_speed:", config.transition_speed, w);
    kv_indent("brightness:", config.brightness, w);
    kv_indent("dimmed:", config.dimmed, w);
    kv_indent("productivity_mode:", config.productivity_mode, w);
    kv_indent("productivity_policy:", &config.productivity_policy, w);
    kv_indent(
        "productivity_color:",
        color_display(&config.productivity_color),
        w,
    );
    println!();

    println!("Device:");
    let serial = if config.device_serial.is_empty() {
        "(first found)"
    } else {
        config.device_serial.as_str()
    };
    kv_indent("device_serial:", serial, w);
    kv_indent("read_acks:", config.read_acks, w);
    kv_indent("write_timeout_ms:", config.write_timeout_ms, w);
    kv_indent("read_timeout_ms:", config.read_timeout_ms, w);
    kv_indent("operation_timeout_ms:", config.operation_timeout_ms, w);
    kv_indent("fault_threshold:", config.fault_threshold, w);
    kv_indent("reapply_delay_ms:", config.reapply_delay_ms, w);
    kv_indent("poll_interval_ms:", config.poll_interval_ms, w);
    println!();

    println!("Hooks:");
    kv_indent(
        "on_connect_command:",
        command_display(&config.on_connect_command),
        w,
    );
    kv_indent(
        "on_disconnect_command:",
        command_display(&config.on_disconnect_command),
        w,
    );

    if !issues.is_empty() {
        println!();
        println!("Problems:");
        for issue in &issues {
            println!("  {issue}");
        }
    }
    Ok(())
}
