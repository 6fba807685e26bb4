//! `color`, `rgb`, `preset` and `off` subcommands: static light control.

use std::path::Path;

use super::{LuxlightError, Result, led, load_config, open_controller};
use led::{Color, Status};

pub(super) fn cmd_color(
    color: Color,
    speed: Option<i64>,
    dim: bool,
    config_path: Option<&Path>,
) -> Result<()> {
    let config = load_config(config_path);
    let controller = open_controller(&config)?;
    if let Some(speed) = speed {
        controller.set_transition_speed_checked(speed)?;
    }
    if dim {
        controller.set_dimmed(true)?;
    }
    controller.set_color(color)?;

    let shown = controller.current_snapshot();
    if shown.color == color {
        println!("Light: {}", led::format_color(color));
    } else {
        println!(
            "Light: {} (productivity mode, requested {})",
            led::format_color(shown.color),
            led::format_color(color)
        );
    }
    Ok(())
}

pub(super) fn cmd_preset(name: &str, config_path: Option<&Path>) -> Result<()> {
    let status = Status::from_name(name).ok_or_else(|| {
        LuxlightError::Value(led::ValueError::Parse(format!(
            "unknown status \"{name}\" (expected available, busy, away or off)"
        )))
    })?;
    let config = load_config(config_path);
    let controller = open_controller(&config)?;
    controller.set_status(status)?;
    println!(
        "Light: {} ({})",
        led::format_color(status.color()),
        status.name()
    );
    Ok(())
}

pub(super) fn cmd_off(config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let controller = open_controller(&config)?;
    controller.turn_off()?;
    println!("Light: off");
    Ok(())
}
