//! `pattern`, `wave` and `strobe` subcommands: firmware animations.

use std::path::Path;

use super::{Result, config, led, load_config, open_controller};
use led::{Effect, LedTarget, Pattern, TransitionSpeed, ValueError, WaveType};

/// Parse an LED selection: `all`, `front`, `back` or an index 1-6.
pub(super) fn parse_target(s: &str) -> std::result::Result<LedTarget, ValueError> {
    match s.trim().to_lowercase().as_str() {
        "all" => Ok(LedTarget::All),
        "front" => Ok(LedTarget::Front),
        "back" => Ok(LedTarget::Back),
        other => {
            let index = other.parse::<i64>().map_err(|_| {
                ValueError::Parse(format!(
                    "LED \"{s}\" (expected all, front, back or an index 1-6)"
                ))
            })?;
            LedTarget::single(index)
        }
    }
}

fn play(effect: Effect, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path);
    let controller = open_controller(&config)?;
    controller.play_effect(effect)?;
    Ok(())
}

pub(super) fn cmd_pattern(name: &str, repeat: u8, config_path: Option<&Path>) -> Result<()> {
    let pattern = Pattern::from_name(name)?;
    play(Effect::Pattern { pattern, repeat }, config_path)?;
    println!("Pattern: {} x{repeat}", pattern.name());
    Ok(())
}

pub(super) fn cmd_wave(
    wave: &str,
    color: &str,
    speed: u8,
    repeat: u8,
    config_path: Option<&Path>,
) -> Result<()> {
    let wave = WaveType::from_name(wave)?;
    let color = config::parse_color_or_status(color)?;
    play(
        Effect::Wave {
            wave,
            color,
            speed: TransitionSpeed::new(speed),
            repeat,
        },
        config_path,
    )?;
    println!(
        "Wave: {} {} x{repeat}",
        wave.name(),
        led::format_color(color)
    );
    Ok(())
}

pub(super) fn cmd_strobe(
    color: &str,
    target: &str,
    speed: u8,
    repeat: u8,
    config_path: Option<&Path>,
) -> Result<()> {
    let color = config::parse_color_or_status(color)?;
    let target = parse_target(target)?;
    play(
        Effect::Strobe {
            target,
            color,
            speed: TransitionSpeed::new(speed),
            repeat,
        },
        config_path,
    )?;
    println!("Strobe: {} x{repeat}", led::format_color(color));
    Ok(())
}
