//! `watch` subcommand: keep the light connected, report snapshot changes,
//! run connection hooks and recover from faults until Ctrl+C.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use super::{
    Config, DeviceController, DeviceSnapshot, RUNNING, Result, SnapshotEvent, led, load_config,
};
use luxlight_lib::controller::ConnectionState;
use luxlight_lib::hooks;
use luxlight_lib::reconnect::{ReconnectState, RecoveryOutcome, try_recover};

const WATCH_POLL: Duration = Duration::from_millis(250);

fn format_snapshot(s: &DeviceSnapshot) -> String {
    let speed = if s.transition_speed.is_instant() {
        "instant".to_string()
    } else {
        format!("speed {}", s.transition_speed.get())
    };
    format!(
        "{}  {speed}  {}%  productivity {}  [{}]",
        led::format_color(s.color),
        s.brightness.percent(),
        if s.productivity_mode { "on" } else { "off" },
        if s.connected { "connected" } else { "disconnected" }
    )
}

fn report(s: &DeviceSnapshot, json: bool) {
    if !json {
        println!("  {}", format_snapshot(s));
        return;
    }
    let event = SnapshotEvent {
        state: if s.connected { "connected" } else { "disconnected" }.into(),
        snapshot: *s,
    };
    match serde_json::to_string(&event) {
        Ok(line) => println!("{line}"),
        Err(e) => log::warn!("could not serialize snapshot: {e}"),
    }
}

fn watch_loop(controller: &DeviceController, json: bool) {
    let mut reconnect = ReconnectState::with_defaults();
    let mut last_state = controller.connection_state();

    while RUNNING.load(Ordering::SeqCst) {
        std::thread::sleep(WATCH_POLL);

        let state = controller.connection_state();
        if state != last_state {
            if let ConnectionState::Error(ref reason) = state {
                log::warn!("[device] fault: {reason}");
            }
            if !json {
                println!("[device] {state}");
            }
            last_state = state;
        }

        match try_recover(controller, &mut reconnect) {
            RecoveryOutcome::Recovered if !json => println!("[device] recovered"),
            RecoveryOutcome::AwaitingDevice if !json => {
                println!("[device] reset, waiting for the light to be plugged in")
            }
            _ => {}
        }
    }
}

pub(super) fn cmd_watch(json: bool, keep: bool, config_path: Option<&Path>) -> Result<()> {
    let config: Config = load_config(config_path);
    let controller = DeviceController::start(config.transport(), config.controller_options())?;

    if !json {
        println!("luxlight — watching for the light.");
        println!(
            "  Color on connect: {}",
            led::format_color(config.parsed_default_color())
        );
        println!("Press Ctrl+C to exit.");
        println!();
    }

    let hook_config = config.clone();
    let was_connected = AtomicBool::new(false);
    let subscription = controller.subscribe(move |s: &DeviceSnapshot| {
        if was_connected.swap(s.connected, Ordering::SeqCst) != s.connected {
            hooks::run_connection_hook(s.connected, &hook_config);
        }
        report(s, json);
    });

    watch_loop(&controller, json);

    subscription.unsubscribe();
    if !keep && controller.is_connected() {
        if !json {
            println!();
            println!("Turning the light off...");
        }
        if let Err(e) = controller.turn_off() {
            log::warn!("could not turn the light off: {e}");
        }
    }
    controller.shutdown();
    if !json {
        println!("Done.");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use led::{Brightness, Color, TransitionSpeed};

    #[test]
    fn format_default_snapshot() {
        let s = DeviceSnapshot::default();
        assert_eq!(
            format_snapshot(&s),
            "#000000  instant  100%  productivity off  [disconnected]"
        );
    }

    #[test]
    fn format_connected_snapshot() {
        let s = DeviceSnapshot {
            color: Color::BLUE,
            transition_speed: TransitionSpeed::new(40),
            productivity_mode: true,
            brightness: Brightness::DIMMED,
            connected: true,
        };
        assert_eq!(
            format_snapshot(&s),
            "#0000FF  speed 40  10%  productivity on  [connected]"
        );
    }
}
