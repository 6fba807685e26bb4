//! Connection hooks: run user-defined commands when the light connects
//! or disconnects.

use std::io;
use std::process::{Command, ExitStatus};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::config::Config;

/// Set while a hook is running; connect and disconnect hooks share it.
static HOOK_RUNNING: AtomicBool = AtomicBool::new(false);

const HOOK_TIMEOUT: Duration = Duration::from_secs(30);

const EXIT_POLL: Duration = Duration::from_millis(50);

/// Run `on_connect_command` or `on_disconnect_command` in the background.
///
/// Empty commands are ignored. If a previous hook is still running the new
/// one is skipped with a warning.
pub fn run_connection_hook(connected: bool, config: &Config) {
    if connected {
        run_hook(&config.on_connect_command);
    } else {
        run_hook(&config.on_disconnect_command);
    }
}

fn run_hook(command: &str) {
    let command = command.trim();
    if command.is_empty() {
        return;
    }
    if HOOK_RUNNING
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_err()
    {
        log::warn!("previous hook still running, skipping: {command}");
        return;
    }
    let command = command.to_string();
    let spawned = std::thread::Builder::new()
        .name("luxlight-hook".into())
        .spawn(move || {
            let result = run_with_timeout(&command, HOOK_TIMEOUT);
            HOOK_RUNNING.store(false, Ordering::SeqCst);
            match result {
                Ok(status) if !status.success() => {
                    log::warn!("hook command exited with {status}: {command}");
                }
                Err(e) => log::warn!("hook command failed: {e}: {command}"),
                _ => {}
            }
        });
    if let Err(e) = spawned {
        HOOK_RUNNING.store(false, Ordering::SeqCst);
        log::warn!("could not start hook thread: {e}");
    }
}

fn shell(command: &str) -> Command {
    let (program, flag) = if cfg!(windows) { ("cmd", "/C") } else { ("sh", "-c") };
    let mut cmd = Command::new(program);
    cmd.arg(flag).arg(command);
    cmd
}

/// Run a shell command, killing it once `timeout` passes.
fn run_with_timeout(command: &str, timeout: Duration) -> io::Result<ExitStatus> {
    let mut child = shell(command).spawn()?;
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        std::thread::sleep(EXIT_POLL);
    }
    log::warn!("hook timed out after {timeout:?}, killing: {command}");
    let _ = child.kill();
    child.wait()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_commands_are_ignored() {
        run_hook("");
        run_hook("   ");
        let config = Config::default();
        run_connection_hook(true, &config);
        run_connection_hook(false, &config);
    }

    #[test]
    fn fast_command_completes() {
        let cmd = if cfg!(windows) { "echo ok" } else { "true" };
        let status = run_with_timeout(cmd, Duration::from_secs(5)).unwrap();
        assert!(status.success());
    }

    #[test]
    fn failing_command_reports_status() {
        let status = run_with_timeout("exit 3", Duration::from_secs(5)).unwrap();
        assert_eq!(status.code(), Some(3));
    }

    #[test]
    fn slow_command_is_killed() {
        let cmd = if cfg!(windows) {
            "ping -n 60 127.0.0.1"
        } else {
            "sleep 60"
        };
        let status = run_with_timeout(cmd, Duration::from_millis(300)).unwrap();
        assert!(!status.success(), "killed process should not report success");
    }

    #[test]
    fn connect_hook_writes_marker() {
        if cfg!(windows) {
            return;
        }
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("connected");
        let config = Config {
            on_connect_command: format!("touch '{}'", marker.display()),
            ..Config::default()
        };
        // Another test may hold the guard briefly; wait for it.
        while HOOK_RUNNING.load(Ordering::SeqCst) {
            std::thread::sleep(Duration::from_millis(10));
        }
        run_connection_hook(true, &config);
        for _ in 0..100 {
            if marker.exists() {
                break;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        assert!(marker.exists());
    }
}
