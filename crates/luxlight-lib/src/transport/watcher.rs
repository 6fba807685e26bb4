//! Attach/detach detection by polling USB enumeration.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use super::{DeviceEvent, DeviceEvents, Result, TransportError};

/// Granularity at which the watcher checks its stop flag while sleeping.
const STOP_CHECK: Duration = Duration::from_millis(50);

/// Spawn a watcher thread that calls `probe` every `interval` and emits an
/// event on each presence edge. The first probe starts from "absent", so a
/// device that is already plugged in is reported as `Attached`.
pub(crate) fn spawn<P>(mut probe: P, interval: Duration) -> Result<DeviceEvents>
where
    P: FnMut() -> bool + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    let stop = Arc::new(AtomicBool::new(false));
    let thread_stop = stop.clone();

    std::thread::Builder::new()
        .name("luxlight-usb-watch".into())
        .spawn(move || {
            let mut present = false;
            while !thread_stop.load(Ordering::SeqCst) {
                let now = probe();
                if now != present {
                    present = now;
                    let event = if now {
                        DeviceEvent::Attached
                    } else {
                        DeviceEvent::Detached
                    };
                    log::debug!("usb watcher: {event:?}");
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                let deadline = Instant::now() + interval;
                while Instant::now() < deadline && !thread_stop.load(Ordering::SeqCst) {
                    std::thread::sleep(STOP_CHECK.min(interval));
                }
            }
        })
        .map_err(|e| TransportError::Io(format!("spawn watcher: {e}")))?;

    Ok(DeviceEvents::with_stop_flag(rx, stop))
}
