//! Transport: USB HID handle ownership, timed I/O and attach/detach events.
//!
//! [`Transport`] is the seam between the controller and the hardware. The
//! real implementation ([`HidTransport`]) talks to hidapi; [`mock`] provides
//! an in-memory one for tests.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::Duration;

use serde::Serialize;

use crate::protocol::{LUXAFOR_PID, LUXAFOR_VID};

pub mod hid;
#[doc(hidden)]
pub mod mock;
mod watcher;

pub use hid::{DiscoveredDevice, HidTransport, enumerate_devices};

// ── Error type ──

/// Transport errors.
///
/// String payloads follow **"context: details"**, e.g. `"hid write: ..."`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    NotFound,
    OpenFailed(String),
    Timeout,
    /// The handle's I/O thread is still stuck in an earlier call.
    Busy,
    /// The device went away while the handle was open.
    Disconnected,
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::NotFound => write!(f, "Luxafor device not found"),
            TransportError::OpenFailed(e) => write!(f, "Failed to open device: {e}"),
            TransportError::Timeout => write!(f, "Device I/O timed out"),
            TransportError::Busy => write!(f, "Device is busy with a stalled request"),
            TransportError::Disconnected => write!(f, "Device disconnected"),
            TransportError::Io(e) => write!(f, "Device I/O failed: {e}"),
        }
    }
}

impl std::error::Error for TransportError {}

pub type Result<T> = std::result::Result<T, TransportError>;

// ── Device identity ──

/// Which device to open. Defaults to the first Luxafor Flag found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceSelector {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Match a specific serial number (case-insensitive). `None` = any.
    pub serial: Option<String>,
}

impl Default for DeviceSelector {
    fn default() -> Self {
        DeviceSelector {
            vendor_id: LUXAFOR_VID,
            product_id: LUXAFOR_PID,
            serial: None,
        }
    }
}

impl DeviceSelector {
    /// Selector for the given serial; blank means any device.
    pub fn with_serial(serial: &str) -> Self {
        let serial = serial.trim();
        DeviceSelector {
            serial: (!serial.is_empty()).then(|| serial.to_string()),
            ..Self::default()
        }
    }

    pub fn matches(&self, vendor_id: u16, product_id: u16, serial: Option<&str>) -> bool {
        if vendor_id != self.vendor_id || product_id != self.product_id {
            return false;
        }
        match &self.serial {
            None => true,
            Some(want) => serial.is_some_and(|s| s.eq_ignore_ascii_case(want)),
        }
    }
}

/// Identity of an opened device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeviceInfo {
    pub path: String,
    pub serial: Option<String>,
    pub product: Option<String>,
    pub manufacturer: Option<String>,
}

// ── Traits ──

/// An open HID handle. Reports passed to `write` exclude the report ID.
pub trait HidHandle: Send {
    fn write(&mut self, report: &[u8], timeout: Duration) -> Result<()>;

    /// Read one input report. `Timeout` if nothing arrives in time.
    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>>;

    fn info(&self) -> &DeviceInfo;
}

/// Opens handles and reports attach/detach.
pub trait Transport: Send + 'static {
    fn open(&mut self) -> Result<Box<dyn HidHandle>>;

    fn subscribe_device_events(&mut self) -> Result<DeviceEvents>;
}

// ── Events ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceEvent {
    Attached,
    Detached,
}

/// Stream of attach/detach events. Dropping it stops the producer.
pub struct DeviceEvents {
    rx: Receiver<DeviceEvent>,
    stop: Option<Arc<AtomicBool>>,
}

impl DeviceEvents {
    pub fn new(rx: Receiver<DeviceEvent>) -> Self {
        DeviceEvents { rx, stop: None }
    }

    /// Stream whose producer polls `stop` and exits once it is set.
    pub(crate) fn with_stop_flag(rx: Receiver<DeviceEvent>, stop: Arc<AtomicBool>) -> Self {
        DeviceEvents {
            rx,
            stop: Some(stop),
        }
    }

    pub fn recv_timeout(
        &self,
        timeout: Duration,
    ) -> std::result::Result<DeviceEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }

    pub fn try_recv(&self) -> std::result::Result<DeviceEvent, mpsc::TryRecvError> {
        self.rx.try_recv()
    }
}

impl Iterator for DeviceEvents {
    type Item = DeviceEvent;

    fn next(&mut self) -> Option<DeviceEvent> {
        self.rx.recv().ok()
    }
}

impl Drop for DeviceEvents {
    fn drop(&mut self) {
        if let Some(stop) = &self.stop {
            stop.store(true, Ordering::SeqCst);
        }
    }
}
