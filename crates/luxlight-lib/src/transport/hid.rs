//! hidapi-backed transport.
//!
//! Each open handle gets its own I/O thread that owns the `HidApi` context
//! and the `HidDevice`. Callers hand requests over a channel and wait with a
//! bounded receive, so a stalled USB call never blocks the caller past its
//! timeout.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::time::Duration;

use hidapi::{HidApi, HidDevice};
use serde::Serialize;

use super::{DeviceEvents, DeviceInfo, DeviceSelector, HidHandle, Result, Transport, TransportError};
use crate::protocol::{DEFAULT_POLL_INTERVAL, REPORT_ID, REPORT_LEN};

/// How long `open` waits for the I/O thread to report the open result.
const OPEN_TIMEOUT: Duration = Duration::from_secs(2);

/// Extra time the caller allows on top of a read timeout, for the hand-off.
const READ_SLACK: Duration = Duration::from_millis(50);

// ── Transport ──

/// Real USB HID transport.
pub struct HidTransport {
    selector: DeviceSelector,
    poll_interval: Duration,
}

impl Default for HidTransport {
    fn default() -> Self {
        Self::new(DeviceSelector::default(), DEFAULT_POLL_INTERVAL)
    }
}

impl HidTransport {
    pub fn new(selector: DeviceSelector, poll_interval: Duration) -> Self {
        HidTransport {
            selector,
            poll_interval,
        }
    }

    pub fn selector(&self) -> &DeviceSelector {
        &self.selector
    }
}

impl Transport for HidTransport {
    fn open(&mut self) -> Result<Box<dyn HidHandle>> {
        let handle = HidIoHandle::spawn(self.selector.clone())?;
        log::debug!("opened {}", handle.info.path);
        Ok(Box::new(handle))
    }

    fn subscribe_device_events(&mut self) -> Result<DeviceEvents> {
        let selector = self.selector.clone();
        super::watcher::spawn(
            move || !enumerate_devices(&selector).is_empty(),
            self.poll_interval,
        )
    }
}

// ── Per-handle I/O thread ──

enum IoRequest {
    Write {
        data: Vec<u8>,
        reply: Sender<Result<()>>,
    },
    Read {
        timeout: Duration,
        reply: Sender<Result<Vec<u8>>>,
    },
}

struct HidIoHandle {
    io_tx: Sender<IoRequest>,
    /// Set while the I/O thread is executing a request.
    busy: Arc<AtomicBool>,
    info: DeviceInfo,
}

impl HidIoHandle {
    fn spawn(selector: DeviceSelector) -> Result<Self> {
        let (io_tx, io_rx) = mpsc::channel::<IoRequest>();
        let (open_tx, open_rx) = mpsc::channel::<Result<DeviceInfo>>();
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = busy.clone();

        std::thread::Builder::new()
            .name("luxlight-hid-io".into())
            .spawn(move || {
                let mut api = match HidApi::new() {
                    Ok(api) => api,
                    Err(e) => {
                        let _ = open_tx.send(Err(TransportError::OpenFailed(format!(
                            "hidapi init: {e}"
                        ))));
                        return;
                    }
                };
                let device = match open_matching(&api, &selector) {
                    Ok((device, info)) => {
                        let _ = open_tx.send(Ok(info));
                        device
                    }
                    Err(e) => {
                        let _ = open_tx.send(Err(e));
                        return;
                    }
                };
                // Runs until the handle (and with it the sender) is dropped.
                while let Ok(req) = io_rx.recv() {
                    match req {
                        IoRequest::Write { data, reply } => {
                            let result = write_report(&mut api, &device, &selector, &data);
                            worker_busy.store(false, Ordering::SeqCst);
                            let _ = reply.send(result);
                        }
                        IoRequest::Read { timeout, reply } => {
                            let result = read_report(&device, timeout);
                            worker_busy.store(false, Ordering::SeqCst);
                            let _ = reply.send(result);
                        }
                    }
                }
            })
            .map_err(|e| TransportError::OpenFailed(format!("spawn I/O thread: {e}")))?;

        let info = match open_rx.recv_timeout(OPEN_TIMEOUT) {
            Ok(result) => result?,
            Err(RecvTimeoutError::Timeout) => return Err(TransportError::Timeout),
            Err(RecvTimeoutError::Disconnected) => {
                return Err(TransportError::OpenFailed("I/O thread exited".into()));
            }
        };
        Ok(HidIoHandle { io_tx, busy, info })
    }

    /// Hand a request to the I/O thread and wait up to `timeout` for the reply.
    fn submit<T>(
        &self,
        timeout: Duration,
        make: impl FnOnce(Sender<Result<T>>) -> IoRequest,
    ) -> Result<T> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(TransportError::Busy);
        }
        let (reply_tx, reply_rx) = mpsc::channel();
        if self.io_tx.send(make(reply_tx)).is_err() {
            self.busy.store(false, Ordering::SeqCst);
            return Err(TransportError::Disconnected);
        }
        match reply_rx.recv_timeout(timeout) {
            Ok(result) => result,
            // `busy` stays set until the stuck call returns.
            Err(RecvTimeoutError::Timeout) => Err(TransportError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(TransportError::Disconnected),
        }
    }
}

impl HidHandle for HidIoHandle {
    fn write(&mut self, report: &[u8], timeout: Duration) -> Result<()> {
        let mut data = Vec::with_capacity(report.len() + 1);
        data.push(REPORT_ID);
        data.extend_from_slice(report);
        self.submit(timeout, |reply| IoRequest::Write { data, reply })
    }

    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        self.submit(timeout + READ_SLACK, |reply| IoRequest::Read { timeout, reply })
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

fn open_matching(api: &HidApi, selector: &DeviceSelector) -> Result<(HidDevice, DeviceInfo)> {
    let found = api
        .device_list()
        .find(|d| selector.matches(d.vendor_id(), d.product_id(), d.serial_number()))
        .ok_or(TransportError::NotFound)?;
    let device = api
        .open_path(found.path())
        .map_err(|e| TransportError::OpenFailed(format!("hid open: {e}")))?;
    let info = DeviceInfo {
        path: found.path().to_string_lossy().into_owned(),
        serial: found.serial_number().map(str::to_string),
        product: found.product_string().map(str::to_string),
        manufacturer: found.manufacturer_string().map(str::to_string),
    };
    Ok((device, info))
}

fn write_report(
    api: &mut HidApi,
    device: &HidDevice,
    selector: &DeviceSelector,
    data: &[u8],
) -> Result<()> {
    match device.write(data) {
        Ok(n) if n >= data.len() - 1 => Ok(()),
        Ok(n) => Err(TransportError::Io(format!(
            "hid write: short write ({n} of {} bytes)",
            data.len()
        ))),
        Err(e) => {
            // A failed write on an unplugged device surfaces as a generic
            // error; re-enumerate to tell the two apart.
            let still_present = api.refresh_devices().is_ok()
                && api
                    .device_list()
                    .any(|d| selector.matches(d.vendor_id(), d.product_id(), d.serial_number()));
            if still_present {
                Err(TransportError::Io(format!("hid write: {e}")))
            } else {
                Err(TransportError::Disconnected)
            }
        }
    }
}

fn read_report(device: &HidDevice, timeout: Duration) -> Result<Vec<u8>> {
    let mut buf = [0u8; REPORT_LEN + 1];
    let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
    match device.read_timeout(&mut buf, ms) {
        Ok(0) => Err(TransportError::Timeout),
        Ok(n) => Ok(buf[..n].to_vec()),
        Err(e) => Err(TransportError::Io(format!("hid read: {e}"))),
    }
}

// ── Enumeration ──

/// An attached light (not opened).
#[derive(Debug, Clone, Serialize)]
pub struct DiscoveredDevice {
    pub path: String,
    pub serial: Option<String>,
    pub product: Option<String>,
}

/// List attached devices matching `selector`. Failures yield an empty list.
pub fn enumerate_devices(selector: &DeviceSelector) -> Vec<DiscoveredDevice> {
    #[cfg(target_os = "linux")]
    {
        enumerate_devices_linux(selector)
    }
    #[cfg(not(target_os = "linux"))]
    {
        enumerate_devices_hidapi(selector)
    }
}

#[cfg(target_os = "linux")]
fn enumerate_devices_linux(selector: &DeviceSelector) -> Vec<DiscoveredDevice> {
    let Ok(devices) = nusb::list_devices() else {
        return Vec::new();
    };

    devices
        .filter(|dev| selector.matches(dev.vendor_id(), dev.product_id(), dev.serial_number()))
        .map(|dev| DiscoveredDevice {
            path: format!(
                "usb:{:03}/{:03} [{:04x}:{:04x}]",
                dev.bus_number(),
                dev.device_address(),
                dev.vendor_id(),
                dev.product_id(),
            ),
            serial: dev.serial_number().map(str::to_string),
            product: dev.product_string().map(str::to_string),
        })
        .collect()
}

#[cfg(not(target_os = "linux"))]
fn enumerate_devices_hidapi(selector: &DeviceSelector) -> Vec<DiscoveredDevice> {
    let Ok(api) = HidApi::new() else {
        return Vec::new();
    };
    api.device_list()
        .filter(|d| selector.matches(d.vendor_id(), d.product_id(), d.serial_number()))
        .map(|d| DiscoveredDevice {
            path: d.path().to_string_lossy().into_owned(),
            serial: d.serial_number().map(str::to_string),
            product: d.product_string().map(str::to_string),
        })
        .collect()
}
