//! In-memory transport for unit and integration tests.
//!
//! Always compiled, hidden from public docs. [`MockTransport::new`] returns
//! the transport (moved into the controller) plus a [`MockControl`] that
//! tests keep to inject failures, plug/unplug the device and inspect the
//! reports written.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{DeviceEvent, DeviceEvents, DeviceInfo, HidHandle, Result, Transport, TransportError};

struct MockState {
    present: bool,
    writes: Vec<Vec<u8>>,
    fail_open: Option<TransportError>,
    /// Errors returned by the next writes, oldest first.
    write_failures: VecDeque<TransportError>,
    write_delay: Duration,
    echo_acks: bool,
    pending_reads: VecDeque<Vec<u8>>,
    events_tx: Option<Sender<DeviceEvent>>,
}

struct MockShared {
    state: Mutex<MockState>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    opens: AtomicUsize,
}

impl MockShared {
    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Test double for [`Transport`].
pub struct MockTransport {
    shared: Arc<MockShared>,
}

/// Test-side handle onto a [`MockTransport`].
#[derive(Clone)]
pub struct MockControl {
    shared: Arc<MockShared>,
}

impl MockTransport {
    /// A transport with the device plugged in.
    pub fn new() -> (MockTransport, MockControl) {
        Self::with_presence(true)
    }

    /// A transport with no device attached.
    pub fn absent() -> (MockTransport, MockControl) {
        Self::with_presence(false)
    }

    fn with_presence(present: bool) -> (MockTransport, MockControl) {
        let shared = Arc::new(MockShared {
            state: Mutex::new(MockState {
                present,
                writes: Vec::new(),
                fail_open: None,
                write_failures: VecDeque::new(),
                write_delay: Duration::ZERO,
                echo_acks: false,
                pending_reads: VecDeque::new(),
                events_tx: None,
            }),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            opens: AtomicUsize::new(0),
        });
        (
            MockTransport {
                shared: shared.clone(),
            },
            MockControl { shared },
        )
    }
}

impl Transport for MockTransport {
    fn open(&mut self) -> Result<Box<dyn HidHandle>> {
        self.shared.opens.fetch_add(1, Ordering::SeqCst);
        let st = self.shared.lock();
        if let Some(e) = &st.fail_open {
            return Err(e.clone());
        }
        if !st.present {
            return Err(TransportError::NotFound);
        }
        Ok(Box::new(MockHandle {
            shared: self.shared.clone(),
            info: DeviceInfo {
                path: "mock://luxafor-flag".into(),
                serial: Some("MOCK0001".into()),
                product: Some("LUXAFOR FLAG".into()),
                manufacturer: Some("Microchip Technology Inc.".into()),
            },
        }))
    }

    fn subscribe_device_events(&mut self) -> Result<DeviceEvents> {
        let (tx, rx) = mpsc::channel();
        let mut st = self.shared.lock();
        // Mirrors the real watcher: a present device shows up on first poll.
        if st.present {
            let _ = tx.send(DeviceEvent::Attached);
        }
        st.events_tx = Some(tx);
        Ok(DeviceEvents::new(rx))
    }
}

struct MockHandle {
    shared: Arc<MockShared>,
    info: DeviceInfo,
}

impl MockHandle {
    fn write_inner(&self, report: &[u8], timeout: Duration) -> Result<()> {
        let delay = self.shared.lock().write_delay;
        if delay > timeout {
            std::thread::sleep(timeout);
            return Err(TransportError::Timeout);
        }
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
        let mut st = self.shared.lock();
        if !st.present {
            return Err(TransportError::Disconnected);
        }
        if let Some(e) = st.write_failures.pop_front() {
            return Err(e);
        }
        st.writes.push(report.to_vec());
        if st.echo_acks {
            st.pending_reads.push_back(report.to_vec());
        }
        Ok(())
    }
}

impl HidHandle for MockHandle {
    fn write(&mut self, report: &[u8], timeout: Duration) -> Result<()> {
        let now = self.shared.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.shared.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let result = self.write_inner(report, timeout);
        self.shared.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn read(&mut self, timeout: Duration) -> Result<Vec<u8>> {
        let next = {
            let mut st = self.shared.lock();
            if !st.present {
                return Err(TransportError::Disconnected);
            }
            st.pending_reads.pop_front()
        };
        match next {
            Some(bytes) => Ok(bytes),
            None => {
                std::thread::sleep(timeout);
                Err(TransportError::Timeout)
            }
        }
    }

    fn info(&self) -> &DeviceInfo {
        &self.info
    }
}

impl MockControl {
    /// Every report written so far (without report ID).
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.shared.lock().writes.clone()
    }

    pub fn last_write(&self) -> Option<Vec<u8>> {
        self.shared.lock().writes.last().cloned()
    }

    pub fn clear_writes(&self) {
        self.shared.lock().writes.clear();
    }

    /// Make the next `n` writes fail with `error`.
    pub fn fail_next_writes(&self, n: usize, error: TransportError) {
        let mut st = self.shared.lock();
        st.write_failures.extend(std::iter::repeat_n(error, n));
    }

    /// Make every `open` fail with `error` until cleared with `None`.
    pub fn fail_open(&self, error: Option<TransportError>) {
        self.shared.lock().fail_open = error;
    }

    /// Delay every write; a delay longer than the write timeout yields `Timeout`.
    pub fn set_write_delay(&self, delay: Duration) {
        self.shared.lock().write_delay = delay;
    }

    /// Echo each written report back as an input report.
    pub fn set_echo_acks(&self, echo: bool) {
        self.shared.lock().echo_acks = echo;
    }

    /// Queue a raw input report for the next `read`.
    pub fn queue_read(&self, bytes: Vec<u8>) {
        self.shared.lock().pending_reads.push_back(bytes);
    }

    /// Plug the device in and emit `Attached`.
    pub fn attach(&self) {
        self.set_present(true, DeviceEvent::Attached);
    }

    /// Unplug the device and emit `Detached`. Writes in progress fail with
    /// `Disconnected`.
    pub fn detach(&self) {
        self.set_present(false, DeviceEvent::Detached);
    }

    fn set_present(&self, present: bool, event: DeviceEvent) {
        let mut st = self.shared.lock();
        st.present = present;
        if let Some(tx) = &st.events_tx {
            let _ = tx.send(event);
        }
    }

    /// Highest number of writes observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.shared.max_in_flight.load(Ordering::SeqCst)
    }

    pub fn open_count(&self) -> usize {
        self.shared.opens.load(Ordering::SeqCst)
    }
}
