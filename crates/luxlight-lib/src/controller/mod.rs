//! Device controller: the public API over one status light.
//!
//! A dedicated worker thread owns the transport and the open handle. Public
//! operations enqueue a request and block until the worker replies (bounded
//! by the operation timeout). Attach/detach events from the transport are
//! forwarded into the same queue, so every hardware transaction and every
//! connection change is serialized through one thread.
//!
//! ```no_run
//! use luxlight_lib::controller::{ControllerOptions, DeviceController};
//! use luxlight_lib::led::Color;
//! use luxlight_lib::transport::HidTransport;
//!
//! # fn main() -> luxlight_lib::error::Result<()> {
//! let controller = DeviceController::start(HidTransport::default(), ControllerOptions::default())?;
//! controller.connect()?;
//! controller.set_color(Color::RED)?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::thread::{JoinHandle, ThreadId};
use std::time::{Duration, Instant};

use crate::led::{Brightness, Color, Effect, Status, TransitionSpeed, ValueError};
use crate::protocol::*;
use crate::store::{DeviceSnapshot, StateStore};
use crate::transport::{DeviceInfo, Transport};

mod connection;
mod observer;
mod policy;
mod worker;

pub use connection::{ConnectionEvent, ConnectionState};
pub use observer::{SnapshotObserver, SubscriptionHandle};
pub use policy::{ForceColor, PassThrough, PolicyDecision, ProductivityPolicy, SuppressChanges};

use observer::ObserverRegistry;
use worker::{Intent, Message, Worker};

// ── Error type ──

/// Errors returned by controller operations.
///
/// String payloads follow **"context: details"**.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    /// Input rejected before any I/O.
    Validation(ValueError),
    /// The device is not in the `Connected` state.
    NotConnected,
    NotFound,
    OpenFailed(String),
    WriteFailed(String),
    Timeout,
    /// A newer request for the same attribute replaced this one.
    Superseded,
    /// The productivity policy dropped the color change.
    Suppressed,
    /// Called from the controller's own worker thread (e.g. an observer).
    Reentrant,
    ShutDown,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::Validation(e) => write!(f, "{e}"),
            DeviceError::NotConnected => write!(f, "Device not connected"),
            DeviceError::NotFound => write!(f, "Luxafor device not found"),
            DeviceError::OpenFailed(e) => write!(f, "Failed to open device: {e}"),
            DeviceError::WriteFailed(e) => write!(f, "Write failed: {e}"),
            DeviceError::Timeout => write!(f, "Operation timed out"),
            DeviceError::Superseded => write!(f, "Request superseded by a newer one"),
            DeviceError::Suppressed => write!(f, "Color change suppressed by productivity mode"),
            DeviceError::Reentrant => {
                write!(f, "Controller called from its own worker thread")
            }
            DeviceError::ShutDown => write!(f, "Controller has been shut down"),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Validation(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ValueError> for DeviceError {
    fn from(e: ValueError) -> Self {
        DeviceError::Validation(e)
    }
}

pub type Result<T> = std::result::Result<T, DeviceError>;

// ── Options ──

/// Controller tuning. Build from [`crate::config::Config::controller_options`]
/// or start from the defaults.
#[derive(Clone)]
pub struct ControllerOptions {
    pub write_timeout: Duration,
    pub read_timeout: Duration,
    /// How long a caller waits for the worker to finish its request.
    pub operation_timeout: Duration,
    /// Read and check an acknowledgement after each write.
    pub read_acks: bool,
    /// Consecutive I/O failures before the connection is marked faulted.
    pub fault_threshold: u32,
    /// Re-send the current color this long after each successful open.
    pub reapply_delay: Option<Duration>,
    /// Starting snapshot (the `connected` flag is ignored).
    pub initial: DeviceSnapshot,
    pub policy: Arc<dyn ProductivityPolicy>,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        ControllerOptions {
            write_timeout: DEFAULT_WRITE_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            operation_timeout: DEFAULT_OPERATION_TIMEOUT,
            read_acks: false,
            fault_threshold: DEFAULT_FAULT_THRESHOLD,
            reapply_delay: Some(DEFAULT_REAPPLY_DELAY),
            initial: DeviceSnapshot::default(),
            policy: Arc::new(PassThrough),
        }
    }
}

impl fmt::Debug for ControllerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerOptions")
            .field("write_timeout", &self.write_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("read_acks", &self.read_acks)
            .field("fault_threshold", &self.fault_threshold)
            .field("reapply_delay", &self.reapply_delay)
            .field("initial", &self.initial)
            .field("policy", &self.policy.name())
            .finish()
    }
}

// ── Shared state ──

/// State readable from any thread without going through the worker.
pub(crate) struct Shared {
    pub(crate) store: StateStore,
    pub(crate) state: Mutex<ConnectionState>,
    pub(crate) device_info: Mutex<Option<DeviceInfo>>,
    pub(crate) observers: Arc<ObserverRegistry>,
}

impl Shared {
    pub(crate) fn state(&self) -> MutexGuard<'_, ConnectionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn device_info(&self) -> MutexGuard<'_, Option<DeviceInfo>> {
        self.device_info.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// How often the event forwarder checks for shutdown.
const FORWARD_POLL: Duration = Duration::from_millis(100);

/// Extra wait past the deadline for the worker's own `Timeout` reply, which
/// follows the rollback.
const REPLY_GRACE: Duration = Duration::from_millis(250);

// ── Controller ──

pub struct DeviceController {
    tx: Mutex<Option<Sender<Message>>>,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
    forwarder: Mutex<Option<JoinHandle<()>>>,
    forward_stop: Arc<AtomicBool>,
    worker_id: ThreadId,
    operation_timeout: Duration,
}

impl DeviceController {
    /// Spawn the worker and start listening for attach/detach events.
    ///
    /// An already-attached device is opened as soon as the transport
    /// reports it.
    pub fn start<T: Transport>(
        mut transport: T,
        options: ControllerOptions,
    ) -> crate::error::Result<Self> {
        let events = transport.subscribe_device_events()?;

        let initial = DeviceSnapshot {
            connected: false,
            ..options.initial
        };
        let shared = Arc::new(Shared {
            store: StateStore::new(initial),
            state: Mutex::new(ConnectionState::Disconnected),
            device_info: Mutex::new(None),
            observers: Arc::new(ObserverRegistry::default()),
        });

        let (tx, rx) = mpsc::channel::<Message>();
        let operation_timeout = options.operation_timeout;
        let worker = Worker::new(Box::new(transport), shared.clone(), options);
        let worker = std::thread::Builder::new()
            .name("luxlight-worker".into())
            .spawn(move || worker.run(rx))?;
        let worker_id = worker.thread().id();

        let forward_stop = Arc::new(AtomicBool::new(false));
        let stop = forward_stop.clone();
        let event_tx = tx.clone();
        let forwarder = std::thread::Builder::new()
            .name("luxlight-events".into())
            .spawn(move || {
                while !stop.load(Ordering::SeqCst) {
                    match events.recv_timeout(FORWARD_POLL) {
                        Ok(event) => {
                            if event_tx.send(Message::Device(event)).is_err() {
                                break;
                            }
                        }
                        Err(RecvTimeoutError::Timeout) => {}
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            })?;

        Ok(DeviceController {
            tx: Mutex::new(Some(tx)),
            shared,
            worker: Mutex::new(Some(worker)),
            forwarder: Mutex::new(Some(forwarder)),
            forward_stop,
            worker_id,
            operation_timeout,
        })
    }

    fn request(&self, intent: Intent) -> Result<()> {
        if std::thread::current().id() == self.worker_id {
            return Err(DeviceError::Reentrant);
        }
        let (reply_tx, reply_rx) = mpsc::channel();
        let deadline = Instant::now() + self.operation_timeout;
        {
            let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
            let tx = tx.as_ref().ok_or(DeviceError::ShutDown)?;
            tx.send(Message::Request {
                intent,
                reply: reply_tx,
                deadline,
            })
            .map_err(|_| DeviceError::ShutDown)?;
        }
        let wait = deadline.saturating_duration_since(Instant::now()) + REPLY_GRACE;
        match reply_rx.recv_timeout(wait) {
            Ok(result) => result,
            Err(RecvTimeoutError::Timeout) => Err(DeviceError::Timeout),
            Err(RecvTimeoutError::Disconnected) => Err(DeviceError::ShutDown),
        }
    }

    // ── Intents ──

    pub fn set_color(&self, color: Color) -> Result<()> {
        self.request(Intent::SetColor(color))
    }

    /// Like [`set_color`](Self::set_color) for unchecked channel values.
    pub fn set_color_channels(&self, r: i64, g: i64, b: i64) -> Result<()> {
        self.set_color(Color::from_channels(r, g, b)?)
    }

    pub fn set_status(&self, status: Status) -> Result<()> {
        self.set_color(status.color())
    }

    pub fn turn_off(&self) -> Result<()> {
        self.set_color(Color::BLACK)
    }

    /// Takes effect on the next color write; never writes by itself.
    pub fn set_transition_speed(&self, speed: u8) -> Result<()> {
        self.request(Intent::SetTransitionSpeed(TransitionSpeed::new(speed)))
    }

    pub fn set_transition_speed_checked(&self, speed: i64) -> Result<()> {
        self.request(Intent::SetTransitionSpeed(TransitionSpeed::checked(speed)?))
    }

    pub fn set_productivity_mode(&self, enabled: bool) -> Result<()> {
        self.request(Intent::SetProductivityMode(enabled))
    }

    pub fn set_brightness(&self, brightness: Brightness) -> Result<()> {
        self.request(Intent::SetBrightness(brightness))
    }

    pub fn set_dimmed(&self, dimmed: bool) -> Result<()> {
        self.set_brightness(Brightness::for_dimmed(dimmed))
    }

    pub fn set_policy(&self, policy: impl ProductivityPolicy + 'static) -> Result<()> {
        self.request(Intent::SetPolicy(Arc::new(policy)))
    }

    pub fn play_effect(&self, effect: Effect) -> Result<()> {
        self.request(Intent::Effect(effect))
    }

    // ── Connection ──

    /// Open the device if it is disconnected. No-op when already connected.
    pub fn connect(&self) -> Result<()> {
        self.request(Intent::Connect)
    }

    /// Close the handle and return to `Disconnected`, clearing any error.
    pub fn reset(&self) -> Result<()> {
        self.request(Intent::Reset)
    }

    /// Stop the worker and release the device. Idempotent; later
    /// operations fail with `ShutDown`.
    pub fn shutdown(&self) {
        self.forward_stop.store(true, Ordering::SeqCst);
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(tx) = tx {
            let _ = tx.send(Message::Shutdown);
        }
        if std::thread::current().id() == self.worker_id {
            return;
        }
        let worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner).take();
        if let Some(handle) = worker {
            let _ = handle.join();
        }
        let forwarder = self
            .forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = forwarder {
            let _ = handle.join();
        }
    }

    // ── Reads ──

    pub fn is_connected(&self) -> bool {
        self.shared.state().is_connected()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.shared.state().clone()
    }

    pub fn current_snapshot(&self) -> DeviceSnapshot {
        self.shared.store.read()
    }

    pub fn confirmed_snapshot(&self) -> DeviceSnapshot {
        self.shared.store.confirmed()
    }

    pub fn device_info(&self) -> Option<DeviceInfo> {
        self.shared.device_info().clone()
    }

    pub fn subscribe(&self, observer: impl SnapshotObserver + 'static) -> SubscriptionHandle {
        self.shared.observers.register(Arc::new(observer))
    }

    /// Poll the connection state until `pred` holds or `timeout` elapses.
    pub fn wait_for_state(
        &self,
        timeout: Duration,
        pred: impl Fn(&ConnectionState) -> bool,
    ) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if pred(&self.shared.state()) {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }
}

impl Drop for DeviceController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ── Process-wide instance ──

/// Holder for a lazily started controller that can be closed for good.
struct GlobalSlot {
    controller: OnceLock<DeviceController>,
    closed: AtomicBool,
}

impl GlobalSlot {
    const fn new() -> Self {
        GlobalSlot {
            controller: OnceLock::new(),
            closed: AtomicBool::new(false),
        }
    }

    fn get_or_start(
        &self,
        start: impl FnOnce() -> crate::error::Result<DeviceController>,
    ) -> crate::error::Result<&DeviceController> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(DeviceError::ShutDown.into());
        }
        if let Some(controller) = self.controller.get() {
            return Ok(controller);
        }
        let controller = start()?;
        // A racing thread may have won; its instance is kept and ours dropped.
        Ok(self.controller.get_or_init(|| controller))
    }

    fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Some(controller) = self.controller.get() {
            controller.shutdown();
        }
    }
}

static GLOBAL: GlobalSlot = GlobalSlot::new();

/// The process-wide controller, created from the user config on first use.
///
/// Fails with `ShutDown` once [`shutdown_global`] has been called.
pub fn global() -> crate::error::Result<&'static DeviceController> {
    GLOBAL.get_or_start(|| {
        let (config, warnings) = crate::config::Config::load_with_warnings();
        for w in &warnings {
            log::warn!("{w}");
        }
        DeviceController::start(config.transport(), config.controller_options())
    })
}

/// Shut down the process-wide controller. Later calls to [`global`] fail.
pub fn shutdown_global() {
    GLOBAL.shutdown();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockControl, MockTransport};
    use std::sync::atomic::AtomicUsize;

    const WAIT: Duration = Duration::from_secs(2);

    fn options() -> ControllerOptions {
        ControllerOptions {
            reapply_delay: None,
            ..ControllerOptions::default()
        }
    }

    #[test]
    fn display_messages() {
        assert_eq!(DeviceError::NotConnected.to_string(), "Device not connected");
        assert_eq!(
            DeviceError::WriteFailed("hid write: pipe".into()).to_string(),
            "Write failed: hid write: pipe"
        );
    }

    #[test]
    fn validation_error_converts() {
        let e: DeviceError = Color::from_channels(300, 0, 0).unwrap_err().into();
        assert!(matches!(e, DeviceError::Validation(_)));
        assert!(std::error::Error::source(&e).is_some());
    }

    #[test]
    fn connects_to_present_device() {
        let (t, _c) = MockTransport::new();
        let ctl = DeviceController::start(t, options()).unwrap();
        assert!(ctl.wait_for_state(WAIT, ConnectionState::is_connected));
        assert!(ctl.current_snapshot().connected);
        assert_eq!(ctl.device_info().unwrap().serial.as_deref(), Some("MOCK0001"));
    }

    #[test]
    fn out_of_range_channels_rejected_without_io() {
        let (t, c) = MockTransport::new();
        let ctl = DeviceController::start(t, options()).unwrap();
        assert!(ctl.wait_for_state(WAIT, ConnectionState::is_connected));
        let before = ctl.current_snapshot();
        assert!(matches!(
            ctl.set_color_channels(0, 256, 0),
            Err(DeviceError::Validation(_))
        ));
        assert!(matches!(
            ctl.set_transition_speed_checked(-1),
            Err(DeviceError::Validation(_))
        ));
        assert_eq!(ctl.current_snapshot(), before);
        assert!(c.writes().is_empty());
    }

    #[test]
    fn operations_after_shutdown_fail() {
        let (t, _c) = MockTransport::new();
        let ctl = DeviceController::start(t, options()).unwrap();
        ctl.shutdown();
        ctl.shutdown();
        assert_eq!(ctl.set_color(Color::RED), Err(DeviceError::ShutDown));
    }

    #[test]
    fn global_slot_starts_once() {
        static SLOT: GlobalSlot = GlobalSlot::new();
        let starts = AtomicUsize::new(0);
        let start = || {
            starts.fetch_add(1, Ordering::SeqCst);
            let (t, _c) = MockTransport::new();
            Ok(DeviceController::start(t, options())?)
        };
        let a = SLOT.get_or_start(start).unwrap();
        let b = SLOT.get_or_start(start).unwrap();
        assert!(std::ptr::eq(a, b));
        assert_eq!(starts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn global_slot_keeps_first_of_racing_starts() {
        static SLOT: GlobalSlot = GlobalSlot::new();
        let barrier = Arc::new(std::sync::Barrier::new(2));
        let controls: Vec<_> = (0..2).map(|_| MockTransport::new()).collect();
        let got: Vec<(usize, MockControl)> = std::thread::scope(|scope| {
            let handles: Vec<_> = controls
                .into_iter()
                .map(|(t, c)| {
                    let barrier = barrier.clone();
                    scope.spawn(move || {
                        let ctl = SLOT
                            .get_or_start(|| {
                                let ctl = DeviceController::start(t, options())?;
                                // Both builds finish before either is stored.
                                barrier.wait();
                                Ok(ctl)
                            })
                            .unwrap();
                        (ctl as *const DeviceController as usize, c)
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(got[0].0, got[1].0, "both callers see one instance");

        let winner = SLOT.get_or_start(|| unreachable!()).unwrap();
        assert!(winner.wait_for_state(WAIT, ConnectionState::is_connected));
        winner.set_color(Color::RED).unwrap();
        // The losing controller was shut down, so only one mock saw the write.
        let written: usize = got.iter().map(|(_, c)| c.writes().len()).sum();
        assert_eq!(written, 1);
    }

    #[test]
    fn global_slot_rejects_after_shutdown() {
        static SLOT: GlobalSlot = GlobalSlot::new();
        let (t, _c) = MockTransport::new();
        let ctl = SLOT
            .get_or_start(|| Ok(DeviceController::start(t, options())?))
            .unwrap();
        SLOT.shutdown();
        assert_eq!(ctl.set_color(Color::RED), Err(DeviceError::ShutDown));
        assert!(matches!(
            SLOT.get_or_start(|| unreachable!()),
            Err(crate::LuxlightError::Device(DeviceError::ShutDown))
        ));
    }

    #[test]
    fn observer_reentry_is_rejected() {
        let (t, _c) = MockTransport::new();
        let ctl = Arc::new(DeviceController::start(t, options()).unwrap());
        assert!(ctl.wait_for_state(WAIT, ConnectionState::is_connected));

        let (seen_tx, seen_rx) = mpsc::channel();
        let seen_tx = Mutex::new(seen_tx);
        let weak = Arc::downgrade(&ctl);
        let _sub = ctl.subscribe(move |_: &DeviceSnapshot| {
            if let Some(ctl) = weak.upgrade() {
                let r = ctl.set_color(Color::GREEN);
                let _ = seen_tx.lock().unwrap().send(r);
            }
        });
        ctl.set_color(Color::RED).unwrap();
        assert_eq!(seen_rx.recv_timeout(WAIT).unwrap(), Err(DeviceError::Reentrant));
    }
}
