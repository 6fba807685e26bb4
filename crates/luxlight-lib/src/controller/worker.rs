//! The controller's worker thread: request execution, coalescing, device
//! events, fault accounting.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};

use super::{
    ConnectionEvent, ConnectionState, ControllerOptions, DeviceError, PolicyDecision,
    ProductivityPolicy, Result, Shared,
};
use crate::codec::{self, Report};
use crate::led::{Brightness, Color, Effect, LedTarget, TransitionSpeed};
use crate::store::{DeviceSnapshot, SnapshotDelta};
use crate::transport::{DeviceEvent, HidHandle, Transport, TransportError};

pub(crate) enum Intent {
    SetColor(Color),
    SetTransitionSpeed(TransitionSpeed),
    SetProductivityMode(bool),
    SetBrightness(Brightness),
    SetPolicy(Arc<dyn ProductivityPolicy>),
    Effect(Effect),
    Connect,
    Reset,
}

/// Attribute a request writes. Only the newest request per slot in a batch
/// is executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Slot {
    Color,
    TransitionSpeed,
    ProductivityMode,
    Brightness,
    Effect,
}

impl Intent {
    fn slot(&self) -> Option<Slot> {
        match self {
            Intent::SetColor(_) => Some(Slot::Color),
            Intent::SetTransitionSpeed(_) => Some(Slot::TransitionSpeed),
            Intent::SetProductivityMode(_) => Some(Slot::ProductivityMode),
            Intent::SetBrightness(_) => Some(Slot::Brightness),
            Intent::Effect(_) => Some(Slot::Effect),
            Intent::SetPolicy(_) | Intent::Connect | Intent::Reset => None,
        }
    }
}

pub(crate) enum Message {
    Request {
        intent: Intent,
        reply: Sender<Result<()>>,
        /// When the caller stops waiting. Expired requests are not run.
        deadline: Instant,
    },
    Device(DeviceEvent),
    Shutdown,
}

/// Drop every request that a later request in the same batch overrides,
/// replying `Superseded` to its caller. Order is otherwise preserved.
pub(crate) fn coalesce(batch: Vec<Message>) -> Vec<Message> {
    let mut newest: HashMap<Slot, usize> = HashMap::new();
    for (i, msg) in batch.iter().enumerate() {
        if let Message::Request { intent, .. } = msg
            && let Some(slot) = intent.slot()
        {
            newest.insert(slot, i);
        }
    }
    batch
        .into_iter()
        .enumerate()
        .filter_map(|(i, msg)| {
            if let Message::Request { intent, reply, .. } = &msg
                && let Some(slot) = intent.slot()
                && newest.get(&slot) != Some(&i)
            {
                let _ = reply.send(Err(DeviceError::Superseded));
                return None;
            }
            Some(msg)
        })
        .collect()
}

pub(crate) struct Worker {
    transport: Box<dyn Transport>,
    handle: Option<Box<dyn HidHandle>>,
    shared: Arc<Shared>,
    options: ControllerOptions,
    policy: Arc<dyn ProductivityPolicy>,
    /// Last color asked for, before the productivity policy. Restored when
    /// productivity mode is switched off.
    requested_color: Color,
    consecutive_failures: u32,
    reapply_at: Option<Instant>,
    /// Deadline of the request being executed, bounding its I/O.
    deadline: Option<Instant>,
    last_notified: DeviceSnapshot,
}

impl Worker {
    pub(crate) fn new(
        transport: Box<dyn Transport>,
        shared: Arc<Shared>,
        options: ControllerOptions,
    ) -> Self {
        let initial = shared.store.read();
        Worker {
            transport,
            handle: None,
            policy: options.policy.clone(),
            requested_color: initial.color,
            consecutive_failures: 0,
            reapply_at: None,
            deadline: None,
            last_notified: initial,
            shared,
            options,
        }
    }

    pub(crate) fn run(mut self, rx: Receiver<Message>) {
        loop {
            let first = match self.reapply_at {
                Some(at) => {
                    let wait = at.saturating_duration_since(Instant::now());
                    match rx.recv_timeout(wait) {
                        Ok(msg) => msg,
                        Err(RecvTimeoutError::Timeout) => {
                            self.reapply();
                            continue;
                        }
                        Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                None => match rx.recv() {
                    Ok(msg) => msg,
                    Err(_) => break,
                },
            };
            let mut batch = vec![first];
            batch.extend(rx.try_iter());
            if !self.process(batch) {
                break;
            }
        }
        self.close_handle();
        log::debug!("controller worker stopped");
    }

    /// Returns `false` once a shutdown message was handled.
    fn process(&mut self, batch: Vec<Message>) -> bool {
        let mut shutting_down = false;
        for msg in coalesce(batch) {
            match msg {
                Message::Shutdown => shutting_down = true,
                Message::Device(_) if shutting_down => {}
                Message::Device(event) => self.on_device_event(event),
                Message::Request { reply, .. } if shutting_down => {
                    let _ = reply.send(Err(DeviceError::ShutDown));
                }
                Message::Request { reply, deadline, .. } if Instant::now() >= deadline => {
                    log::debug!("request expired before it ran");
                    let _ = reply.send(Err(DeviceError::Timeout));
                }
                Message::Request {
                    intent,
                    reply,
                    deadline,
                } => {
                    self.deadline = Some(deadline);
                    let result = self.execute(intent);
                    self.deadline = None;
                    let _ = reply.send(result);
                }
            }
        }
        !shutting_down
    }

    fn execute(&mut self, intent: Intent) -> Result<()> {
        match intent {
            Intent::SetColor(color) => self.set_color(color),
            Intent::SetTransitionSpeed(speed) => {
                // Used by the next color write; nothing to send now.
                self.commit_confirmed(SnapshotDelta::default().transition_speed(speed));
                Ok(())
            }
            Intent::SetProductivityMode(enabled) => self.set_productivity_mode(enabled),
            Intent::SetBrightness(brightness) => self.set_brightness(brightness),
            Intent::SetPolicy(policy) => {
                log::debug!("productivity policy: {}", policy.name());
                self.policy = policy;
                if self.is_connected() && self.shared.store.read().productivity_mode {
                    self.apply_requested()
                } else {
                    Ok(())
                }
            }
            Intent::Effect(effect) => self.play_effect(&effect),
            Intent::Connect => self.connect(),
            Intent::Reset => {
                self.reset();
                Ok(())
            }
        }
    }

    // ── Intents ──

    fn set_color(&mut self, requested: Color) -> Result<()> {
        self.ensure_connected()?;
        let productivity = self.shared.store.read().productivity_mode;
        let color = self.resolve(requested, productivity);
        // Remembered even when suppressed, so it is shown once productivity
        // mode ends.
        let previous = std::mem::replace(&mut self.requested_color, requested);
        let Some(color) = color else {
            return Err(DeviceError::Suppressed);
        };
        let result = self.commit_and_write(SnapshotDelta::default().color(color));
        if result.is_err() {
            self.requested_color = previous;
        }
        result
    }

    fn set_productivity_mode(&mut self, enabled: bool) -> Result<()> {
        let delta = SnapshotDelta::default().productivity_mode(enabled);
        if !self.is_connected() {
            self.commit_confirmed(delta);
            return Ok(());
        }
        match self.resolve(self.requested_color, enabled) {
            Some(color) if color != self.shared.store.read().color => {
                self.commit_and_write(delta.color(color))
            }
            _ => {
                self.commit_confirmed(delta);
                Ok(())
            }
        }
    }

    fn set_brightness(&mut self, brightness: Brightness) -> Result<()> {
        let delta = SnapshotDelta::default().brightness(brightness);
        if self.is_connected() {
            self.commit_and_write(delta)
        } else {
            self.commit_confirmed(delta);
            Ok(())
        }
    }

    fn play_effect(&mut self, effect: &Effect) -> Result<()> {
        self.ensure_connected()?;
        self.transmit(&codec::encode_effect(effect))
    }

    /// Show `requested_color` through the current policy.
    fn apply_requested(&mut self) -> Result<()> {
        let productivity = self.shared.store.read().productivity_mode;
        match self.resolve(self.requested_color, productivity) {
            Some(color) => self.commit_and_write(SnapshotDelta::default().color(color)),
            None => Ok(()),
        }
    }

    /// Color to display for `requested`, or `None` if it is suppressed.
    fn resolve(&self, requested: Color, productivity: bool) -> Option<Color> {
        if !productivity {
            return Some(requested);
        }
        match self.policy.resolve(requested) {
            PolicyDecision::Apply(color) => Some(color),
            PolicyDecision::Suppress => None,
        }
    }

    // ── Store + notification ──

    fn notify_if_changed(&mut self, snapshot: DeviceSnapshot) {
        if snapshot != self.last_notified {
            self.last_notified = snapshot;
            self.shared.observers.notify(&snapshot);
        }
    }

    fn commit_confirmed(&mut self, delta: SnapshotDelta) {
        let snapshot = self.shared.store.commit_confirmed(delta);
        self.notify_if_changed(snapshot);
    }

    /// Optimistically commit `delta`, write the resulting color, then
    /// confirm or roll back.
    fn commit_and_write(&mut self, delta: SnapshotDelta) -> Result<()> {
        let snapshot = self.shared.store.commit(delta);
        self.notify_if_changed(snapshot);
        let report = codec::encode_color(
            snapshot.output_color(),
            snapshot.transition_speed,
            LedTarget::All,
        );
        match self.transmit(&report) {
            Ok(()) => {
                self.shared.store.confirm();
                Ok(())
            }
            Err(e) => {
                let restored = self.shared.store.rollback();
                self.notify_if_changed(restored);
                Err(e)
            }
        }
    }

    // ── I/O ──

    /// `limit`, cut to the time left before the current request's deadline.
    /// `None` once the deadline has passed.
    fn io_timeout(&self, limit: Duration) -> Option<Duration> {
        let Some(deadline) = self.deadline else {
            return Some(limit);
        };
        let left = deadline.saturating_duration_since(Instant::now());
        (!left.is_zero()).then(|| limit.min(left))
    }

    fn transmit(&mut self, report: &Report) -> Result<()> {
        let Some(timeout) = self.io_timeout(self.options.write_timeout) else {
            return Err(DeviceError::Timeout);
        };
        let Some(handle) = self.handle.as_mut() else {
            return Err(DeviceError::NotConnected);
        };
        log::debug!("write {:02X?}", report.as_bytes());
        match handle.write(report.as_bytes(), timeout) {
            Ok(()) => {
                self.consecutive_failures = 0;
                if self.options.read_acks {
                    self.read_ack(report);
                }
                Ok(())
            }
            Err(TransportError::Disconnected) => {
                log::info!("device disconnected during write");
                self.mark_disconnected(ConnectionEvent::Detached);
                Err(DeviceError::NotConnected)
            }
            Err(e) => {
                self.consecutive_failures += 1;
                log::warn!(
                    "write failed: {e} ({} consecutive)",
                    self.consecutive_failures
                );
                let err = match &e {
                    TransportError::Timeout => DeviceError::Timeout,
                    other => DeviceError::WriteFailed(other.to_string()),
                };
                if self.consecutive_failures >= self.options.fault_threshold.max(1) {
                    let reason = format!(
                        "{} consecutive I/O failures, last: {e}",
                        self.consecutive_failures
                    );
                    self.mark_disconnected(ConnectionEvent::FaultLimit(reason));
                }
                Err(err)
            }
        }
    }

    /// Read and check the device's echo. Problems are logged, never fatal.
    fn read_ack(&mut self, sent: &Report) {
        let Some(timeout) = self.io_timeout(self.options.read_timeout) else {
            log::warn!("no time left to read the acknowledgement");
            return;
        };
        let Some(handle) = self.handle.as_mut() else {
            return;
        };
        match handle.read(timeout) {
            Ok(bytes) => match codec::decode_ack(&bytes) {
                Ok(ack) if ack.command == sent.command() => {
                    log::debug!("ack {:?}", ack.command);
                }
                Ok(ack) => log::warn!(
                    "ack for {:?} while expecting {:?}",
                    ack.command,
                    sent.command()
                ),
                Err(e) => log::warn!("{e}"),
            },
            Err(TransportError::Timeout) => log::warn!("no acknowledgement from device"),
            Err(e) => log::warn!("ack read failed: {e}"),
        }
    }

    // ── Connection ──

    fn is_connected(&self) -> bool {
        self.shared.state().is_connected()
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.is_connected() {
            Ok(())
        } else {
            Err(DeviceError::NotConnected)
        }
    }

    /// Apply a state machine event. Returns `true` if the state changed.
    fn transition(&self, event: ConnectionEvent) -> bool {
        let mut state = self.shared.state();
        match state.transition(&event) {
            Some(next) => {
                log::info!("connection: {} -> {}", *state, next);
                *state = next;
                true
            }
            None => false,
        }
    }

    fn connect(&mut self) -> Result<()> {
        let state = self.shared.state().clone();
        match state {
            ConnectionState::Connected => Ok(()),
            ConnectionState::Disconnected => self.open(),
            ConnectionState::Connecting => Err(DeviceError::NotConnected),
            ConnectionState::Error(reason) => {
                log::debug!("connect ignored, reset required ({reason})");
                Err(DeviceError::NotConnected)
            }
        }
    }

    fn open(&mut self) -> Result<()> {
        self.transition(ConnectionEvent::OpenStarted);
        match self.transport.open() {
            Ok(handle) => {
                *self.shared.device_info() = Some(handle.info().clone());
                self.handle = Some(handle);
                self.consecutive_failures = 0;
                self.transition(ConnectionEvent::OpenSucceeded);
                self.commit_confirmed(SnapshotDelta::default().connected(true));
                match self.options.reapply_delay {
                    Some(delay) if delay.is_zero() => self.reapply(),
                    Some(delay) => self.reapply_at = Some(Instant::now() + delay),
                    None => {}
                }
                Ok(())
            }
            Err(TransportError::NotFound) => {
                self.transition(ConnectionEvent::NotFound);
                Err(DeviceError::NotFound)
            }
            Err(e) => {
                let reason = e.to_string();
                log::warn!("open failed: {reason}");
                self.transition(ConnectionEvent::OpenFailed(reason.clone()));
                Err(DeviceError::OpenFailed(reason))
            }
        }
    }

    /// Re-send the last requested color, through the productivity policy,
    /// after the device's power-on flashes.
    fn reapply(&mut self) {
        self.reapply_at = None;
        if !self.is_connected() {
            return;
        }
        let productivity = self.shared.store.read().productivity_mode;
        // A suppressed request keeps whatever color the store holds.
        let delta = match self.resolve(self.requested_color, productivity) {
            Some(color) => SnapshotDelta::default().color(color),
            None => SnapshotDelta::default(),
        };
        if let Err(e) = self.commit_and_write(delta) {
            log::warn!("could not re-apply color after connect: {e}");
        }
    }

    fn close_handle(&mut self) {
        self.handle = None;
        self.reapply_at = None;
        *self.shared.device_info() = None;
    }

    fn mark_disconnected(&mut self, event: ConnectionEvent) {
        self.close_handle();
        if self.transition(event) {
            self.commit_confirmed(SnapshotDelta::default().connected(false));
        }
    }

    fn reset(&mut self) {
        self.mark_disconnected(ConnectionEvent::Reset);
        self.consecutive_failures = 0;
    }

    fn on_device_event(&mut self, event: DeviceEvent) {
        match event {
            DeviceEvent::Attached => {
                let state = self.shared.state().clone();
                match state {
                    ConnectionState::Disconnected => {
                        if let Err(e) = self.open() {
                            log::debug!("open after attach failed: {e}");
                        }
                    }
                    // Already open (repeated attach) or faulted until reset.
                    _ => log::debug!("attach ignored in state {state}"),
                }
            }
            DeviceEvent::Detached => self.mark_disconnected(ConnectionEvent::Detached),
        }
    }
}
