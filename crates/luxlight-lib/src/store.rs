//! Device state store: current (optimistic) and last-confirmed snapshots.
//!
//! A single mutex guards both snapshots and is only held for the copy, so
//! reads never wait on device I/O.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

use crate::led::{Brightness, Color, TransitionSpeed};

/// Immutable view of the device state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeviceSnapshot {
    /// Requested color, before brightness scaling.
    pub color: Color,
    pub transition_speed: TransitionSpeed,
    pub productivity_mode: bool,
    pub brightness: Brightness,
    pub connected: bool,
}

impl Default for DeviceSnapshot {
    fn default() -> Self {
        DeviceSnapshot {
            color: Color::BLACK,
            transition_speed: TransitionSpeed::INSTANT,
            productivity_mode: false,
            brightness: Brightness::NORMAL,
            connected: false,
        }
    }
}

impl DeviceSnapshot {
    /// Color actually sent to the LEDs.
    pub fn output_color(&self) -> Color {
        self.color.scaled(self.brightness)
    }

    fn apply(mut self, delta: &SnapshotDelta) -> Self {
        if let Some(c) = delta.color {
            self.color = c;
        }
        if let Some(s) = delta.transition_speed {
            self.transition_speed = s;
        }
        if let Some(p) = delta.productivity_mode {
            self.productivity_mode = p;
        }
        if let Some(b) = delta.brightness {
            self.brightness = b;
        }
        if let Some(c) = delta.connected {
            self.connected = c;
        }
        self
    }
}

/// Partial update; `None` fields are left unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotDelta {
    pub color: Option<Color>,
    pub transition_speed: Option<TransitionSpeed>,
    pub productivity_mode: Option<bool>,
    pub brightness: Option<Brightness>,
    pub connected: Option<bool>,
}

impl SnapshotDelta {
    pub fn color(mut self, color: Color) -> Self {
        self.color = Some(color);
        self
    }

    pub fn transition_speed(mut self, speed: TransitionSpeed) -> Self {
        self.transition_speed = Some(speed);
        self
    }

    pub fn productivity_mode(mut self, enabled: bool) -> Self {
        self.productivity_mode = Some(enabled);
        self
    }

    pub fn brightness(mut self, brightness: Brightness) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn connected(mut self, connected: bool) -> Self {
        self.connected = Some(connected);
        self
    }
}

struct Snapshots {
    current: DeviceSnapshot,
    confirmed: DeviceSnapshot,
}

pub struct StateStore {
    inner: Mutex<Snapshots>,
}

impl StateStore {
    pub fn new(initial: DeviceSnapshot) -> Self {
        StateStore {
            inner: Mutex::new(Snapshots {
                current: initial,
                confirmed: initial,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Snapshots> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read(&self) -> DeviceSnapshot {
        self.lock().current
    }

    pub fn confirmed(&self) -> DeviceSnapshot {
        self.lock().confirmed
    }

    /// Optimistically apply `delta` to the current snapshot.
    pub fn commit(&self, delta: SnapshotDelta) -> DeviceSnapshot {
        let mut s = self.lock();
        s.current = s.current.apply(&delta);
        s.current
    }

    /// Mark the current snapshot as confirmed by the hardware.
    pub fn confirm(&self) -> DeviceSnapshot {
        let mut s = self.lock();
        s.confirmed = s.current;
        s.confirmed
    }

    /// Discard optimistic changes.
    pub fn rollback(&self) -> DeviceSnapshot {
        let mut s = self.lock();
        s.current = s.confirmed;
        s.current
    }

    /// Apply `delta` to both snapshots. Used for changes that need no device
    /// write, such as the connection flag.
    pub fn commit_confirmed(&self, delta: SnapshotDelta) -> DeviceSnapshot {
        let mut s = self.lock();
        s.current = s.current.apply(&delta);
        s.confirmed = s.confirmed.apply(&delta);
        s.current
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DeviceSnapshot::default())
    }
}
