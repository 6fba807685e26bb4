//! Recovery of a faulted controller, with exponential backoff.
//!
//! Attach/detach is handled inside the controller. What it will not do on
//! its own is leave the `Error` state: a faulted connection stays faulted
//! until someone calls `reset`. [`try_recover`] does that from a
//! supervising loop, spacing attempts out so a broken device is not
//! hammered.

use std::time::{Duration, Instant};

use crate::controller::{ConnectionState, DeviceController, DeviceError};

#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Wait after the first failed attempt.
    pub first_retry: Duration,
    /// Upper bound for the wait between attempts.
    pub max_retry: Duration,
    /// Growth factor applied after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            first_retry: Duration::from_secs(1),
            max_retry: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Backoff bookkeeping between recovery attempts.
#[derive(Debug)]
pub struct ReconnectState {
    config: ReconnectConfig,
    delay: Duration,
    /// Earliest time for the next attempt; `None` means now.
    retry_at: Option<Instant>,
    failures: u32,
}

impl ReconnectState {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            delay: config.first_retry,
            config,
            retry_at: None,
            failures: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(ReconnectConfig::default())
    }

    pub fn should_attempt(&self) -> bool {
        self.retry_at.is_none_or(|at| Instant::now() >= at)
    }

    /// Schedule the next attempt after the current delay, then grow it.
    /// Returns the wait that was scheduled.
    pub fn record_failure(&mut self) -> Duration {
        let wait = self.delay;
        self.failures += 1;
        self.retry_at = Some(Instant::now() + wait);
        self.delay = wait
            .mul_f64(self.config.multiplier)
            .min(self.config.max_retry);
        wait
    }

    pub fn record_success(&mut self) {
        *self = Self::new(self.config.clone());
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.failures
    }

    /// Wait that will follow the next failure.
    pub fn current_delay(&self) -> Duration {
        self.delay
    }
}

/// What [`try_recover`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryOutcome {
    /// Controller was not faulted; nothing to do.
    Healthy,
    /// Backoff timer has not elapsed yet.
    Waiting,
    /// Reset and reopened successfully.
    Recovered,
    /// Reset done, but the device is not attached; the watcher will open
    /// it when it shows up.
    AwaitingDevice,
    Failed(DeviceError),
}

/// Reset a controller stuck in `Error` and try to reopen the device,
/// respecting the backoff in `state`.
pub fn try_recover(controller: &DeviceController, state: &mut ReconnectState) -> RecoveryOutcome {
    if !matches!(controller.connection_state(), ConnectionState::Error(_)) {
        if controller.is_connected() {
            state.record_success();
        }
        return RecoveryOutcome::Healthy;
    }
    if !state.should_attempt() {
        return RecoveryOutcome::Waiting;
    }
    let result = controller.reset().and_then(|()| controller.connect());
    match result {
        Ok(()) => {
            log::info!("recovered after {} failed attempt(s)", state.consecutive_failures());
            state.record_success();
            RecoveryOutcome::Recovered
        }
        Err(DeviceError::NotFound) => {
            state.record_success();
            RecoveryOutcome::AwaitingDevice
        }
        Err(e) => {
            let wait = state.record_failure();
            log::warn!(
                "recovery failed: {e} (attempt {}, retry in {:.1}s)",
                state.consecutive_failures(),
                wait.as_secs_f64()
            );
            RecoveryOutcome::Failed(e)
        }
    }
}
