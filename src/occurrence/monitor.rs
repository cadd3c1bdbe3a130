// Occurrence monitor for repeated detection labels
//
// Tracks a single "current" label and reports whether an observation repeats
// that label within a fixed window measured from the first observation of
// the run. Later repeats do not extend the window.

use super::timer::{ExpiryTimerHandle, TimerError};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

/// Errors that can occur when constructing an occurrence monitor
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum OccurrenceError {
    /// The window must be strictly positive
    #[error("Occurrence window must be greater than zero")]
    InvalidWindow,
    /// The window cannot be added to the current time without overflowing
    #[error("Occurrence window {0:?} is too large")]
    WindowTooLarge(Duration),
    /// The expiry timer could not be started
    #[error("Occurrence timer unavailable: {0}")]
    Timer(#[from] TimerError),
}

/// Snapshot of the monitor state, taken under the state lock
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OccurrenceStatus {
    /// Label of the current run, if any
    pub current_key: Option<String>,
    /// Observations of `current_key` in the current run (0 when idle)
    pub count: u64,
    /// Whether an expiry is pending for the current run
    pub active: bool,
}

/// Mutable state shared with the timer thread
///
/// `pending` holds the generation token of the one outstanding expiry.
/// An expiry whose token no longer matches is stale and must not touch state.
struct MonitorState {
    current_key: Option<String>,
    count: u64,
    pending: Option<u64>,
    next_generation: u64,
}

impl MonitorState {
    fn idle() -> Self {
        Self {
            current_key: None,
            count: 0,
            pending: None,
            next_generation: 0,
        }
    }
}

/// Debouncer for repeated detections of the same label
///
/// Usage:
/// ```ignore
/// let monitor = OccurrenceMonitor::new(Duration::from_millis(200))?;
/// monitor.observe("robin"); // false - fresh run
/// monitor.observe("robin"); // true - repeat within window
/// ```
pub struct OccurrenceMonitor {
    /// Fixed window measured from the first observation of a run
    window: Duration,
    state: Arc<Mutex<MonitorState>>,
    timer: ExpiryTimerHandle,
}

impl OccurrenceMonitor {
    /// Create a monitor with the given window
    ///
    /// # Errors
    /// - `InvalidWindow` if `window` is zero
    /// - `WindowTooLarge` if no deadline can be computed from `window`
    /// - `Timer` if the expiry thread cannot be spawned
    pub fn new(window: Duration) -> Result<Self, OccurrenceError> {
        if window.is_zero() {
            return Err(OccurrenceError::InvalidWindow);
        }
        if Instant::now().checked_add(window).is_none() {
            return Err(OccurrenceError::WindowTooLarge(window));
        }

        let state = Arc::new(Mutex::new(MonitorState::idle()));
        let weak: Weak<Mutex<MonitorState>> = Arc::downgrade(&state);
        let timer = ExpiryTimerHandle::spawn(Box::new(move |generation| {
            if let Some(state) = weak.upgrade() {
                expire_run(&state, generation);
            }
        }))?;

        crate::debug!("[occurrence] Monitor created (window={:?})", window);
        Ok(Self {
            window,
            state,
            timer,
        })
    }

    /// Create a monitor with a window given in milliseconds
    pub fn from_millis(window_ms: u64) -> Result<Self, OccurrenceError> {
        Self::new(Duration::from_millis(window_ms))
    }

    /// Record an observation of `key`
    ///
    /// Returns `true` if `key` is the current label and its run has not
    /// expired. Otherwise starts a fresh run for `key` and returns `false`.
    pub fn observe(&self, key: &str) -> bool {
        let mut state = self.state.lock();

        if state.pending.is_none() || state.current_key.as_deref() != Some(key) {
            self.start_run(&mut state, key);
            return false;
        }

        state.count = state.count.saturating_add(1);
        // Always true once here; kept as a threshold check
        state.count > 1
    }

    /// Alias of [`observe`](Self::observe) for species labels
    pub fn track_species(&self, species: &str) -> bool {
        self.observe(species)
    }

    /// The configured window
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current state snapshot
    pub fn status(&self) -> OccurrenceStatus {
        let state = self.state.lock();
        let active = state.pending.is_some() && state.current_key.is_some();
        OccurrenceStatus {
            current_key: if active { state.current_key.clone() } else { None },
            count: if active { state.count } else { 0 },
            active,
        }
    }

    /// Replace the current run with a fresh one for `key` and arm its expiry
    ///
    /// Must be called with the state lock held. Arming supersedes the
    /// previous expiry on the timer thread; if that expiry is already in
    /// flight, the new generation token makes it a no-op.
    ///
    /// A deadline past the end of the clock is never armed; that run stays
    /// active until another key replaces it.
    fn start_run(&self, state: &mut MonitorState, key: &str) {
        let deadline = Instant::now().checked_add(self.window);
        let generation = state.next_generation;
        state.next_generation = state.next_generation.wrapping_add(1);
        state.current_key = Some(key.to_string());
        state.count = 1;

        let Some(deadline) = deadline else {
            state.pending = Some(generation);
            crate::warn!("[occurrence] Window overflows the clock, run for '{}' will not expire", key);
            return;
        };

        match self.timer.arm(generation, deadline) {
            Ok(()) => {
                state.pending = Some(generation);
                crate::debug!("[occurrence] Fresh run for '{}' (generation {})", key, generation);
            }
            Err(e) => {
                state.pending = None;
                crate::warn!("[occurrence] Failed to arm expiry for '{}': {}", key, e);
            }
        }
    }
}

/// Reset the monitor to idle if `generation` is still the pending expiry
fn expire_run(state: &Mutex<MonitorState>, generation: u64) {
    let mut state = state.lock();

    if state.pending != Some(generation) {
        crate::trace!(
            "[occurrence] Ignoring stale expiry (generation {}, pending {:?})",
            generation,
            state.pending
        );
        return;
    }

    crate::debug!(
        "[occurrence] Window elapsed for {:?} after {} observation(s)",
        state.current_key,
        state.count
    );
    state.current_key = None;
    state.count = 0;
    state.pending = None;
}

#[cfg(test)]
#[path = "monitor_test.rs"]
mod tests;
