//! Rolling-window throttle for outbound refresh calls.
//!
//! The ceiling is imposed by the provider on the whole process, so a single
//! [`RateWindow`] is shared by every principal. A call that would exceed the
//! ceiling is delayed until the oldest recorded call leaves the window.

use core_runtime::config::RefreshPolicy;
use std::collections::VecDeque;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

pub struct RateWindow {
    window: Duration,
    ceiling: usize,
    margin: Duration,
    calls: Mutex<VecDeque<Instant>>,
}

impl RateWindow {
    /// Creates a window admitting `ceiling` calls per `window`.
    ///
    /// A zero ceiling is treated as one.
    pub fn new(window: Duration, ceiling: usize, margin: Duration) -> Self {
        let ceiling = ceiling.max(1);
        Self {
            window,
            ceiling,
            margin,
            calls: Mutex::new(VecDeque::with_capacity(ceiling)),
        }
    }

    pub fn from_policy(policy: &RefreshPolicy) -> Self {
        Self::new(policy.rate_window, policy.rate_ceiling, policy.rate_margin)
    }

    pub fn ceiling(&self) -> usize {
        self.ceiling
    }

    /// Waits for a free slot, then records the call.
    ///
    /// Never rejects; the only effect of a full window is delay.
    pub async fn acquire(&self) {
        loop {
            let wait = match self.try_record(Instant::now()) {
                Ok(()) => return,
                Err(wait) => wait,
            };

            debug!(
                wait_ms = wait.as_millis() as u64,
                ceiling = self.ceiling,
                "Refresh rate window full, delaying call"
            );
            sleep(wait).await;
        }
    }

    /// Number of calls recorded inside the current window.
    pub fn recent_calls(&self) -> usize {
        let mut calls = self.lock();
        Self::prune(&mut calls, Instant::now(), self.window);
        calls.len()
    }

    /// Records a call at `now` if there is room, otherwise returns how long
    /// to wait before trying again. Pruning, the capacity check and the
    /// insert happen under one lock.
    fn try_record(&self, now: Instant) -> Result<(), Duration> {
        let mut calls = self.lock();
        Self::prune(&mut calls, now, self.window);

        if calls.len() < self.ceiling {
            calls.push_back(now);
            return Ok(());
        }

        let oldest = calls.front().copied().unwrap_or(now);
        let reopens_at = oldest + self.window + self.margin;
        Err(reopens_at.saturating_duration_since(now))
    }

    fn prune(calls: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(&oldest) = calls.front() {
            if now.saturating_duration_since(oldest) >= window {
                calls.pop_front();
            } else {
                break;
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<Instant>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for RateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateWindow")
            .field("window", &self.window)
            .field("ceiling", &self.ceiling)
            .field("margin", &self.margin)
            .finish()
    }
}
