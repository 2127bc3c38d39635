//! Process-wide refresh gate.
//!
//! Bundles the [`RateWindow`] and the [`RefreshDeduplicator`]. Create one
//! per process at startup and hand clones of the `Arc` to every broker; the
//! gate needs no teardown.
//!
//! The state is process-local. Running several instances of the service
//! means neither the ceiling nor the dedup is shared between them; a
//! multi-instance deployment would need an implementation backed by a
//! shared store.
//!
//! The dedup window also bounds how long one refresh is joinable. Every
//! retry attempt takes its own rate-window slot and the backoff adds
//! 1 + 2 + 4 s under the default policy, so a refresh queued behind a full
//! rate window can still be running when its entry turns stale. A caller
//! arriving after that starts a second refresh for the same credential, and
//! the two race to persist their grants. Raise `dedup_window` above the
//! worst-case refresh duration when that matters.

use crate::dedup::RefreshDeduplicator;
use crate::rate_window::RateWindow;
use core_runtime::config::RefreshPolicy;
use std::sync::Arc;

#[derive(Debug)]
pub struct RefreshGate {
    rate_window: Arc<RateWindow>,
    deduplicator: RefreshDeduplicator,
}

impl RefreshGate {
    pub fn new(policy: &RefreshPolicy) -> Arc<Self> {
        Arc::new(Self {
            rate_window: Arc::new(RateWindow::from_policy(policy)),
            deduplicator: RefreshDeduplicator::new(policy.dedup_window),
        })
    }

    pub fn rate_window(&self) -> &Arc<RateWindow> {
        &self.rate_window
    }

    pub fn deduplicator(&self) -> &RefreshDeduplicator {
        &self.deduplicator
    }
}
