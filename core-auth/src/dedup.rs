//! Single-flight merging of concurrent refreshes for one credential.
//!
//! The key is the refresh token itself, the true identity of a credential.
//! Every caller that arrives while a refresh is pending joins the same
//! [`Shared`] future and observes the identical result. An entry older than
//! the dedup window is treated as lost and replaced by a fresh attempt.
//!
//! An entry leaves the map once its refresh has settled or once every caller
//! waiting on it has been cancelled. Stale entries of any key are pruned
//! whenever a new refresh is registered.

use crate::error::AuthError;
use crate::types::TokenGrant;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

type RefreshOutcome = Result<TokenGrant, AuthError>;
type SharedRefresh = Shared<BoxFuture<'static, RefreshOutcome>>;

struct PendingRefresh {
    started: Instant,
    generation: u64,
    future: SharedRefresh,
}

pub struct RefreshDeduplicator {
    window: Duration,
    pending: Mutex<HashMap<String, PendingRefresh>>,
    generations: AtomicU64,
}

impl RefreshDeduplicator {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Mutex::new(HashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Runs the refresh produced by `start`, or joins the one already pending
    /// for `key`.
    ///
    /// `start` is only invoked when no fresh entry exists. The lookup and the
    /// insert of the new entry happen under one lock, so two callers can never
    /// both start a refresh for the same key inside the window.
    pub async fn run<F, Fut>(&self, key: &str, start: F) -> RefreshOutcome
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = RefreshOutcome> + Send + 'static,
    {
        let (future, generation) = {
            let mut pending = self.lock();
            let now = Instant::now();

            let joined = pending
                .get(key)
                .filter(|entry| now.saturating_duration_since(entry.started) < self.window)
                .map(|entry| (entry.future.clone(), entry.generation));

            match joined {
                Some(joined) => {
                    debug!(generation = joined.1, "Joining pending token refresh");
                    joined
                }
                None => {
                    if pending.contains_key(key) {
                        warn!(
                            window_ms = self.window.as_millis() as u64,
                            "Discarding stale pending refresh"
                        );
                    }

                    let before = pending.len();
                    pending.retain(|_, entry| {
                        now.saturating_duration_since(entry.started) < self.window
                    });
                    if pending.len() < before {
                        debug!(pruned = before - pending.len(), "Pruned stale pending refreshes");
                    }

                    let generation = self.generations.fetch_add(1, Ordering::Relaxed);
                    let future = start().boxed().shared();
                    pending.insert(
                        key.to_string(),
                        PendingRefresh {
                            started: now,
                            generation,
                            future: future.clone(),
                        },
                    );
                    (future, generation)
                }
            }
        };

        let mut waiter = Waiter {
            dedup: self,
            key,
            generation,
            future,
        };
        (&mut waiter.future).await
    }

    /// Number of refreshes currently registered.
    pub fn pending_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, PendingRefresh>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// One caller's hold on a pending refresh.
///
/// Dropping it, after completion or on cancellation, removes the entry when it
/// is still this generation's and either has settled or has no other waiter.
struct Waiter<'a> {
    dedup: &'a RefreshDeduplicator,
    key: &'a str,
    generation: u64,
    future: SharedRefresh,
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        let mut pending = self.dedup.lock();
        let Some(entry) = pending.get(self.key) else {
            return;
        };
        if entry.generation != self.generation {
            return;
        }

        let settled = entry.future.peek().is_some();
        // The map and this waiter hold the only two handles.
        let abandoned = self.future.strong_count() == Some(2);
        if settled || abandoned {
            if !settled {
                debug!(generation = self.generation, "Last waiter cancelled, dropping refresh");
            }
            pending.remove(self.key);
        }
    }
}

impl std::fmt::Debug for RefreshDeduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshDeduplicator")
            .field("window", &self.window)
            .field("pending", &self.pending_count())
            .finish()
    }
}
