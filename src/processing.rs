//! # Processing flag store
//!
//! ## Responsibility
//! Owns the one piece of mutable state shared by every room view: whether a
//! conversation round is in flight anywhere in this process. The server runs
//! a single round at a time, so every view disables submission while the flag
//! is raised.
//!
//! ## Guarantees
//! - Clone freely: all clones share the same flag.
//! - [`try_acquire`](ProcessingStore::try_acquire) is an atomic test-and-set,
//!   so of two racing submissions exactly one proceeds.
//! - Subscribers observe every transition through a `watch` channel.
//!
//! ## Writers
//! Only the coordinator's submit path (acquire, release on failure) and its
//! poll path (mark busy on discovery, release on completion) change the flag.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;

/// Process-wide "a round is in flight" flag.
#[derive(Debug, Clone)]
pub struct ProcessingStore {
    tx: Arc<watch::Sender<bool>>,
}

impl ProcessingStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Current value of the flag.
    pub fn get(&self) -> bool {
        *self.tx.borrow()
    }

    /// Overwrite the flag. Subscribers are only woken when the value changes.
    pub fn set(&self, busy: bool) {
        let changed = self.tx.send_if_modified(|v| {
            if *v == busy {
                false
            } else {
                *v = busy;
                true
            }
        });
        if changed {
            debug!(busy, "processing flag changed");
        }
    }

    /// Receiver that sees the current value and every later change.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }

    /// Raise the flag if it is down. Returns `false` (and changes nothing)
    /// when a round is already in flight.
    pub fn try_acquire(&self) -> bool {
        let acquired = self.tx.send_if_modified(|v| {
            if *v {
                false
            } else {
                *v = true;
                true
            }
        });
        debug!(acquired, "processing flag acquire");
        acquired
    }

    /// Raise the flag unconditionally; used when the server reports a round
    /// this process did not start.
    pub fn mark_busy(&self) {
        self.set(true);
    }

    /// Lower the flag.
    pub fn release(&self) {
        self.set(false);
    }

    /// Resolve once the flag is down.
    pub async fn wait_until_idle(&self) {
        let mut rx = self.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|busy| !*busy).await;
    }
}

impl Default for ProcessingStore {
    fn default() -> Self {
        Self::new()
    }
}
