//! Timeout-scheduled "updating" indicator for optimistic writes.
//!
//! A write that resolves quickly should not flash a spinner. The flag
//! returned here flips to `true` only if the write is still unresolved after
//! a short threshold; resolving (or dropping) the guard first cancels the
//! transition. This only drives presentation - it never cancels the
//! underlying write.
//!
//! The write paths do not start the timer themselves; a UI wraps the call:
//!
//! ```no_run
//! # async fn demo(session: platecache::SyncSession) {
//! use platecache::sync::{pending_after, PENDING_THRESHOLD};
//!
//! let (guard, updating) = pending_after(PENDING_THRESHOLD);
//! let outcome = session.toggle_favorite(3).await;
//! guard.resolve(); // resolved in time: `updating` never flips
//! # let _ = (outcome, updating);
//! # }
//! ```

use std::time::Duration;

use tokio::sync::{oneshot, watch};

/// Delay before an unresolved write is surfaced as "updating".
pub const PENDING_THRESHOLD: Duration = Duration::from_millis(80);

/// Handle to a scheduled pending transition.
#[derive(Debug)]
pub struct PendingGuard {
    _cancel: oneshot::Sender<()>,
}

impl PendingGuard {
    /// The write finished before the threshold: the flag stays unset.
    pub fn resolve(self) {}
}

/// Schedule the returned flag to flip to `true` after `delay`, unless the
/// guard is resolved or dropped first.
pub fn pending_after(delay: Duration) -> (PendingGuard, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {
                let _ = tx.send(true);
            }
            _ = cancel_rx => {}
        }
    });
    (PendingGuard { _cancel: cancel_tx }, rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn flag_flips_once_threshold_elapses() {
        let (_guard, mut rx) = pending_after(PENDING_THRESHOLD);
        rx.changed().await.unwrap();
        assert!(*rx.borrow());
    }

    #[tokio::test(start_paused = true)]
    async fn resolving_before_threshold_cancels_transition() {
        let (guard, mut rx) = pending_after(PENDING_THRESHOLD);
        guard.resolve();
        // The timer task exits without sending; the channel just closes.
        assert!(rx.changed().await.is_err());
        assert!(!*rx.borrow());
    }
}
