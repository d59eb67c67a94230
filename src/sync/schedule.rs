//! Port to the host platform's deferred-retry facility.
//!
//! Registering a tag asks the host to trigger a replay of the matching
//! outbox once connectivity allows; the host guarantees at least one attempt
//! but owns the timing. When no such facility exists the write paths fall
//! back to writing through immediately.

use std::fmt;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

/// Identifies which outbox a registration or replay refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SyncTag {
    Favorites,
    Reviews,
}

impl SyncTag {
    /// The registration tag string used by the host platform.
    pub fn as_str(self) -> &'static str {
        match self {
            SyncTag::Favorites => "sync-favorites",
            SyncTag::Reviews => "sync-reviews",
        }
    }
}

impl fmt::Display for SyncTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("replay registration for {tag} failed: {reason}")]
pub struct ScheduleError {
    pub tag: SyncTag,
    pub reason: String,
}

#[async_trait]
pub trait ReplayScheduler: Send + Sync {
    /// Whether deferred replay exists at all on this platform. When false,
    /// write paths skip the outbox and write through directly.
    fn is_available(&self) -> bool {
        true
    }

    /// Ask the host to replay `tag`'s outbox once connectivity allows.
    async fn register(&self, tag: SyncTag) -> Result<(), ScheduleError>;
}

/// Scheduler for platforms without deferred replay. Never available, so
/// every write goes through the direct fallback path.
#[derive(Debug, Default)]
pub struct NoScheduler;

#[async_trait]
impl ReplayScheduler for NoScheduler {
    fn is_available(&self) -> bool {
        false
    }

    async fn register(&self, tag: SyncTag) -> Result<(), ScheduleError> {
        Err(ScheduleError {
            tag,
            reason: "deferred replay unavailable".to_string(),
        })
    }
}

/// In-process scheduler that forwards registered tags over a channel, for
/// hosts that drive replay from their own event loop.
#[derive(Debug)]
pub struct ChannelScheduler {
    tx: mpsc::UnboundedSender<SyncTag>,
}

impl ChannelScheduler {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SyncTag>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ReplayScheduler for ChannelScheduler {
    async fn register(&self, tag: SyncTag) -> Result<(), ScheduleError> {
        self.tx.send(tag).map_err(|_| ScheduleError {
            tag,
            reason: "replay loop has shut down".to_string(),
        })
    }
}
