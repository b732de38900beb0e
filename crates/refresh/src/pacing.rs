//! Cooperative checkpoints between batches of records.
//!
//! A pass never schedules itself; every `batch_size` records it hands the
//! current [`Progress`] to a [`Pacer`] and carries on (or stops) according to
//! the answer. A pacer that wants to pause simply doesn't return until it is
//! time to resume.

use async_trait::async_trait;
use derive_more::Display;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Which loop of a pass reached the checkpoint.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Rebuild: populating the detector's auxiliary indexes.
    #[display("intermediate")]
    Prepass,
    /// Rebuild: computing every record.
    #[display("final")]
    Rebuild,
    /// Incremental: computing candidates and their references.
    #[display("incremental")]
    Incremental,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub phase: Phase,
    /// Records handled so far in this phase.
    pub done: usize,
    /// `None` while the total is not known (rebuild streams its ids).
    pub total: Option<usize>,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.total {
            Some(total) => write!(f, "{} {}/{}", self.phase, self.done, total),
            None => write!(f, "{} {}/?", self.phase, self.done),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    /// Stop before the next record. Nothing is flushed and the watermark
    /// stays where it was.
    Cancel,
}

#[async_trait]
pub trait Pacer: Send + Sync {
    async fn checkpoint(&self, progress: &Progress) -> Control;
}

/// Yields to the runtime at every checkpoint and never cancels.
#[derive(Debug, Default, Clone, Copy)]
pub struct Unpaced;

#[async_trait]
impl Pacer for Unpaced {
    async fn checkpoint(&self, _progress: &Progress) -> Control {
        tokio::task::yield_now().await;
        Control::Continue
    }
}

/// Cancels the pass at the next checkpoint once [`cancel`](Self::cancel)
/// was called from any clone.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Pacer for CancelFlag {
    async fn checkpoint(&self, _progress: &Progress) -> Control {
        tokio::task::yield_now().await;
        match self.is_cancelled() {
            true => Control::Cancel,
            false => Control::Continue,
        }
    }
}
