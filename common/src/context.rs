use std::fmt::{Display, Formatter};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::sync::{broadcast, oneshot};
use tokio::time::Instant;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum CancelReason {
    Parent,
    Deadline,
    Cancel,
}

impl Display for CancelReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parent => write!(f, "Parent"),
            Self::Deadline => write!(f, "Deadline"),
            Self::Cancel => write!(f, "Cancel"),
        }
    }
}

struct Inner {
    // Dropped when every Context clone is gone, which is what unblocks
    // Handler::done / Handler::cancel.
    _alive: oneshot::Sender<()>,
    deadline: Option<Instant>,
    parent: Option<Context>,
    cancelled: broadcast::Receiver<()>,
}

/// A cancellation token handed to long running tasks. Tasks select on
/// `done()` and wind down when it resolves.
#[derive(Clone)]
pub struct Context(Arc<Inner>);

/// The owning side of a [`Context`]. Cancelling it wakes every `done()`
/// future; both `done` and `cancel` wait until all context clones have been
/// dropped.
pub struct Handler {
    dropped: oneshot::Receiver<()>,
    cancel: broadcast::Sender<()>,
}

impl Handler {
    /// Waits for all contexts to be dropped without cancelling them.
    pub async fn done(&mut self) {
        let _ = (&mut self.dropped).await;
    }

    /// Cancels all contexts and waits for them to be dropped.
    pub async fn cancel(self) {
        drop(self.cancel);

        let _ = self.dropped.await;
    }
}

impl Context {
    #[must_use]
    pub fn new() -> (Self, Handler) {
        Self::build(None, None)
    }

    #[must_use]
    pub fn with_deadline(deadline: Instant) -> (Self, Handler) {
        Self::build(None, Some(deadline))
    }

    #[must_use]
    pub fn with_timeout(timeout: std::time::Duration) -> (Self, Handler) {
        Self::with_deadline(Instant::now() + timeout)
    }

    #[must_use]
    pub fn with_parent(parent: Context, deadline: Option<Instant>) -> (Self, Handler) {
        Self::build(Some(parent), deadline)
    }

    fn build(parent: Option<Context>, deadline: Option<Instant>) -> (Self, Handler) {
        let (alive, dropped) = oneshot::channel();
        let (cancel, cancelled) = broadcast::channel(1);

        (
            Self(Arc::new(Inner {
                _alive: alive,
                deadline,
                parent,
                cancelled,
            })),
            Handler { dropped, cancel },
        )
    }

    /// Resolves once the context is cancelled, its deadline passes, or its
    /// parent is cancelled.
    pub fn done(&self) -> Pin<Box<dyn Future<Output = CancelReason> + '_ + Send>> {
        let mut cancelled = self.0.cancelled.resubscribe();
        Box::pin(async move {
            match (&self.0.parent, self.0.deadline) {
                (Some(parent), Some(deadline)) => {
                    tokio::select! {
                        _ = parent.done() => CancelReason::Parent,
                        _ = tokio::time::sleep_until(deadline) => CancelReason::Deadline,
                        _ = cancelled.recv() => CancelReason::Cancel,
                    }
                }
                (Some(parent), None) => {
                    tokio::select! {
                        _ = parent.done() => CancelReason::Parent,
                        _ = cancelled.recv() => CancelReason::Cancel,
                    }
                }
                (None, Some(deadline)) => {
                    tokio::select! {
                        _ = tokio::time::sleep_until(deadline) => CancelReason::Deadline,
                        _ = cancelled.recv() => CancelReason::Cancel,
                    }
                }
                (None, None) => {
                    let _ = cancelled.recv().await;
                    CancelReason::Cancel
                }
            }
        })
    }
}
