// ── Snapshot subscriptions ──

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::CoordinatorSnapshot;

/// A subscription to the coordinator's published snapshots.
///
/// Gives point-in-time access through [`current`](Self::current) and
/// [`latest`](Self::latest), and change notification through
/// [`changed`](Self::changed) or by converting into a `Stream`.
pub struct SnapshotStream {
    current: Arc<CoordinatorSnapshot>,
    receiver: watch::Receiver<Arc<CoordinatorSnapshot>>,
}

impl SnapshotStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<CoordinatorSnapshot>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<CoordinatorSnapshot> {
        &self.current
    }

    /// Whatever is published right now.
    pub fn latest(&self) -> Arc<CoordinatorSnapshot> {
        self.receiver.borrow().clone()
    }

    /// Wait for the next publish. `None` once the coordinator is gone.
    pub async fn changed(&mut self) -> Option<Arc<CoordinatorSnapshot>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    /// Convert into a `Stream`. The first item is the snapshot current
    /// at conversion time.
    pub fn into_stream(self) -> SnapshotWatchStream {
        SnapshotWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter backed by the snapshot `watch::Receiver`.
pub struct SnapshotWatchStream {
    inner: WatchStream<Arc<CoordinatorSnapshot>>,
}

impl Stream for SnapshotWatchStream {
    type Item = Arc<CoordinatorSnapshot>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
