//! Async update streams for watch APIs.
//!
//! Watch subscriptions hand the caller an [`Updates`] stream. Two delivery
//! shapes exist behind it:
//!
//! - *live* streams backed by a [`LatestSink`] with a single-slot
//!   "drop oldest, keep newest" buffer, used by providers that actually
//!   change (mutable in-memory, reloading file);
//! - *static* streams that yield the current value once and then idle until
//!   dropped, used by providers whose state never changes.
//!
//! A static stream idling (rather than completing) matters: the
//! combine-latest fan-in treats completion of any input as completion of the
//! whole merged stream, and a static provider must not tear down a watch
//! over a stack that also contains live providers.
//!
//! Dropping an [`Updates`] is the cancellation path: any registered cleanup
//! (watcher deregistration, drain-task teardown) runs at that point.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll, Waker};

use futures::Stream;
use futures::StreamExt as _;
use futures::stream::BoxStream;
use parking_lot::Mutex;

// ============================================================================
// Latest-only slot channel
// ============================================================================

struct Slot<T> {
    value: Option<T>,
    waker: Option<Waker>,
    closed: bool,
}

/// Sending half of a single-slot channel.
///
/// A send replaces any value the receiver has not yet observed; sends never
/// block and never fail.
pub(crate) struct LatestSink<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> LatestSink<T> {
    /// Stores `value`, displacing an unobserved predecessor.
    pub(crate) fn send(&self, value: T) {
        let waker = {
            let mut slot = self.slot.lock();
            slot.value = Some(value);
            slot.waker.take()
        };

        if let Some(waker) = waker {
            waker.wake();
        }
    }
}

impl<T> Clone for LatestSink<T> {
    fn clone(&self) -> Self {
        Self {
            slot: self.slot.clone(),
        }
    }
}

impl<T> Drop for LatestSink<T> {
    fn drop(&mut self) {
        // Last sink gone: complete the stream. The slot Arc is shared with
        // the receiver, so a strong count of 2 means this is the only
        // remaining sink.
        if Arc::strong_count(&self.slot) <= 2 {
            let waker = {
                let mut slot = self.slot.lock();
                slot.closed = true;
                slot.waker.take()
            };
            if let Some(waker) = waker {
                waker.wake();
            }
        }
    }
}

/// Receiving half of a single-slot channel.
pub(crate) struct LatestStream<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Stream for LatestStream<T> {
    type Item = T;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        let mut slot = self.slot.lock();

        if let Some(value) = slot.value.take() {
            return Poll::Ready(Some(value));
        }

        if slot.closed {
            return Poll::Ready(None);
        }

        slot.waker = Some(cx.waker().clone());
        Poll::Pending
    }
}

impl<T> Unpin for LatestStream<T> {}

/// Creates a latest-only channel pair.
pub(crate) fn latest_only<T>() -> (LatestSink<T>, LatestStream<T>) {
    let slot = Arc::new(Mutex::new(Slot {
        value: None,
        waker: None,
        closed: false,
    }));

    (
        LatestSink { slot: slot.clone() },
        LatestStream { slot },
    )
}

// ============================================================================
// Updates stream
// ============================================================================

/// Runs a registered cleanup when the owning stream is dropped.
pub(crate) struct DropGuard {
    cleanup: Option<Box<dyn FnOnce() + Send>>,
}

impl DropGuard {
    pub(crate) fn new(cleanup: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cleanup: Some(Box::new(cleanup)),
        }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        if let Some(cleanup) = self.cleanup.take() {
            cleanup();
        }
    }
}

/// An async stream of watch updates.
///
/// Returned by every `watch_*` entry point. The first element is always the
/// current value at subscription time; later elements are changes, buffered
/// drop-oldest with capacity one. Dropping the stream cancels the
/// subscription and deregisters any underlying watcher.
pub struct Updates<T> {
    stream: BoxStream<'static, T>,
    guards: Vec<DropGuard>,
}

impl<T: Send + 'static> Updates<T> {
    /// Wraps an arbitrary stream.
    pub(crate) fn from_stream(stream: impl Stream<Item = T> + Send + 'static) -> Self {
        Self {
            stream: Box::pin(stream),
            guards: Vec::new(),
        }
    }

    /// A static stream: yields `initial` once, then idles until dropped.
    pub(crate) fn once_then_idle(initial: T) -> Self {
        let stream = futures::stream::once(async move { initial })
            .chain(futures::stream::pending());
        Self::from_stream(stream)
    }

    /// A live stream over a latest-only slot, with a cleanup to run when the
    /// subscriber goes away.
    pub(crate) fn from_slot(
        stream: LatestStream<T>,
        cleanup: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            stream: Box::pin(stream),
            guards: vec![DropGuard::new(cleanup)],
        }
    }

    /// Attaches an additional cleanup to run on drop.
    pub(crate) fn with_guard(mut self, guard: DropGuard) -> Self {
        self.guards.push(guard);
        self
    }

    /// Maps every element, preserving cancellation behavior.
    pub fn map<U, F>(self, f: F) -> Updates<U>
    where
        U: Send + 'static,
        F: FnMut(T) -> U + Send + 'static,
    {
        Updates {
            stream: Box::pin(self.stream.map(f)),
            guards: self.guards,
        }
    }

    /// Waits for the next element.
    ///
    /// Convenience wrapper over [`futures::StreamExt::next`] so callers do
    /// not need the extension trait in scope.
    pub async fn next(&mut self) -> Option<T> {
        self.stream.next().await
    }
}

impl<T> Stream for Updates<T> {
    type Item = T;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<T>> {
        self.stream.as_mut().poll_next(cx)
    }
}

impl<T> Unpin for Updates<T> {}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt as _;

    #[tokio::test]
    async fn test_latest_slot_delivers_in_order() {
        let (sink, mut stream) = latest_only::<u32>();

        sink.send(1);
        assert_eq!(stream.next().await, Some(1));

        sink.send(2);
        assert_eq!(stream.next().await, Some(2));
    }

    #[tokio::test]
    async fn test_latest_slot_drops_oldest() {
        let (sink, mut stream) = latest_only::<u32>();

        sink.send(1);
        sink.send(2);
        sink.send(3);

        // Only the newest unobserved value survives.
        assert_eq!(stream.next().await, Some(3));
    }

    #[tokio::test]
    async fn test_stream_completes_when_sink_dropped() {
        let (sink, mut stream) = latest_only::<u32>();

        sink.send(7);
        drop(sink);

        assert_eq!(stream.next().await, Some(7));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn test_once_then_idle_yields_then_pends() {
        let mut updates = Updates::once_then_idle(42u32);
        assert_eq!(updates.next().await, Some(42));

        // The stream idles rather than completing.
        let timeout =
            tokio::time::timeout(std::time::Duration::from_millis(10), updates.next()).await;
        assert!(timeout.is_err());
    }

    #[tokio::test]
    async fn test_drop_runs_cleanup() {
        let (sink, stream) = latest_only::<u32>();
        let cleaned = Arc::new(std::sync::atomic::AtomicBool::new(false));

        let flag = cleaned.clone();
        let updates = Updates::from_slot(stream, move || {
            flag.store(true, std::sync::atomic::Ordering::SeqCst);
        });

        drop(updates);
        assert!(cleaned.load(std::sync::atomic::Ordering::SeqCst));
        drop(sink);
    }

    #[tokio::test]
    async fn test_map_preserves_elements() {
        let mut updates = Updates::once_then_idle(10u32).map(|n| n * 2);
        assert_eq!(updates.next().await, Some(20));
    }
}
