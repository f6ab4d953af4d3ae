//! Combine-latest fan-in over N update streams.
//!
//! [`combine_latest`] merges N input streams into one stream of N-element
//! arrays, where each output carries the most recent value observed from
//! every input:
//!
//! - nothing is emitted until every input has yielded at least one value;
//! - after that, each input emission produces exactly one output;
//! - outputs are serialized in arrival order even when inputs fire
//!   concurrently;
//! - the output completes when *any* input completes, after flushing an
//!   update already observed from that input;
//! - errors are not a channel concern here: inputs carry `Result` elements,
//!   so failures travel as values.
//!
//! Dropping the returned stream aborts the drain tasks and the coordinator.
//!
//! The topology is one coordinator plus one drain task per input. A drain
//! task writes its slot in a shared array and signals the coordinator, which
//! copies the array out once all slots are populated. The slot lock is held
//! only for the copy, never across an await.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::stream::{DropGuard, Updates};

enum Signal {
    /// Slot `i` has a fresh value.
    Updated(usize),
    /// Input `i` completed.
    Finished(usize),
}

/// Merges `inputs` into a stream of latest-value arrays.
///
/// Must be called within a Tokio runtime; the drain tasks are spawned on
/// it. An empty input list produces a stream that completes immediately.
pub fn combine_latest<T>(inputs: Vec<Updates<T>>) -> Updates<Vec<T>>
where
    T: Clone + Send + 'static,
{
    let input_count = inputs.len();
    if input_count == 0 {
        return Updates::from_stream(futures::stream::empty());
    }

    let slots: Arc<Mutex<Vec<Option<T>>>> = Arc::new(Mutex::new(vec![None; input_count]));
    let (signal_tx, mut signal_rx) = mpsc::unbounded_channel::<Signal>();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Vec<T>>();

    let mut handles = Vec::with_capacity(input_count + 1);

    for (index, mut input) in inputs.into_iter().enumerate() {
        let slots = slots.clone();
        let signal_tx = signal_tx.clone();

        handles.push(tokio::spawn(async move {
            while let Some(item) = input.next().await {
                slots.lock()[index] = Some(item);
                if signal_tx.send(Signal::Updated(index)).is_err() {
                    return;
                }
            }
            let _ = signal_tx.send(Signal::Finished(index));
        }));
    }
    drop(signal_tx);

    handles.push(tokio::spawn(async move {
        while let Some(signal) = signal_rx.recv().await {
            match signal {
                Signal::Updated(_) => {
                    let snapshot: Option<Vec<T>> = {
                        let slots = slots.lock();
                        slots.iter().cloned().collect()
                    };

                    if let Some(values) = snapshot {
                        if out_tx.send(values).is_err() {
                            return;
                        }
                    }
                }

                Signal::Finished(_) => return,
            }
        }
    }));

    let guard = DropGuard::new(move || {
        for handle in &handles {
            handle.abort();
        }
    });

    Updates::from_stream(futures::stream::poll_fn(move |cx| out_rx.poll_recv(cx)))
        .with_guard(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::latest_only;

    /// A gated input: values pass through only when released one at a time.
    fn gated<T: Send + 'static>() -> (tokio::sync::mpsc::UnboundedSender<T>, Updates<T>) {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<T>();
        let stream = futures::stream::poll_fn(move |cx| rx.poll_recv(cx));
        (tx, Updates::from_stream(stream))
    }

    #[tokio::test]
    async fn test_no_output_until_all_inputs_seen() {
        let (tx_a, a) = gated::<u32>();
        let (tx_b, b) = gated::<u32>();

        let mut combined = combine_latest(vec![a, b]);

        tx_a.send(1).unwrap();
        let early =
            tokio::time::timeout(std::time::Duration::from_millis(20), combined.next()).await;
        assert!(early.is_err(), "no output before all slots are filled");

        tx_b.send(4).unwrap();
        assert_eq!(combined.next().await, Some(vec![1, 4]));
    }

    #[tokio::test]
    async fn test_interleaved_release_sequence() {
        let (tx_a, a) = gated::<u32>();
        let (tx_b, b) = gated::<u32>();
        let (tx_c, c) = gated::<u32>();

        let mut combined = combine_latest(vec![a, b, c]);

        // Release one element per input in order, then continue round-robin.
        tx_a.send(1).unwrap();
        tx_b.send(4).unwrap();
        tx_c.send(7).unwrap();
        assert_eq!(combined.next().await, Some(vec![1, 4, 7]));

        tx_a.send(2).unwrap();
        assert_eq!(combined.next().await, Some(vec![2, 4, 7]));

        tx_b.send(5).unwrap();
        assert_eq!(combined.next().await, Some(vec![2, 5, 7]));

        tx_c.send(8).unwrap();
        assert_eq!(combined.next().await, Some(vec![2, 5, 8]));

        tx_a.send(3).unwrap();
        assert_eq!(combined.next().await, Some(vec![3, 5, 8]));

        tx_b.send(6).unwrap();
        assert_eq!(combined.next().await, Some(vec![3, 6, 8]));

        tx_c.send(9).unwrap();
        assert_eq!(combined.next().await, Some(vec![3, 6, 9]));
    }

    #[tokio::test]
    async fn test_completes_when_any_input_completes() {
        let (tx_a, a) = gated::<u32>();
        let (sink_b, stream_b) = latest_only::<u32>();
        let b = Updates::from_slot(stream_b, || {});

        let mut combined = combine_latest(vec![a, b]);

        tx_a.send(1).unwrap();
        sink_b.send(2);
        assert_eq!(combined.next().await, Some(vec![1, 2]));

        // Completing input B flushes nothing further and ends the output.
        drop(sink_b);
        assert_eq!(combined.next().await, None);
        drop(tx_a);
    }

    #[tokio::test]
    async fn test_empty_input_list_completes_immediately() {
        let mut combined = combine_latest(Vec::<Updates<u32>>::new());
        assert_eq!(combined.next().await, None);
    }
}
