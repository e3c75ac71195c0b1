//! Bounded worker pool for chunked reductions.
//!
//! The input is cut into contiguous chunks and queued on a `crossbeam`
//! channel. A fixed number of worker threads pull and reduce chunks, and
//! the partial results are folded together in whatever order they finish.
//! The fold must therefore be associative and commutative.

use crossbeam::channel::{self, RecvTimeoutError};
use std::ops::{AddAssign, Range};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::config::available_parallelism;

/// Clamps a requested degree of parallelism to `[1, available cores]`.
pub fn clamp_parallelism(requested: usize) -> usize {
    requested.clamp(1, available_parallelism().max(1))
}

/// Splits `len` items into at most `parts` contiguous ranges of
/// `max(1, len / parts)` items; the last range absorbs the remainder.
pub fn chunk_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    if len == 0 {
        return Vec::new();
    }
    let size = (len / parts.max(1)).max(1);
    let count = parts.max(1).min(len);
    (0..count)
        .map(|i| {
            let start = i * size;
            let end = if i + 1 == count { len } else { start + size };
            start..end
        })
        .collect()
}

/// Reduces `items` with `count` over a pool of `parallelism` workers.
///
/// Empty input returns `S::default()` without starting any threads. A chunk
/// whose reducer panics contributes nothing. If `grace` runs out before
/// every chunk has reported, the remaining workers are detached and their
/// results discarded.
pub fn reduce_chunked<T, S, F>(items: Vec<T>, parallelism: usize, grace: Duration, count: F) -> S
where
    T: Send + Sync + 'static,
    S: Default + AddAssign + Send + 'static,
    F: Fn(&[T]) -> S + Send + Sync + 'static,
{
    if items.is_empty() {
        return S::default();
    }

    let workers = clamp_parallelism(parallelism);
    let ranges = chunk_ranges(items.len(), workers);
    let expected = ranges.len();
    debug!(items = items.len(), workers, chunks = expected, "starting chunked reduction");

    let items = Arc::new(items);
    let count = Arc::new(count);

    let (job_tx, job_rx) = channel::bounded::<Range<usize>>(expected);
    for range in ranges {
        // Capacity covers every chunk and the receiver is still held here.
        let _ = job_tx.send(range);
    }
    drop(job_tx);

    let (result_tx, result_rx) = channel::unbounded::<(Range<usize>, thread::Result<S>)>();
    let handles: Vec<_> = (0..workers.min(expected))
        .map(|_| {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let items = Arc::clone(&items);
            let count = Arc::clone(&count);
            thread::spawn(move || {
                for range in jobs.iter() {
                    let partial = panic::catch_unwind(AssertUnwindSafe(|| count(&items[range.clone()])));
                    if results.send((range, partial)).is_err() {
                        break;
                    }
                }
            })
        })
        .collect();
    drop(job_rx);
    drop(result_tx);

    let deadline = Instant::now() + grace;
    let mut total = S::default();
    let mut received = 0;
    while received < expected {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match result_rx.recv_timeout(remaining) {
            Ok((_, Ok(partial))) => {
                total += partial;
                received += 1;
            }
            Ok((range, Err(_))) => {
                warn!(start = range.start, end = range.end, "chunk failed, counting it as zero");
                received += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(pending = expected - received, "grace period elapsed, abandoning remaining chunks");
                return total;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for handle in handles {
        let _ = handle.join();
    }
    total
}
