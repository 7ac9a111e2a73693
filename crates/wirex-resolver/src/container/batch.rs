//! Batched, optionally parallel evaluation of per-revision work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam::channel;
use log::{debug, warn};

/// Runs work items in batches on a small fixed-size worker pool.
///
/// Each batch must finish before its deadline. When a batch times out the
/// executor stops handing out work, keeps whatever results already arrived
/// and evaluates the remainder of the input one item at a time on the
/// calling thread. Results are always returned in input order, whatever the
/// pool size.
#[derive(Debug, Clone)]
pub struct BatchExecutor {
    batch_size: usize,
    timeout: Duration,
    threads: usize,
}

impl BatchExecutor {
    pub fn new(batch_size: usize, timeout: Duration, threads: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
            timeout,
            threads: threads.max(1),
        }
    }

    pub fn run<T, R, F>(&self, items: &[T], work: F) -> Vec<R>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let mut results: Vec<Option<R>> = items.iter().map(|_| None).collect();
        let mut sequential = false;

        for (batch_index, batch) in items.chunks(self.batch_size).enumerate() {
            let offset = batch_index * self.batch_size;
            if sequential {
                for (i, item) in batch.iter().enumerate() {
                    results[offset + i] = Some(work(item));
                }
                continue;
            }

            let completed = self.run_batch(batch, &work);
            let finished = completed.len();
            for (i, result) in completed {
                results[offset + i] = Some(result);
            }

            if finished < batch.len() {
                warn!(
                    "Resolution batch {} timed out after {:?}, continuing one revision at a time",
                    batch_index, self.timeout
                );
                sequential = true;
                for (i, item) in batch.iter().enumerate() {
                    if results[offset + i].is_none() {
                        results[offset + i] = Some(work(item));
                    }
                }
            }
        }

        results.into_iter().flatten().collect()
    }

    /// Evaluate one batch on the pool, returning the results that arrived
    /// before the deadline tagged with their index in the batch.
    fn run_batch<T, R, F>(&self, batch: &[T], work: &F) -> Vec<(usize, R)>
    where
        T: Sync,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let (job_tx, job_rx) = channel::bounded(batch.len());
        let (result_tx, result_rx) = channel::bounded(batch.len());
        for index in 0..batch.len() {
            let _ = job_tx.send(index);
        }
        drop(job_tx);

        let cancelled = AtomicBool::new(false);
        let deadline = Instant::now() + self.timeout;
        let mut completed = Vec::with_capacity(batch.len());

        thread::scope(|scope| {
            for _ in 0..self.threads.min(batch.len()) {
                let job_rx = job_rx.clone();
                let result_tx = result_tx.clone();
                let cancelled = &cancelled;
                scope.spawn(move || {
                    while let Ok(index) = job_rx.recv() {
                        if cancelled.load(Ordering::Relaxed) {
                            break;
                        }
                        let _ = result_tx.send((index, work(&batch[index])));
                    }
                });
            }
            drop(result_tx);

            while completed.len() < batch.len() {
                match result_rx.recv_deadline(deadline) {
                    Ok(result) => completed.push(result),
                    Err(channel::RecvTimeoutError::Timeout) => {
                        cancelled.store(true, Ordering::Relaxed);
                        break;
                    }
                    Err(channel::RecvTimeoutError::Disconnected) => break,
                }
            }
        });

        // Items finished while the pool was winding down still count
        completed.extend(result_rx.try_iter());
        debug!("Batch of {} revisions produced {} results", batch.len(), completed.len());
        completed
    }
}

impl Default for BatchExecutor {
    fn default() -> Self {
        Self::new(10, Duration::from_millis(2000), 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_keep_input_order() {
        let items: Vec<u32> = (0..25).collect();
        let executor = BatchExecutor::new(4, Duration::from_secs(10), 3);
        let results = executor.run(&items, |n| n * 2);
        assert_eq!(results, items.iter().map(|n| n * 2).collect::<Vec<_>>());
    }

    #[test]
    fn test_single_thread_default() {
        let items = vec!["a", "bb", "ccc"];
        let results = BatchExecutor::default().run(&items, |s| s.len());
        assert_eq!(results, vec![1, 2, 3]);
    }

    #[test]
    fn test_timeout_falls_back_to_sequential() {
        let items: Vec<u64> = (0..6).collect();
        let executor = BatchExecutor::new(3, Duration::from_millis(1), 1);
        let results = executor.run(&items, |n| {
            std::thread::sleep(Duration::from_millis(20));
            n + 1
        });
        assert_eq!(results, vec![1, 2, 3, 4, 5, 6]);
    }

    #[test]
    fn test_empty_input() {
        let items: Vec<u8> = Vec::new();
        assert!(BatchExecutor::default().run(&items, |n| *n).is_empty());
    }
}
