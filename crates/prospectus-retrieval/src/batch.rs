//! Parallel batch processing for structured multi-spec requests.
//!
//! A pool of `min(N, max_workers)` worker threads pulls work items off a
//! shared channel and writes results back tagged with their original
//! request index, so the result slice is ordered by request position
//! regardless of completion order. One deadline covers the whole batch:
//! when it fires, workers observe the shared cancellation context, stop
//! taking new items, and the caller gets the partial slice plus a timeout
//! error. Unfinished positions read as `unavailable`.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::warn;

use prospectus_core::cancel::CancelContext;
use prospectus_core::error::Error;
use prospectus_core::model::SpecAvailabilityStatus;

/// Run `worker` over every spec name concurrently.
///
/// Returns one status per requested name, in request order, plus the
/// timeout error when the batch deadline fired first.
pub fn process_in_parallel<F>(
    specs: &[String],
    max_workers: usize,
    timeout: Duration,
    cancel: &CancelContext,
    worker: F,
) -> (Vec<SpecAvailabilityStatus>, Option<Error>)
where
    F: Fn(&str, &CancelContext) -> SpecAvailabilityStatus + Send + Sync,
{
    if specs.is_empty() {
        return (Vec::new(), None);
    }
    let batch_cancel = cancel.child(timeout);
    let workers = specs.len().min(max_workers.max(1));

    // Bounded work queue: the producer blocks instead of piling up items
    let (work_tx, work_rx) = mpsc::sync_channel::<(usize, String)>(workers * 2);
    let work_rx = Arc::new(Mutex::new(work_rx));
    let (result_tx, result_rx) = mpsc::channel::<(usize, SpecAvailabilityStatus)>();

    let mut results: Vec<Option<SpecAvailabilityStatus>> = vec![None; specs.len()];
    let mut timeout_error = None;

    std::thread::scope(|scope| {
        let worker = &worker;
        for _ in 0..workers {
            let work_rx = Arc::clone(&work_rx);
            let result_tx = result_tx.clone();
            let batch_cancel = batch_cancel.clone();
            scope.spawn(move || {
                loop {
                    let item = work_rx.lock().expect("work queue lock poisoned").recv();
                    let Ok((idx, name)) = item else { break };
                    // A fired deadline means: stop taking new items
                    if batch_cancel.check("batch worker").is_err() {
                        break;
                    }
                    let status = worker(&name, &batch_cancel);
                    if result_tx.send((idx, status)).is_err() {
                        break;
                    }
                }
            });
        }
        // Only the workers hold the receiver now: when they exit, a
        // blocked producer send errors out instead of hanging
        drop(work_rx);
        drop(result_tx);

        scope.spawn(move || {
            for (idx, name) in specs.iter().enumerate() {
                if work_tx.send((idx, name.clone())).is_err() {
                    break;
                }
            }
        });

        let mut received = 0;
        while received < specs.len() {
            let remaining = batch_cancel
                .remaining()
                .unwrap_or(Duration::from_secs(0));
            if remaining.is_zero() {
                timeout_error = Some(Error::Timeout("batch processing deadline".into()));
                batch_cancel.cancel();
                break;
            }
            match result_rx.recv_timeout(remaining) {
                Ok((idx, status)) => {
                    results[idx] = Some(status);
                    received += 1;
                }
                Err(RecvTimeoutError::Timeout) => {
                    timeout_error = Some(Error::Timeout("batch processing deadline".into()));
                    batch_cancel.cancel();
                    break;
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
    });

    if timeout_error.is_some() {
        warn!(
            completed = results.iter().filter(|slot| slot.is_some()).count(),
            total = specs.len(),
            "batch deadline fired, returning partial results"
        );
    }

    let statuses = results
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| {
            slot.unwrap_or_else(|| SpecAvailabilityStatus::unavailable(specs[idx].clone()))
        })
        .collect();
    (statuses, timeout_error)
}
