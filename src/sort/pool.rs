//! Sort Worker Pool
//!
//! Sorts chunks on a fixed set of worker threads.
//!
//! ## Protocol
//! ```text
//!   orchestrator ──(index, Chunk)──▶ worker N   (one task channel per worker)
//!   orchestrator ◀──WorkerReport──── worker N   (shared report channel)
//! ```
//! Every worker gets one chunk up front. Each report hands the reporting
//! worker the next unclaimed chunk, or closes its task channel so it exits.
//! Workers share nothing but the channels.

use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::thread;

use crossbeam::channel::{self, Receiver, Sender};

use crate::error::{CellStoreError, Result};

use super::chunk::{sort_chunk, Chunk};

/// Completion message from a worker
struct WorkerReport {
    worker: usize,
    index: usize,
    result: Result<PathBuf>,
}

/// Sort `chunks` on `workers` threads, returning output paths in chunk order
///
/// On failure no further chunks are dispatched, in-flight chunks drain, the
/// outputs produced so far are removed and the first error is returned.
pub fn sort_chunks_parallel(chunks: Vec<Chunk>, workers: usize) -> Result<Vec<PathBuf>> {
    let total = chunks.len();
    let workers = workers.clamp(1, total.max(1));
    let mut pending = chunks.into_iter().enumerate();
    let mut outputs: Vec<Option<PathBuf>> = vec![None; total];
    let mut first_error: Option<CellStoreError> = None;

    let (report_tx, report_rx) = channel::unbounded::<WorkerReport>();

    thread::scope(|scope| {
        // Pre-start every worker
        let mut tasks: Vec<Option<Sender<(usize, Chunk)>>> = Vec::with_capacity(workers);
        for worker in 0..workers {
            let (task_tx, task_rx) = channel::bounded::<(usize, Chunk)>(1);
            let report_tx = report_tx.clone();
            scope.spawn(move || run_worker(worker, task_rx, report_tx));
            tasks.push(Some(task_tx));
        }
        drop(report_tx);

        // Hand out the first round
        let mut in_flight = 0usize;
        for (worker, slot) in tasks.iter_mut().enumerate() {
            match pending.next() {
                Some(task) => {
                    if dispatch(slot, task, worker, &mut first_error) {
                        in_flight += 1;
                    }
                }
                None => *slot = None,
            }
        }

        while in_flight > 0 {
            let report = match report_rx.recv() {
                Ok(report) => report,
                Err(_) => {
                    first_error.get_or_insert_with(|| {
                        CellStoreError::Worker("all sort workers disconnected".to_string())
                    });
                    break;
                }
            };
            in_flight -= 1;

            match report.result {
                Ok(path) => outputs[report.index] = Some(path),
                Err(e) => {
                    tracing::debug!("worker {} failed chunk {}: {}", report.worker, report.index, e);
                    first_error.get_or_insert(e);
                }
            }

            let slot = &mut tasks[report.worker];
            let next = if first_error.is_none() { pending.next() } else { None };
            match next {
                Some(task) => {
                    if dispatch(slot, task, report.worker, &mut first_error) {
                        in_flight += 1;
                    }
                }
                // Closing the channel terminates the worker
                None => *slot = None,
            }
        }

        tasks.clear();
    });

    match first_error {
        Some(e) => {
            for path in outputs.into_iter().flatten() {
                super::remove_temporary(&path);
            }
            Err(e)
        }
        None => outputs
            .into_iter()
            .enumerate()
            .map(|(index, path)| {
                path.ok_or_else(|| {
                    CellStoreError::Worker(format!("chunk {} was never sorted", index))
                })
            })
            .collect(),
    }
}

/// Send a task to a worker; records an error if the worker is gone
fn dispatch(
    slot: &mut Option<Sender<(usize, Chunk)>>,
    task: (usize, Chunk),
    worker: usize,
    first_error: &mut Option<CellStoreError>,
) -> bool {
    let index = task.0;
    let sent = slot.as_ref().map(|tx| tx.send(task).is_ok()).unwrap_or(false);
    if sent {
        tracing::trace!("dispatched chunk {} to worker {}", index, worker);
    } else {
        *slot = None;
        first_error.get_or_insert_with(|| {
            CellStoreError::Worker(format!("worker {} stopped before chunk {}", worker, index))
        });
    }
    sent
}

fn run_worker(worker: usize, tasks: Receiver<(usize, Chunk)>, reports: Sender<WorkerReport>) {
    for (index, chunk) in tasks.iter() {
        let result = panic::catch_unwind(AssertUnwindSafe(|| sort_chunk(&chunk)))
            .unwrap_or_else(|_| {
                Err(CellStoreError::Worker(format!(
                    "worker {} panicked sorting chunk {}",
                    worker, index
                )))
            });

        if reports.send(WorkerReport { worker, index, result }).is_err() {
            break;
        }
    }
    tracing::trace!("sort worker {} exiting", worker);
}
