// SPDX-FileCopyrightText: 2026 Pubreward Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bounded background task pool.
//!
//! A fixed number of workers drain one bounded queue. Submission never
//! waits: a full queue is reported as [`PubrewardError::Busy`]. Task results
//! are logged and never returned to the submitter.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use metrics::counter;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use pubreward_core::PubrewardError;

type TaskFuture = Pin<Box<dyn Future<Output = Result<(), PubrewardError>> + Send>>;

struct Task {
    name: String,
    future: TaskFuture,
}

pub struct TaskPool {
    tx: mpsc::Sender<Task>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl TaskPool {
    /// Starts `workers` tasks draining a queue of `capacity` entries.
    ///
    /// Workers stop picking up queued tasks once `cancel` fires.
    pub fn start(workers: usize, capacity: usize, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel::<Task>(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));
        let tracker = TaskTracker::new();

        for worker in 0..workers.max(1) {
            let rx = Arc::clone(&rx);
            let cancel = cancel.clone();
            tracker.spawn(async move {
                loop {
                    let next = {
                        let mut rx = rx.lock().await;
                        tokio::select! {
                            _ = cancel.cancelled() => None,
                            task = rx.recv() => task,
                        }
                    };
                    let Some(task) = next else {
                        break;
                    };
                    match task.future.await {
                        Ok(()) => debug!(worker, task = %task.name, "background task finished"),
                        Err(e) => {
                            counter!("pubreward_task_failures_total").increment(1);
                            warn!(worker, task = %task.name, error = %e, "background task failed");
                        }
                    }
                }
                debug!(worker, "task worker stopped");
            });
        }
        tracker.close();
        info!(workers, capacity, "task pool started");

        Self {
            tx,
            tracker,
            cancel,
        }
    }

    /// Queues `future`, failing with `Busy` instead of waiting for room.
    pub fn try_submit<F>(&self, name: impl Into<String>, future: F) -> Result<(), PubrewardError>
    where
        F: Future<Output = Result<(), PubrewardError>> + Send + 'static,
    {
        let name = name.into();
        let task = Task {
            name: name.clone(),
            future: Box::pin(future),
        };
        self.tx.try_send(task).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                PubrewardError::Busy(format!("task queue full, {name} not queued"))
            }
            mpsc::error::TrySendError::Closed(_) => {
                PubrewardError::Cancelled(format!("task pool stopped, {name} not queued"))
            }
        })
    }

    /// Stops the workers and waits for in-flight tasks to finish.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.wait().await;
        info!("task pool stopped");
    }
}
