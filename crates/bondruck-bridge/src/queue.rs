// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory retry queue.
//
// Failed jobs wait here for one fixed-delay re-dispatch. The table is
// keyed by job id (a job is present at most once), capacity-bounded, and
// every entry owns the `JoinHandle` of its one-shot timer so a queued
// retry can be cancelled cleanly — e.g. when the owning printer
// configuration is deleted mid-retry. Nothing is persisted: the system
// of record is the external configuration store, and a process restart
// legitimately empties the queue.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use bondruck_core::config::BridgeConfig;
use bondruck_core::error::{BridgeError, Result};
use bondruck_core::types::{JobId, PrintJob, QueueStatus, QueuedJobInfo};

use crate::dispatch::JobDispatcher;

/// One queued job plus its scheduled re-dispatch.
struct QueuedJob {
    job: PrintJob,
    info: QueuedJobInfo,
    timer: JoinHandle<()>,
}

/// Holds failed jobs between dispatch attempts.
pub struct RetryQueue {
    table: Mutex<HashMap<JobId, QueuedJob>>,
    capacity: usize,
    retry_delay: Duration,
}

impl RetryQueue {
    pub fn new(config: &BridgeConfig) -> Self {
        Self {
            table: Mutex::new(HashMap::new()),
            capacity: config.max_queued_jobs,
            retry_delay: config.retry_delay,
        }
    }

    /// Store a job and schedule one delayed re-dispatch.
    ///
    /// Re-enqueueing an id that is already queued replaces the entry and
    /// cancels its old timer, preserving the at-most-once invariant.
    /// Fails with `QueueFull` at the capacity bound.
    pub fn enqueue(self: &Arc<Self>, job: PrintJob, dispatcher: Arc<JobDispatcher>) -> Result<()> {
        let id = job.id;
        let info = QueuedJobInfo {
            id,
            ticket_type: job.ticket_type,
            printer_id: job.printer.id.clone(),
            printer_name: job.printer.name.clone(),
            attempts: job.attempts,
            enqueued_at: Utc::now(),
        };

        let mut table = self.table.lock().expect("retry queue lock poisoned");
        if let Some(previous) = table.remove(&id) {
            debug!(job_id = %id, "replacing queued job, cancelling old timer");
            previous.timer.abort();
        } else if table.len() >= self.capacity {
            warn!(job_id = %id, capacity = self.capacity, "retry queue full, rejecting job");
            return Err(BridgeError::QueueFull(self.capacity));
        }

        let timer = tokio::spawn({
            let queue = Arc::clone(self);
            let delay = self.retry_delay;
            async move {
                tokio::time::sleep(delay).await;
                // Gone means cancelled in the meantime.
                let Some(job) = queue.take(id) else {
                    return;
                };
                debug!(job_id = %id, attempt = job.attempts, "retry timer fired");
                let _ = dispatcher.dispatch(job).await;
            }
        });

        info!(
            job_id = %id,
            attempt = info.attempts,
            delay_ms = self.retry_delay.as_millis(),
            "job queued for retry"
        );
        table.insert(id, QueuedJob { job, info, timer });
        Ok(())
    }

    /// Remove a job, cancelling its pending timer. Idempotent.
    pub fn remove(&self, id: JobId) {
        let mut table = self.table.lock().expect("retry queue lock poisoned");
        if let Some(entry) = table.remove(&id) {
            entry.timer.abort();
            debug!(job_id = %id, "job removed from retry queue");
        }
    }

    /// Cancel every queued job belonging to a printer configuration.
    ///
    /// Returns the number of jobs dropped.
    pub fn cancel_for_printer(&self, printer_id: &str) -> usize {
        let mut table = self.table.lock().expect("retry queue lock poisoned");
        let ids: Vec<JobId> = table
            .iter()
            .filter(|(_, entry)| entry.info.printer_id == printer_id)
            .map(|(id, _)| *id)
            .collect();

        for id in &ids {
            if let Some(entry) = table.remove(id) {
                entry.timer.abort();
            }
        }

        if !ids.is_empty() {
            info!(printer_id, dropped = ids.len(), "cancelled queued jobs for printer");
        }
        ids.len()
    }

    /// Immediately re-dispatch every queued job instead of waiting for
    /// its timer. A job already at the retry cap is still dispatched:
    /// that dispatch fails terminally and persists the error status,
    /// rather than leaving the job to vanish silently.
    ///
    /// Returns the number of jobs re-dispatched.
    pub async fn process_retries(self: &Arc<Self>, dispatcher: &Arc<JobDispatcher>) -> usize {
        let drained: Vec<PrintJob> = {
            let mut table = self.table.lock().expect("retry queue lock poisoned");
            table
                .drain()
                .map(|(_, entry)| {
                    entry.timer.abort();
                    entry.job
                })
                .collect()
        };

        let count = drained.len();
        for job in drained {
            let _ = dispatcher.dispatch(job).await;
        }
        count
    }

    /// Take a job out of the table without touching its timer handle.
    /// Used by the timer task itself when it fires.
    fn take(&self, id: JobId) -> Option<PrintJob> {
        self.table
            .lock()
            .expect("retry queue lock poisoned")
            .remove(&id)
            .map(|entry| entry.job)
    }

    /// Whether a job is currently queued.
    pub fn contains(&self, id: JobId) -> bool {
        self.table
            .lock()
            .expect("retry queue lock poisoned")
            .contains_key(&id)
    }

    /// Introspection snapshot for operators.
    pub fn status(&self) -> QueueStatus {
        let table = self.table.lock().expect("retry queue lock poisoned");
        let mut jobs: Vec<QueuedJobInfo> = table.values().map(|e| e.info.clone()).collect();
        jobs.sort_by_key(|info| info.enqueued_at);
        QueueStatus {
            job_count: jobs.len(),
            jobs,
        }
    }
}
