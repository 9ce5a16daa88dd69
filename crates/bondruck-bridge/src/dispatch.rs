// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Job dispatcher.
//
// One dispatch is: probe the printer, encode the ticket, open a socket,
// write the payload, wait the settle delay, close. Network failures are
// re-queued up to the retry cap; the caller sees a transient "queued for
// retry" result until the cap is reached. Terminal outcomes — success or
// exhaustion — are persisted through the status store so operators can
// see printer health without re-testing.

use std::sync::Arc;

use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use bondruck_core::config::BridgeConfig;
use bondruck_core::error::{BridgeError, Result};
use bondruck_core::types::{DispatchResult, PrintJob, StatusUpdate};

use crate::escpos;
use crate::probe::ConnectivityProbe;
use crate::queue::RetryQueue;
use crate::status::StatusStore;
use crate::transport::Connector;

/// Orchestrates probe → format → write → status update for print jobs.
pub struct JobDispatcher {
    connector: Arc<dyn Connector>,
    probe: ConnectivityProbe,
    status: Arc<dyn StatusStore>,
    queue: Arc<RetryQueue>,
    config: BridgeConfig,
}

impl JobDispatcher {
    pub fn new(
        connector: Arc<dyn Connector>,
        probe: ConnectivityProbe,
        status: Arc<dyn StatusStore>,
        queue: Arc<RetryQueue>,
        config: BridgeConfig,
    ) -> Self {
        Self {
            connector,
            probe,
            status,
            queue,
            config,
        }
    }

    /// Attempt one dispatch of `job`.
    ///
    /// The job's `attempts` counter only counts failed attempts that were
    /// re-queued, so a job sees at most `max_retries + 1` dispatches in
    /// its lifetime.
    pub async fn dispatch(self: &Arc<Self>, job: PrintJob) -> DispatchResult {
        if !job.printer.enabled {
            // Configuration errors bypass the retry path and leave the
            // persisted status alone: the record may be mid-deletion.
            let err = BridgeError::Configuration(format!(
                "printer '{}' is disabled",
                job.printer.name
            ));
            warn!(job_id = %job.id, printer = %job.printer.name, "rejecting job: {err}");
            return DispatchResult::failed(err.to_string());
        }

        let reachable = self
            .probe
            .test_connection(
                &job.printer.ip,
                job.printer.port,
                job.printer.connection_timeout,
            )
            .await;
        if !reachable.success {
            return self.handle_network_failure(job, reachable.message).await;
        }

        let payload = escpos::format(&job.content, job.printer.paper_width);
        debug!(
            job_id = %job.id,
            bytes = payload.len(),
            ticket = %job.ticket_type,
            "ticket encoded, transmitting"
        );

        match self.transmit(&job, &payload).await {
            Ok(()) => {
                self.queue.remove(job.id);
                if let Err(e) = self
                    .status
                    .update_status(&job.printer.id, StatusUpdate::connected())
                    .await
                {
                    warn!(printer_id = %job.printer.id, error = %e, "status write failed");
                }
                info!(
                    job_id = %job.id,
                    printer = %job.printer.name,
                    bytes = payload.len(),
                    "ticket printed"
                );
                DispatchResult::ok(format!(
                    "{} ticket sent to {} ({} bytes)",
                    job.ticket_type,
                    job.printer.name,
                    payload.len()
                ))
            }
            Err(e) => self.handle_network_failure(job, e.to_string()).await,
        }
    }

    /// Shared policy for unreachable printers and mid-transfer errors:
    /// re-queue while attempts remain, otherwise fail terminally.
    async fn handle_network_failure(
        self: &Arc<Self>,
        mut job: PrintJob,
        reason: String,
    ) -> DispatchResult {
        if job.attempts < self.config.max_retries {
            job.attempts += 1;
            let attempt = job.attempts;
            let printer_id = job.printer.id.clone();

            match self.queue.enqueue(job, Arc::clone(self)) {
                Ok(()) => DispatchResult::failed(format!(
                    "print failed, queued for retry {attempt} of {}: {reason}",
                    self.config.max_retries
                )),
                Err(e) => {
                    // Queue full is terminal; persist like exhaustion.
                    warn!(printer_id = %printer_id, error = %e, "could not queue retry");
                    self.persist_error(&printer_id, &reason).await;
                    DispatchResult::failed(format!("{e}; {reason}"))
                }
            }
        } else {
            let exhausted = BridgeError::RetriesExhausted {
                attempts: job.attempts + 1,
                last_error: reason.clone(),
            };
            warn!(job_id = %job.id, printer = %job.printer.name, "{exhausted}");
            self.queue.remove(job.id);
            self.persist_error(&job.printer.id, &reason).await;
            DispatchResult::failed(exhausted.to_string())
        }
    }

    async fn persist_error(&self, printer_id: &str, reason: &str) {
        if let Err(e) = self
            .status
            .update_status(printer_id, StatusUpdate::error(reason))
            .await
        {
            warn!(printer_id, error = %e, "status write failed");
        }
    }

    /// Open, write, settle, close. The stream is owned by this function
    /// and dropped on every exit path, so the socket is destroyed exactly
    /// once whether the write succeeds or dies mid-transfer.
    async fn transmit(&self, job: &PrintJob, payload: &[u8]) -> Result<()> {
        let mut stream = self
            .connector
            .connect(
                &job.printer.ip,
                job.printer.port,
                job.printer.connection_timeout,
            )
            .await?;

        stream
            .write_all(payload)
            .await
            .map_err(|e| BridgeError::ProtocolWrite(format!("send failed: {e}")))?;
        stream
            .flush()
            .await
            .map_err(|e| BridgeError::ProtocolWrite(format!("flush failed: {e}")))?;

        // No application-level ACK exists; give buffered bytes a moment
        // to reach the device before tearing the connection down.
        tokio::time::sleep(self.config.settle_delay).await;

        stream
            .shutdown()
            .await
            .map_err(|e| BridgeError::ProtocolWrite(format!("shutdown failed: {e}")))?;
        Ok(())
    }
}
