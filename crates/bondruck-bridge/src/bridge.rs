// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The public face of the printer bridge.
//
// An explicitly constructed object — callers build one (typically behind
// an `Arc`) and inject it wherever printing is triggered; there is no
// module-level singleton. The HTTP routes, billing logic, and the
// relational store all live outside this crate and talk to it through
// these methods and the `StatusStore` seam.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use bondruck_core::config::BridgeConfig;
use bondruck_core::types::{
    ConnectionTest, DiscoveredPrinter, DispatchResult, PrintJob, PrinterConfig, PrinterEndpoint,
    QueueStatus, StatusUpdate, TicketType,
};

use crate::discovery::NetworkScanner;
use crate::dispatch::JobDispatcher;
use crate::probe::ConnectivityProbe;
use crate::queue::RetryQueue;
use crate::status::StatusStore;
use crate::transport::{Connector, TcpConnector};

/// Content of the ticket printed by [`PrinterBridge::test_print`].
const TEST_TICKET: &str = "\
====================\n\
Printer Test\n\
If you can read this, the printer bridge is talking to this device.\n\
====================\n";

/// LAN printer bridge: discovery, probing, ESC/POS dispatch, retries.
pub struct PrinterBridge {
    config: BridgeConfig,
    probe: ConnectivityProbe,
    scanner: NetworkScanner,
    dispatcher: Arc<JobDispatcher>,
    queue: Arc<RetryQueue>,
    status: Arc<dyn StatusStore>,
}

impl PrinterBridge {
    /// Build a bridge over real TCP sockets.
    pub fn new(config: BridgeConfig, status: Arc<dyn StatusStore>) -> Self {
        Self::with_connector(config, status, Arc::new(TcpConnector))
    }

    /// Build a bridge over a custom transport (used by tests and by
    /// embedders with exotic network setups).
    pub fn with_connector(
        config: BridgeConfig,
        status: Arc<dyn StatusStore>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let probe = ConnectivityProbe::new(Arc::clone(&connector), config.max_cached_endpoints);
        let scanner = NetworkScanner::new(Arc::clone(&connector), config.clone());
        let queue = Arc::new(RetryQueue::new(&config));
        let dispatcher = Arc::new(JobDispatcher::new(
            connector,
            probe.clone(),
            Arc::clone(&status),
            Arc::clone(&queue),
            config.clone(),
        ));

        Self {
            config,
            probe,
            scanner,
            dispatcher,
            queue,
            status,
        }
    }

    /// Print a ticket on the given printer.
    ///
    /// Returns once the first attempt settles: either the ticket went
    /// out, or it was queued for retry, or it failed terminally. Retries
    /// run in the background on a fixed delay.
    pub async fn submit_print_job(
        &self,
        ticket_type: TicketType,
        content: impl Into<String>,
        printer: PrinterConfig,
    ) -> DispatchResult {
        let job = PrintJob::new(ticket_type, content.into(), printer);
        info!(job_id = %job.id, ticket = %job.ticket_type, printer = %job.printer.name, "print job submitted");
        self.dispatcher.dispatch(job).await
    }

    /// Send a small test ticket and stamp `last_test_print` on success.
    pub async fn test_print(&self, printer: PrinterConfig) -> DispatchResult {
        let printer_id = printer.id.clone();
        let result = self
            .submit_print_job(TicketType::Billing, TEST_TICKET, printer)
            .await;

        if result.success {
            if let Err(e) = self
                .status
                .update_status(&printer_id, StatusUpdate::test_print_ok())
                .await
            {
                tracing::warn!(printer_id = %printer_id, error = %e, "status write failed");
            }
        }
        result
    }

    /// Test TCP reachability of an arbitrary host and port.
    pub async fn test_connectivity(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> ConnectionTest {
        self.probe.test_connection(host, port, timeout).await
    }

    /// Diagnostic sweep over the well-known print service ports.
    pub async fn diagnose_ports(&self, host: &str) -> ConnectionTest {
        self.probe
            .test_multi_port(host, &self.config.diagnostic_ports, self.config.probe_timeout)
            .await
    }

    /// Sweep the configured suffix range of a subnet for printers.
    pub async fn discover_printers(&self, subnet_prefix: &str) -> Vec<DiscoveredPrinter> {
        self.scanner.discover(subnet_prefix).await
    }

    /// Retry-queue introspection.
    pub fn queue_status(&self) -> QueueStatus {
        self.queue.status()
    }

    /// Immediately re-dispatch everything waiting in the retry queue.
    pub async fn process_retries(&self) -> usize {
        self.queue.process_retries(&self.dispatcher).await
    }

    /// Drop every queued retry for a printer configuration, cancelling
    /// its timers. Call this when the configuration is deleted.
    pub fn cancel_jobs_for_printer(&self, printer_id: &str) -> usize {
        self.queue.cancel_for_printer(printer_id)
    }

    /// Snapshot of the reachability cache.
    pub fn endpoints(&self) -> Vec<PrinterEndpoint> {
        self.probe.endpoints()
    }
}
