// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Active subnet discovery for ESC/POS printers.
//
// Thermal receipt printers rarely announce themselves, so discovery is a
// bounded TCP sweep of a host-suffix range on the raw print port. The
// fan-out is limited by a semaphore to keep descriptor usage flat on
// large ranges. Reachable hosts may additionally be validated with a
// benign ESC/POS initialize write; hosts that fail validation are still
// reported as potential printers, just unvalidated.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::AsyncWriteExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use bondruck_core::config::BridgeConfig;
use bondruck_core::types::DiscoveredPrinter;

use crate::escpos;
use crate::transport::Connector;

/// Sweeps a subnet range for candidate printers.
#[derive(Clone)]
pub struct NetworkScanner {
    connector: Arc<dyn Connector>,
    config: BridgeConfig,
}

impl NetworkScanner {
    pub fn new(connector: Arc<dyn Connector>, config: BridgeConfig) -> Self {
        Self { connector, config }
    }

    /// Probe `prefix.{start..=end}` on the print port and return every
    /// reachable host, ordered by host suffix.
    ///
    /// All probes run concurrently under `scan_concurrency` permits; the
    /// call resolves once every probe has settled. Unreachable hosts are
    /// an expected negative result and are silently excluded.
    pub async fn discover(&self, subnet_prefix: &str) -> Vec<DiscoveredPrinter> {
        let port = self.config.printer_port;
        let timeout = self.config.discovery_timeout;
        let validate = self.config.validate_candidates;
        let semaphore = Arc::new(Semaphore::new(self.config.scan_concurrency.max(1)));

        info!(
            prefix = subnet_prefix,
            start = self.config.scan_suffix_start,
            end = self.config.scan_suffix_end,
            port,
            "starting printer discovery sweep"
        );

        let mut tasks = JoinSet::new();
        for suffix in self.config.scan_suffix_start..=self.config.scan_suffix_end {
            let host = format!("{subnet_prefix}.{suffix}");
            let connector = Arc::clone(&self.connector);
            let semaphore = Arc::clone(&semaphore);

            tasks.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("discovery semaphore closed");

                let started = Instant::now();
                let mut stream = match connector.connect(&host, port, timeout).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        debug!(host = %host, error = %e, "host not reachable");
                        return None;
                    }
                };
                let response_time_ms = started.elapsed().as_millis() as u64;

                let validated = if validate {
                    // A real ESC/POS device swallows the initialize command
                    // without closing the socket; anything else sharing the
                    // port tends to error or hang.
                    let handshake = tokio::time::timeout(timeout, async {
                        stream.write_all(&escpos::INIT).await?;
                        stream.flush().await
                    })
                    .await;

                    match handshake {
                        Ok(Ok(())) => true,
                        Ok(Err(e)) => {
                            warn!(host = %host, error = %e, "candidate failed ESC/POS validation");
                            false
                        }
                        Err(_) => {
                            warn!(host = %host, "candidate timed out during ESC/POS validation");
                            false
                        }
                    }
                } else {
                    true
                };

                info!(host = %host, response_time_ms, validated, "printer candidate found");
                Some((
                    suffix,
                    DiscoveredPrinter {
                        ip: host,
                        online: true,
                        response_time_ms: Some(response_time_ms),
                        validated,
                    },
                ))
            });
        }

        let mut found = Vec::new();
        while let Some(settled) = tasks.join_next().await {
            match settled {
                Ok(Some(candidate)) => found.push(candidate),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "discovery probe task failed"),
            }
        }

        found.sort_by_key(|(suffix, _)| *suffix);
        let printers: Vec<DiscoveredPrinter> =
            found.into_iter().map(|(_, printer)| printer).collect();

        info!(count = printers.len(), "discovery sweep complete");
        printers
    }
}
