// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Connectivity probe.
//
// A probe is one TCP connect with a mandatory timeout; the socket is
// dropped as soon as the result is known. Every probe result lands in a
// shared endpoint cache (last probe wins) so operators can read recent
// reachability without re-testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use bondruck_core::types::{ConnectionTest, PrinterEndpoint};

use crate::transport::Connector;

/// Tests TCP reachability of printer endpoints and caches the results.
#[derive(Clone)]
pub struct ConnectivityProbe {
    connector: Arc<dyn Connector>,
    /// Endpoint cache keyed by `host:port`. Bounded; the stalest entry
    /// is evicted when the cap is hit.
    cache: Arc<Mutex<HashMap<String, PrinterEndpoint>>>,
    max_entries: usize,
}

impl ConnectivityProbe {
    pub fn new(connector: Arc<dyn Connector>, max_entries: usize) -> Self {
        Self {
            connector,
            cache: Arc::new(Mutex::new(HashMap::new())),
            max_entries,
        }
    }

    /// Test whether `host:port` accepts a TCP connection within `timeout`.
    ///
    /// The connection is closed immediately after the result is known;
    /// probes never hold sockets open.
    pub async fn test_connection(
        &self,
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> ConnectionTest {
        let started = Instant::now();
        let outcome = self.connector.connect(host, port, timeout).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let result = match outcome {
            Ok(stream) => {
                // Connect is the whole test; drop the socket right away.
                drop(stream);
                debug!(host, port, elapsed_ms, "printer reachable");
                ConnectionTest::ok(format!("connected to {host}:{port} in {elapsed_ms}ms"), elapsed_ms)
            }
            Err(e) => {
                debug!(host, port, error = %e, "printer unreachable");
                ConnectionTest::failed(e.to_string())
            }
        };

        self.record(host, port, result.success);
        result
    }

    /// Try candidate ports in order, short-circuiting on the first that
    /// accepts. If none do, the aggregate failure names every port tried.
    pub async fn test_multi_port(
        &self,
        host: &str,
        ports: &[u16],
        timeout: Duration,
    ) -> ConnectionTest {
        for &port in ports {
            let result = self.test_connection(host, port, timeout).await;
            if result.success {
                info!(host, port, "multi-port probe found open port");
                return result;
            }
        }

        let tried = ports
            .iter()
            .map(|p| p.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        warn!(host, ports = %tried, "no reachable port on host");
        ConnectionTest::failed(format!("{host} unreachable on all tried ports: {tried}"))
    }

    /// Snapshot of every cached endpoint.
    pub fn endpoints(&self) -> Vec<PrinterEndpoint> {
        self.cache
            .lock()
            .expect("endpoint cache lock poisoned")
            .values()
            .cloned()
            .collect()
    }

    /// Cached state of one endpoint, if it has been probed.
    pub fn endpoint(&self, host: &str, port: u16) -> Option<PrinterEndpoint> {
        self.cache
            .lock()
            .expect("endpoint cache lock poisoned")
            .get(&cache_key(host, port))
            .cloned()
    }

    /// Write a probe outcome into the cache, evicting the stalest entry
    /// if the cap is reached.
    fn record(&self, host: &str, port: u16, is_online: bool) {
        let mut cache = self.cache.lock().expect("endpoint cache lock poisoned");
        let key = cache_key(host, port);

        if !cache.contains_key(&key) && cache.len() >= self.max_entries {
            if let Some(stalest) = cache
                .iter()
                .min_by_key(|(_, e)| e.last_checked)
                .map(|(k, _)| k.clone())
            {
                debug!(evicted = %stalest, "endpoint cache full, evicting stalest entry");
                cache.remove(&stalest);
            }
        }

        cache.insert(
            key,
            PrinterEndpoint {
                host: host.to_string(),
                port,
                is_online,
                last_checked: Utc::now(),
            },
        );
    }
}

fn cache_key(host: &str, port: u16) -> String {
    format!("{host}:{port}")
}
