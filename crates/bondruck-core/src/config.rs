// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bridge configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Tunable settings for the printer bridge.
///
/// Every socket operation the bridge performs is bounded by one of the
/// timeouts here; there is no unbounded network wait anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Raw print port (HP JetDirect convention).
    pub printer_port: u16,
    /// Ports tried by the diagnostic sweep, in order.
    pub diagnostic_ports: Vec<u16>,
    /// Connect timeout for explicit connectivity tests.
    pub probe_timeout: Duration,
    /// Shorter connect timeout used during the subnet sweep.
    pub discovery_timeout: Duration,
    /// First host suffix probed by discovery (inclusive).
    pub scan_suffix_start: u8,
    /// Last host suffix probed by discovery (inclusive).
    pub scan_suffix_end: u8,
    /// Maximum concurrent discovery probes.
    pub scan_concurrency: usize,
    /// Whether discovery sends a benign ESC/POS initialize to weed out
    /// unrelated services listening on the print port.
    pub validate_candidates: bool,
    /// Retries allowed beyond the first dispatch attempt.
    pub max_retries: u32,
    /// Delay before a queued job is re-dispatched.
    pub retry_delay: Duration,
    /// Wait after the payload is written, letting buffered bytes reach
    /// the device before the socket is torn down. The wire protocol has
    /// no acknowledgment, so this heuristic is all there is.
    pub settle_delay: Duration,
    /// Retry-queue capacity; enqueue fails once this many jobs wait.
    pub max_queued_jobs: usize,
    /// Endpoint-cache capacity; the stalest entry is evicted beyond it.
    pub max_cached_endpoints: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            printer_port: 9100,
            diagnostic_ports: vec![9100, 515, 631, 80, 443, 8080],
            probe_timeout: Duration::from_secs(2),
            discovery_timeout: Duration::from_secs(1),
            scan_suffix_start: 100,
            scan_suffix_end: 120,
            scan_concurrency: 16,
            validate_candidates: true,
            max_retries: 3,
            retry_delay: Duration::from_secs(5),
            settle_delay: Duration::from_millis(500),
            max_queued_jobs: 64,
            max_cached_endpoints: 256,
        }
    }
}
