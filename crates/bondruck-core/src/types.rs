// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Bondruck printer bridge.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a print job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of ticket a print job carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TicketType {
    /// Kitchen Order Ticket.
    Kot,
    /// Bar Order Ticket.
    Bot,
    /// Customer bill.
    Billing,
}

impl std::fmt::Display for TicketType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kot => write!(f, "KOT"),
            Self::Bot => write!(f, "BOT"),
            Self::Billing => write!(f, "BILL"),
        }
    }
}

/// Connection health of a configured printer, as persisted by the
/// external configuration store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    Connected,
    Disconnected,
    Error,
}

/// The slice of a persisted printer record the bridge actually reads.
///
/// The external store owns the full record; the bridge consumes the
/// network address and timeout and writes status fields back through
/// the `StatusStore` seam.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterConfig {
    /// Identity in the external configuration store.
    pub id: String,
    /// Operator-facing name ("Kitchen", "Bar", "Front Desk").
    pub name: String,
    /// IP address or hostname.
    pub ip: String,
    /// TCP port, normally 9100.
    pub port: u16,
    /// Paper width in millimetres (58 or 80).
    pub paper_width: u16,
    /// Per-printer connect timeout.
    pub connection_timeout: Duration,
    /// Disabled printers are rejected before any network I/O.
    pub enabled: bool,
}

/// A single print job travelling through the dispatcher.
///
/// `attempts` only ever grows, is bounded by the configured retry cap,
/// and a job sits in the retry queue at most once at any time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrintJob {
    pub id: JobId,
    pub ticket_type: TicketType,
    /// Line-based ticket text, encoded to ESC/POS at dispatch time.
    pub content: String,
    pub printer: PrinterConfig,
    pub created_at: DateTime<Utc>,
    /// Dispatch attempts consumed so far (0 before the first try).
    pub attempts: u32,
}

impl PrintJob {
    pub fn new(ticket_type: TicketType, content: String, printer: PrinterConfig) -> Self {
        Self {
            id: JobId::new(),
            ticket_type,
            content,
            printer,
            created_at: Utc::now(),
            attempts: 0,
        }
    }
}

/// Cached reachability of one host:port, last probe wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrinterEndpoint {
    pub host: String,
    pub port: u16,
    pub is_online: bool,
    pub last_checked: DateTime<Utc>,
}

/// Outcome of a connectivity probe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
    /// Connect latency, only meaningful on success.
    pub response_time_ms: Option<u64>,
}

impl ConnectionTest {
    pub fn ok(message: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            success: true,
            message: message.into(),
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            response_time_ms: None,
        }
    }
}

/// Outcome of a dispatch, as reported to the caller.
///
/// Transient failures (queued for retry) and terminal failures both
/// surface here as `success: false`; the message distinguishes them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchResult {
    pub success: bool,
    pub message: String,
}

impl DispatchResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// A candidate printer found by the subnet sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveredPrinter {
    pub ip: String,
    pub online: bool,
    pub response_time_ms: Option<u64>,
    /// Whether the benign ESC/POS handshake succeeded. Hosts that fail
    /// validation are still reported as potential printers.
    pub validated: bool,
}

/// Status fields the bridge writes back to the configuration store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: ConnectionStatus,
    pub error_message: Option<String>,
    pub last_test_print: Option<DateTime<Utc>>,
    pub last_successful_print: Option<DateTime<Utc>>,
}

impl StatusUpdate {
    /// Terminal success: connected, error cleared, success stamped.
    pub fn connected() -> Self {
        Self {
            status: ConnectionStatus::Connected,
            error_message: None,
            last_test_print: None,
            last_successful_print: Some(Utc::now()),
        }
    }

    /// Terminal failure with the last underlying message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ConnectionStatus::Error,
            error_message: Some(message.into()),
            last_test_print: None,
            last_successful_print: None,
        }
    }

    /// Successful test print: connected and test-print stamped.
    pub fn test_print_ok() -> Self {
        Self {
            last_test_print: Some(Utc::now()),
            ..Self::connected()
        }
    }
}

/// What a status store holds per printer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrinterStatusRecord {
    pub status: Option<ConnectionStatus>,
    pub error_message: Option<String>,
    pub last_test_print: Option<DateTime<Utc>>,
    pub last_successful_print: Option<DateTime<Utc>>,
}

/// Snapshot of one job waiting in the retry queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedJobInfo {
    pub id: JobId,
    pub ticket_type: TicketType,
    pub printer_id: String,
    pub printer_name: String,
    pub attempts: u32,
    pub enqueued_at: DateTime<Utc>,
}

/// Retry-queue introspection, exposed to operators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueStatus {
    pub job_count: usize,
    pub jobs: Vec<QueuedJobInfo>,
}
