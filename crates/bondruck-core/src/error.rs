// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Bondruck.

use thiserror::Error;

/// Top-level error type for all bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Connect refused, timed out, or reset before any payload moved.
    /// Retriable up to the configured attempt cap.
    #[error("printer unreachable: {0}")]
    Connectivity(String),

    /// Socket error while the ESC/POS payload was in flight.
    /// Retriable, same policy as connectivity failures.
    #[error("protocol write failed: {0}")]
    ProtocolWrite(String),

    /// Missing or disabled printer configuration. Never retried.
    #[error("printer configuration error: {0}")]
    Configuration(String),

    /// The retry cap was reached; carries the last underlying message.
    #[error("gave up after {attempts} attempts: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The retry queue is at its capacity bound.
    #[error("retry queue full ({0} jobs)")]
    QueueFull(usize),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the dispatcher may re-queue a job that failed with this
    /// error. Only network-level failures qualify; configuration and
    /// capacity errors surface to the caller immediately.
    pub fn is_retriable(&self) -> bool {
        match self {
            Self::Connectivity(_) | Self::ProtocolWrite(_) => true,
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut
                    | std::io::ErrorKind::ConnectionRefused
                    | std::io::ErrorKind::ConnectionReset
                    | std::io::ErrorKind::ConnectionAborted
                    | std::io::ErrorKind::BrokenPipe
                    | std::io::ErrorKind::Interrupted
            ),
            Self::Configuration(_) | Self::RetriesExhausted { .. } | Self::QueueFull(_) => false,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BridgeError>;
