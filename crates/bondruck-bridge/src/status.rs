// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Status-store seam.
//
// The external configuration store owns the printer records; the bridge
// only writes terminal outcomes back through this trait so operators can
// see printer health without re-testing. `MemoryStatusStore` is the
// in-process implementation used by tests and by embedders that have no
// database wired up yet.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::debug;

use bondruck_core::error::Result;
use bondruck_core::types::{PrinterStatusRecord, StatusUpdate};

/// Persists per-printer connection status.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Apply a status update to the printer's persisted record.
    ///
    /// `error_message` is overwritten unconditionally (a `None` clears
    /// it); the print timestamps are only touched when the update
    /// carries them.
    async fn update_status(&self, printer_id: &str, update: StatusUpdate) -> Result<()>;
}

/// In-memory status store.
#[derive(Default, Clone)]
pub struct MemoryStatusStore {
    records: Arc<Mutex<HashMap<String, PrinterStatusRecord>>>,
}

impl MemoryStatusStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read back a printer's record, if any update has been applied.
    pub fn get(&self, printer_id: &str) -> Option<PrinterStatusRecord> {
        self.records
            .lock()
            .expect("status store lock poisoned")
            .get(printer_id)
            .cloned()
    }
}

#[async_trait]
impl StatusStore for MemoryStatusStore {
    async fn update_status(&self, printer_id: &str, update: StatusUpdate) -> Result<()> {
        let mut records = self.records.lock().expect("status store lock poisoned");
        let record = records.entry(printer_id.to_string()).or_default();

        record.status = Some(update.status);
        record.error_message = update.error_message;
        if update.last_test_print.is_some() {
            record.last_test_print = update.last_test_print;
        }
        if update.last_successful_print.is_some() {
            record.last_successful_print = update.last_successful_print;
        }

        debug!(printer_id, status = ?record.status, "printer status persisted");
        Ok(())
    }
}
