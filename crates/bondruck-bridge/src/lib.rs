// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bondruck Bridge — ESC/POS content formatting, LAN printer discovery,
// connectivity probing, and retry-queued job dispatch. This crate bridges
// between the core domain types defined in `bondruck-core` and the actual
// thermal printers on the network.

pub mod bridge;
pub mod discovery;
pub mod dispatch;
pub mod escpos;
pub mod probe;
pub mod queue;
pub mod status;
pub mod transport;

pub use bridge::PrinterBridge;
pub use discovery::NetworkScanner;
pub use dispatch::JobDispatcher;
pub use probe::ConnectivityProbe;
pub use queue::RetryQueue;
pub use status::{MemoryStatusStore, StatusStore};
pub use transport::{Connector, TcpConnector};
