// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Socket transport seam.
//
// Everything above this module talks to printers through the `Connector`
// trait, so the probe, scanner, and dispatcher can be exercised against
// fake transports in tests. Sockets are single-use: connected, written,
// dropped. Ownership guarantees the stream is destroyed exactly once on
// every exit path.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio::net::TcpStream;
use tracing::debug;

use bondruck_core::error::{BridgeError, Result};

/// A connected, write-only printer stream.
pub type BoxedStream = Box<dyn AsyncWrite + Send + Unpin>;

/// Opens TCP connections to printers.
///
/// Every connect carries a mandatory timeout; implementations must never
/// wait unboundedly.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<BoxedStream>;
}

/// Production connector backed by `tokio::net::TcpStream`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<BoxedStream> {
        let addr = format!("{host}:{port}");
        debug!(addr = %addr, timeout_ms = timeout.as_millis(), "connecting");

        let stream = tokio::time::timeout(timeout, TcpStream::connect(&addr))
            .await
            .map_err(|_| {
                BridgeError::Connectivity(format!(
                    "connection to {addr} timeout after {}ms",
                    timeout.as_millis()
                ))
            })?
            .map_err(|e| BridgeError::Connectivity(format!("connect to {addr}: {e}")))?;

        Ok(Box::new(stream))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fake connectors shared by the probe, discovery, and dispatch tests.

    use std::collections::HashSet;
    use std::pin::Pin;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::task::{Context, Poll};

    use super::*;

    /// Write sink that counts how many times it is destroyed.
    ///
    /// Backs the resource-safety tests: exactly one destroy per connect,
    /// on every ordering of success/error/timeout.
    pub struct CountingStream {
        drops: Arc<AtomicUsize>,
        /// Fail the write after this many bytes have been accepted.
        fail_after: Option<usize>,
        written: usize,
        pub sink: Arc<std::sync::Mutex<Vec<u8>>>,
    }

    impl Drop for CountingStream {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    impl AsyncWrite for CountingStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            if let Some(limit) = self.fail_after {
                if self.written + buf.len() > limit {
                    return Poll::Ready(Err(std::io::Error::new(
                        std::io::ErrorKind::BrokenPipe,
                        "broken pipe mid-transfer",
                    )));
                }
            }
            self.written += buf.len();
            self.sink.lock().unwrap().extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    /// How a `FakeConnector` treats one target host.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum FakeBehaviour {
        /// Connect succeeds, writes are accepted.
        Accept,
        /// Connect fails immediately (refused).
        Refuse,
        /// Connect never completes; the caller's timeout fires.
        Hang,
        /// Connect succeeds but the stream errors mid-write.
        FailMidWrite(usize),
    }

    /// Scripted connector for tests.
    pub struct FakeConnector {
        /// Hosts that accept, everything else refuses.
        accepting: HashSet<String>,
        behaviour: FakeBehaviour,
        pub connects: AtomicUsize,
        pub drops: Arc<AtomicUsize>,
        pub sink: Arc<std::sync::Mutex<Vec<u8>>>,
    }

    impl FakeConnector {
        /// Connector where every host behaves the same way.
        pub fn uniform(behaviour: FakeBehaviour) -> Self {
            Self {
                accepting: HashSet::new(),
                behaviour,
                connects: AtomicUsize::new(0),
                drops: Arc::new(AtomicUsize::new(0)),
                sink: Arc::new(std::sync::Mutex::new(Vec::new())),
            }
        }

        /// Connector where only the listed hosts accept.
        pub fn accepting_only(hosts: &[&str]) -> Self {
            Self {
                accepting: hosts.iter().map(|h| h.to_string()).collect(),
                behaviour: FakeBehaviour::Accept,
                connects: AtomicUsize::new(0),
                drops: Arc::new(AtomicUsize::new(0)),
                sink: Arc::new(std::sync::Mutex::new(Vec::new())),
            }
        }

        pub fn connect_count(&self) -> usize {
            self.connects.load(Ordering::SeqCst)
        }

        pub fn drop_count(&self) -> usize {
            self.drops.load(Ordering::SeqCst)
        }

        pub fn written(&self) -> Vec<u8> {
            self.sink.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connector for FakeConnector {
        async fn connect(&self, host: &str, port: u16, timeout: Duration) -> Result<BoxedStream> {
            self.connects.fetch_add(1, Ordering::SeqCst);

            let behaviour = if self.accepting.is_empty() || self.accepting.contains(host) {
                self.behaviour
            } else {
                FakeBehaviour::Refuse
            };

            match behaviour {
                FakeBehaviour::Refuse => Err(BridgeError::Connectivity(format!(
                    "connect to {host}:{port}: connection refused"
                ))),
                FakeBehaviour::Hang => {
                    // Same shape as the production path: a connect that
                    // never answers is cut off by the timeout wrapper.
                    let pending = std::future::pending::<std::convert::Infallible>();
                    match tokio::time::timeout(timeout, pending).await {
                        Ok(never) => match never {},
                        Err(_) => Err(BridgeError::Connectivity(format!(
                            "connection to {host}:{port} timeout after {}ms",
                            timeout.as_millis()
                        ))),
                    }
                }
                FakeBehaviour::Accept => Ok(Box::new(CountingStream {
                    drops: Arc::clone(&self.drops),
                    fail_after: None,
                    written: 0,
                    sink: Arc::clone(&self.sink),
                })),
                FakeBehaviour::FailMidWrite(limit) => Ok(Box::new(CountingStream {
                    drops: Arc::clone(&self.drops),
                    fail_after: Some(limit),
                    written: 0,
                    sink: Arc::clone(&self.sink),
                })),
            }
        }
    }
}
