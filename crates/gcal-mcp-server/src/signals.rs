//! Shutdown signalling for the transports.
//!
//! SIGTERM and SIGINT (Ctrl+C elsewhere) flip a watch channel; the stdio
//! loop and the SSE server both wait on it.

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Listens for termination signals and fans them out.
pub struct SignalHandler {
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
}

impl Default for SignalHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl SignalHandler {
    pub fn new() -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
        }
    }

    /// Spawns the signal listener task.
    ///
    /// If a handler cannot be installed the failure is logged and only the
    /// remaining signals (or programmatic triggers) end the server.
    #[cfg(unix)]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!(error = %e, "cannot install SIGTERM handler");
                    None
                }
            };

            tokio::select! {
                _ = async {
                    match sigterm.as_mut() {
                        Some(s) => { s.recv().await; }
                        None => std::future::pending::<()>().await,
                    }
                } => info!("received SIGTERM, shutting down"),
                result = tokio::signal::ctrl_c() => match result {
                    Ok(()) => info!("received SIGINT, shutting down"),
                    Err(e) => {
                        warn!(error = %e, "cannot listen for SIGINT");
                        return;
                    }
                },
            }

            let _ = shutdown_tx.send(true);
            debug!("signal listener stopped");
        });
    }

    #[cfg(not(unix))]
    pub fn spawn_listener(&self) {
        let shutdown_tx = self.shutdown_tx.clone();

        tokio::spawn(async move {
            if let Ok(()) = tokio::signal::ctrl_c().await {
                info!("received Ctrl+C, shutting down");
                let _ = shutdown_tx.send(true);
            }
        });
    }

    /// Returns true if shutdown has been signaled.
    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Programmatically triggers a shutdown.
    pub fn trigger_shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Creates a handle that can be moved into other tasks.
    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: self.shutdown_tx.clone(),
            rx: self.shutdown_rx.clone(),
        }
    }
}

/// A handle for triggering or awaiting shutdown.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl ShutdownHandle {
    pub fn trigger(&self) {
        let _ = self.tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Completes once shutdown has been triggered.
    ///
    /// Also completes if every sender is gone, since nothing can trigger it
    /// any more.
    pub async fn wait(&self) {
        let mut rx = self.rx.clone();
        let _ = rx.wait_for(|stop| *stop).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_sets_flag() {
        let handler = SignalHandler::new();
        assert!(!handler.is_shutdown());

        handler.trigger_shutdown();
        assert!(handler.is_shutdown());
        assert!(handler.shutdown_handle().is_shutdown());
    }

    #[tokio::test]
    async fn handle_wait_completes_after_trigger() {
        let handler = SignalHandler::new();
        let handle = handler.shutdown_handle();

        let waiter = handle.clone();
        let task = tokio::spawn(async move {
            waiter.wait().await;
            true
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.trigger();

        let result = tokio::time::timeout(Duration::from_millis(200), task).await;
        assert!(result.unwrap().unwrap());
        assert!(handler.is_shutdown());
    }

    #[tokio::test]
    async fn wait_returns_immediately_when_already_triggered() {
        let handler = SignalHandler::new();
        handler.trigger_shutdown();

        let handle = handler.shutdown_handle();
        tokio::time::timeout(Duration::from_millis(50), handle.wait())
            .await
            .unwrap();
    }
}
