use tokio::signal;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Translates SIGINT/SIGTERM into cancellation of a shared token.
#[derive(Debug, Clone)]
pub struct SignalHandler {
    token: CancellationToken,
}

impl SignalHandler {
    /// Start listening in the background. The returned handler's token is
    /// cancelled on the first signal.
    pub fn install(token: CancellationToken) -> Self {
        let handler = Self { token };
        tokio::spawn(Self::listen(handler.token.clone()));
        handler
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    pub async fn wait(&self) {
        self.token.cancelled().await;
    }

    async fn listen(token: CancellationToken) {
        tokio::select! {
            _ = token.cancelled() => return,
            received = Self::next_signal() => {
                if !received {
                    return;
                }
            }
        }
        token.cancel();
    }

    #[cfg(unix)]
    async fn next_signal() -> bool {
        let mut sigterm = match unix_signal(SignalKind::terminate()) {
            Ok(sigterm) => sigterm,
            Err(e) => {
                warn!("Failed to install SIGTERM handler, only SIGINT is handled: {}", e);
                return Self::ctrl_c().await;
            }
        };

        tokio::select! {
            received = Self::ctrl_c() => received,
            _ = sigterm.recv() => {
                info!("Received SIGTERM, initiating graceful shutdown");
                true
            }
        }
    }

    #[cfg(not(unix))]
    async fn next_signal() -> bool {
        Self::ctrl_c().await
    }

    async fn ctrl_c() -> bool {
        match signal::ctrl_c().await {
            Ok(()) => {
                info!("Received SIGINT (Ctrl+C), initiating graceful shutdown");
                true
            }
            Err(err) => {
                error!("Failed to listen for SIGINT: {}", err);
                false
            }
        }
    }
}
