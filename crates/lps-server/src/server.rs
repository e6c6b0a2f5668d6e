use tokio::net::TcpListener;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// LPS payload server.
pub struct LpsServer {
    config: ServerConfig,
    state: AppState,
}

impl LpsServer {
    /// Server over in-memory stores.
    pub fn new(config: ServerConfig) -> ServerResult<Self> {
        let state = AppState::in_memory(&config)?;
        Ok(Self::with_state(config, state))
    }

    pub fn with_state(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }

    /// Start serving requests until Ctrl-C.
    ///
    /// In-flight calls observe cancellation once shutdown begins.
    pub async fn serve(self) -> ServerResult<()> {
        let app = self.router();
        let shutdown = self.state.shutdown.clone();
        let listener = TcpListener::bind(&self.config.bind_addr).await?;
        tracing::info!(
            addr = %self.config.bind_addr,
            signing_key = ?self
                .state
                .keys
                .server
                .as_ref()
                .map(|k| k.verifying_key().fingerprint()),
            "LPS server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "failed to listen for shutdown signal");
                    std::future::pending::<()>().await;
                }
                tracing::info!("shutdown requested");
                shutdown.cancel();
            })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))
    }
}
