//! Application startup and lifecycle management.

use crate::config::SummarizeConfig;
use crate::services::providers::{ChatProvider, OpenAiChatProvider, OpenAiProviderConfig};
use crate::services::{metrics, Database, QuotaStore, TokenVerifier};
use crate::{build_router, AppState};
use service_core::error::AppError;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;

/// Application container for managing server lifecycle.
pub struct Application {
    port: u16,
    listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Wire up the real collaborators from configuration.
    ///
    /// Fails fast: an unreachable store or incomplete configuration stops
    /// startup instead of failing lazily per request.
    pub async fn build(config: SummarizeConfig) -> Result<Self, AppError> {
        metrics::init_metrics();

        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            e
        })?;

        let provider = OpenAiChatProvider::new(OpenAiProviderConfig {
            api_key: config.openai.api_key.clone(),
            base_url: config.openai.base_url.clone(),
        });
        tracing::info!(
            model = %config.models.default_model,
            base_url = %config.openai.base_url,
            "Initialized OpenAI chat provider"
        );

        let verifier = TokenVerifier::new(&config.auth.jwt_secret);

        let state = AppState {
            config: config.clone(),
            verifier,
            store: Arc::new(db) as Arc<dyn QuotaStore>,
            provider: Arc::new(provider) as Arc<dyn ChatProvider>,
        };

        // Bind listener (port 0 = random port for testing)
        let addr = SocketAddr::from(([0, 0, 0, 0], config.common.port));
        let listener = TcpListener::bind(addr).await.map_err(|e| {
            tracing::error!("Failed to bind listener to {}: {}", addr, e);
            AppError::from(e)
        })?;
        let port = listener.local_addr()?.port();

        tracing::info!("Summarize service listening on port {}", port);

        Ok(Self {
            port,
            listener,
            state,
        })
    }

    /// Get the port the server is listening on.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        axum::serve(self.listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
