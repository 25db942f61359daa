//! Consent server: home page, authorization endpoint and the accept endpoint
//! the consent page posts to.

mod config;
mod grant;
mod http;

use std::future::Future;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;

use crate::{ACCEPT_PATH, ConsentError};

pub use config::{AuthCodeConfig, DEFAULT_CONFIG_PATH, ImplicitConfig, PORT_ENV, ServerConfig};
use http::{ServerState, accepted_handler, authorize_handler, fallback_handler, home_handler};

#[derive(Debug, Clone)]
pub struct ConsentServer {
    config: Arc<ServerConfig>,
}

impl ConsentServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn router(&self) -> Router {
        let state = ServerState {
            config: self.config.clone(),
        };

        Router::new()
            .route("/", get(home_handler))
            .route("/authorize", get(authorize_handler))
            .route(ACCEPT_PATH, post(accepted_handler))
            .fallback(fallback_handler)
            .with_state(state)
    }

    pub async fn bind(&self) -> Result<TcpListener, ConsentError> {
        Ok(TcpListener::bind(self.config.addr()).await?)
    }

    /// Binds the configured address and serves until the process exits.
    pub async fn serve(&self) -> Result<(), ConsentError> {
        let listener = self.bind().await?;
        self.serve_with(listener, std::future::pending()).await
    }

    /// Serves on `listener` until `shutdown` resolves.
    pub async fn serve_with<F>(
        &self,
        listener: TcpListener,
        shutdown: F,
    ) -> Result<(), ConsentError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(%addr, "consent server listening");
        tracing::info!("  GET  /");
        tracing::info!("  GET  /authorize");
        tracing::info!("  POST {ACCEPT_PATH}");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("consent server stopped");
        Ok(())
    }
}
