//! HTTP Server
//!
//! Plain HTTP listener for the application router, with graceful shutdown
//! on Ctrl-C or SIGTERM.

use crate::middleware::{apply_middleware, MiddlewareConfig};
use crate::{Result, ServerError};
use axum::Router;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::info;

/// HTTP server around a fully layered router
pub struct HttpServer {
    bind: String,
    router: Router,
}

impl HttpServer {
    pub fn builder() -> HttpServerBuilder {
        HttpServerBuilder::new()
    }

    /// Bind address as `host:port`
    pub fn bind_address(&self) -> &str {
        &self.bind
    }

    /// Serve until a shutdown signal arrives
    pub async fn serve(self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind).await?;
        let local = listener.local_addr()?;
        info!("HTTP server listening on http://{}", local);

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("HTTP server stopped");
        Ok(())
    }
}

/// Builder for HttpServer
pub struct HttpServerBuilder {
    bind: String,
    router: Option<Router>,
    middleware_config: MiddlewareConfig,
}

impl HttpServerBuilder {
    pub fn new() -> Self {
        Self {
            bind: "0.0.0.0:8000".to_string(),
            router: None,
            middleware_config: MiddlewareConfig::default(),
        }
    }

    /// Set bind address (`host:port` or just a port)
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        let addr = addr.into();
        self.bind = if addr.parse::<u16>().is_ok() {
            format!("0.0.0.0:{}", addr)
        } else {
            addr
        };
        self
    }

    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    pub fn middleware(mut self, config: MiddlewareConfig) -> Self {
        self.middleware_config = config;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.middleware_config.timeout = timeout;
        self
    }

    /// Validate the bind address and apply the middleware stack
    pub fn build(self) -> Result<HttpServer> {
        let valid = self
            .bind
            .rsplit_once(':')
            .map(|(host, port)| !host.is_empty() && port.parse::<u16>().is_ok())
            .unwrap_or(false);
        if !valid {
            return Err(ServerError::InvalidAddress(self.bind));
        }

        let router = apply_middleware(self.router.unwrap_or_default(), self.middleware_config);
        Ok(HttpServer {
            bind: self.bind,
            router,
        })
    }
}

impl Default for HttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
