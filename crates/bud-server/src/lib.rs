//! HTTP transport for the Bud tool gateway.
//!
//! Each POST body is one JSON-RPC message handed to the shared
//! [`Dispatcher`](bud_mcp::Dispatcher). Requests may be served concurrently.
//!
//! # Example
//!
//! ```ignore
//! use bud_server::HttpServer;
//!
//! let server = HttpServer::new(Arc::new(dispatcher));
//! server.run("127.0.0.1:8066").await?;
//! ```

pub mod error;
pub mod routes;
pub mod state;

pub use error::{ErrorResponse, Result, ServerError};
pub use routes::HealthResponse;
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use bud_mcp::Dispatcher;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;

/// The gateway's HTTP server.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Create a server over a dispatcher.
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            state: AppState::new(dispatcher),
        }
    }

    /// Build the router with all routes and middleware.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .merge(routes::mcp_routes())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Bind `addr` and serve until the task is dropped.
    pub async fn run(self, addr: &str) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;
        self.run_on(listener).await
    }

    /// Serve on an already-bound listener (useful for testing).
    pub async fn run_on(self, listener: TcpListener) -> Result<()> {
        let addr: Option<SocketAddr> = listener.local_addr().ok();
        let router = self.router();

        info!(addr = ?addr, "Starting HTTP server");

        axum::serve(listener, router)
            .await
            .map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }
}
