//! Main webserver implementation
//!
//! Owns the engine handle and the session registry, wires the change
//! forwarder between them and serves the router until shutdown.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use engine::SalesEngine;
use shared::{process_info, ChangeFilter, ProcessId};
use tokio::task::JoinHandle;

use crate::error::{WebServerError, WebServerResult};
use crate::services::spawn_change_forwarder;
use crate::state::AppState;
use crate::traits::WebSocketManager;
use crate::web::build_router;

pub struct WebServer<W>
where
    W: WebSocketManager + 'static,
{
    state: AppState<W>,
}

impl<W> WebServer<W>
where
    W: WebSocketManager + 'static,
{
    pub fn new(engine: Arc<SalesEngine>, websockets: Arc<W>) -> Self {
        Self {
            state: AppState::new(engine, websockets),
        }
    }

    pub fn state(&self) -> &AppState<W> {
        &self.state
    }

    pub fn router(&self) -> Router {
        build_router(self.state.clone())
    }

    /// Subscribe to every committed change and push it to sessions
    pub fn start_change_forwarder(&self) -> JoinHandle<()> {
        let subscription = self.state.engine.subscribe(ChangeFilter::everything());
        spawn_change_forwarder(subscription, self.state.websockets.clone())
    }

    /// Serve until `shutdown` resolves
    pub async fn run<F>(&self, addr: SocketAddr, shutdown: F) -> WebServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let forwarder = self.start_change_forwarder();
        let sweeper = self.state.engine.start_background_tasks();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| WebServerError::ServerStartup(format!("Failed to bind to {addr}: {e}")))?;
        process_info!(ProcessId::current(), "🌐 Web server listening on http://{}", addr);

        let served = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        forwarder.abort();
        if let Some(sweeper) = sweeper {
            sweeper.abort();
        }

        served.map_err(|e| WebServerError::ServerStartup(format!("Server error: {e}")))
    }
}
