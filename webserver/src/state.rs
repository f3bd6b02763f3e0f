//! Shared handler state

use std::sync::Arc;
use std::time::Instant;

use engine::SalesEngine;

use crate::traits::WebSocketManager;

/// State handed to every axum handler
pub struct AppState<W>
where
    W: WebSocketManager,
{
    pub engine: Arc<SalesEngine>,
    pub websockets: Arc<W>,
    pub started_at: Instant,
}

impl<W> AppState<W>
where
    W: WebSocketManager,
{
    pub fn new(engine: Arc<SalesEngine>, websockets: Arc<W>) -> Self {
        Self {
            engine,
            websockets,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

// Manual impl: `W` itself need not be Clone behind the Arc
impl<W> Clone for AppState<W>
where
    W: WebSocketManager,
{
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            websockets: self.websockets.clone(),
            started_at: self.started_at,
        }
    }
}
