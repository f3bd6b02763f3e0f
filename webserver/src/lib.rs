//! Webserver for the sales pipeline system
//!
//! Exposes the engine's pipeline, payroll and credential operations as a JSON
//! API and pushes committed changes to connected browser sessions.

pub mod error;
pub mod services;
pub mod state;
pub mod traits;
pub mod types;
pub mod web;
pub mod webserver_impl;

pub use error::{WebServerError, WebServerResult};
pub use state::AppState;
pub use traits::WebSocketManager;
pub use types::*;
pub use webserver_impl::WebServer;

pub use services::RealWebSocketManager;
