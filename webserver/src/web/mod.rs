//! HTTP and WebSocket surface

pub mod handlers;
pub mod identity;
pub mod router;

pub use identity::{CallerIdentity, AGENT_HEADER};
pub use router::build_router;
