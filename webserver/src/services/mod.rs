//! Service implementations
//!
//! Session registry and the task that feeds it committed store changes

pub mod change_forwarder;
pub mod websocket_manager;

pub use change_forwarder::{route_change, spawn_change_forwarder};
pub use websocket_manager::RealWebSocketManager;

#[cfg(test)]
mod tests;
