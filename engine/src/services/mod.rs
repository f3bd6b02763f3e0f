//! Service implementations
//!
//! Real implementations of the storage, feed, directory and clock traits.

pub mod change_feed;
pub mod clock;
pub mod directory;
pub mod memory_store;

#[cfg(test)]
mod tests;

pub use change_feed::{BroadcastChangeFeed, Subscription};
pub use clock::{FixedClock, SystemClock};
pub use directory::StaticDirectory;
pub use memory_store::{MemoryStore, StoreSnapshot};
