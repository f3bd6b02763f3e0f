//! Shared types for the sales pipeline and settlement system
//!
//! Contains the domain records, identifiers and change-feed messages used by
//! both the engine library and the webserver, plus process-aware logging.

pub mod types;
pub mod errors;
pub mod logging;
pub mod messages;

pub use types::*;
pub use errors::*;

pub use messages::{ChangeEvent, ChangeFilter, ChangeNotice, RowChange, RowPredicate, Table};
