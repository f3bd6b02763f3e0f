//! Message types exchanged between the store, the engine and the webserver
//!
//! - `changes`: committed-change notifications and subscription filters

pub mod changes;

pub use changes::{ChangeEvent, ChangeFilter, ChangeNotice, RowChange, RowPredicate, Table};
