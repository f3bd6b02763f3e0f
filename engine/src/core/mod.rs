//! Core business logic modules
//!
//! Pure decisions with no I/O: commission rates, the weekly cutoff calendar,
//! pipeline transitions and credential lease rules. Services in the crate
//! root combine these with the store traits.

pub mod commission;
pub mod cutoff;
pub mod leases;
pub mod pipeline;

pub use commission::{commission, is_premium, CommissionSchedule};
pub use cutoff::{next_cutoff, CutoffCalendar};
pub use leases::{ClaimDecision, LeasePolicy};
