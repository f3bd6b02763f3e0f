//! Sales pipeline, commission settlement and shared-credential reservation
//!
//! - `core`: pure rules (commission rates, cutoff calendar, transitions, leases)
//! - `traits`: injected store, directory, feed and clock seams
//! - `services`: real implementations of those seams
//! - `pipeline`, `payroll`, `credentials`: the services agents and admins call
//! - `sales_engine`: wiring from configuration

pub mod config;
pub mod core;
pub mod credentials;
pub mod error;
pub mod payroll;
pub mod pipeline;
pub mod sales_engine;
pub mod services;
pub mod traits;

pub use config::EngineConfig;
pub use credentials::CredentialService;
pub use error::{CoreError, CoreResult};
pub use payroll::PayrollService;
pub use pipeline::PipelineService;
pub use sales_engine::SalesEngine;
