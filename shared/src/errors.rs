//! Shared error types for the sales pipeline system

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Serialization failed: {message}")]
    SerializationError { message: String },

    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Invalid UUID: {input}")]
    InvalidUuid { input: String },

    #[error("Unknown pipeline status: {input}")]
    UnknownStatus { input: String },

    #[error("Unknown service type: {input}")]
    UnknownServiceType { input: String },

    #[error("Unknown credential channel: {input}")]
    UnknownChannel { input: String },

    #[error("Invalid configuration: {field} = {value}")]
    InvalidConfig { field: String, value: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
