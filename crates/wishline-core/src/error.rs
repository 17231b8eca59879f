//! Wishline error type.

use thiserror::Error;

/// All errors produced by the Wishline crates.
#[derive(Error, Debug)]
pub enum WishlineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("API key missing for provider: {0}")]
    ApiKeyMissing(String),

    #[error("Unknown provider: {0}")]
    ProviderNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, WishlineError>;
