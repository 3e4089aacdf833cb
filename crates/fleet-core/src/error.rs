//! Core error type.
//!
//! Sub-crates define their own error enums; `CoreError` covers the failures
//! that originate in shared types (config validation, value parsing).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Shorthand result type for `fleet-core`.
pub type CoreResult<T> = Result<T, CoreError>;
