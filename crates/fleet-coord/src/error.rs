//! Coordinator error type.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoordError {
    #[error("coordinator configuration error: {0}")]
    Config(String),

    #[error("no vehicles registered in the directory")]
    NoVehicles,

    #[error("no candidate destinations")]
    NoDestinations,
}

pub type CoordResult<T> = Result<T, CoordError>;
