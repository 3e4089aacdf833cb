//! Bridge error types.

use std::net::SocketAddr;

use thiserror::Error;

use fleet_protocol::TransportError;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("cannot listen on {addr}: {source}")]
    Bind {
        addr:   SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot connect to bridge at {addr}: {source}")]
    Connect {
        addr:   SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub type BridgeResult<T> = Result<T, BridgeError>;
