//! Error types for the transport layer and the exposed entry points.

use core::net::SocketAddrV4;
use std::io;

use scosc_proto::{ArgumentError, EncodeError, ProtocolError};
use scosc_utils::ControlsError;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Network-layer failures on the send path. Never retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Creating, configuring or connecting the stream socket failed.
    #[error("could not connect to {addr}: {source}")]
    ConnectFailed {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },
    /// Neither a TCP link, the in-process server nor a UDP socket can carry the packet.
    #[error("no route to {0}")]
    NoRoute(SocketAddrV4),
    /// The TCP link was closed by the peer while sending.
    #[error("connection to {0} is closed")]
    Closed(SocketAddrV4),
    /// The socket refused the write.
    #[error("write to {addr} failed: {source}")]
    WriteFailed {
        addr: SocketAddrV4,
        #[source]
        source: io::Error,
    },
}

/// A hostname that did not resolve to an IPv4 address.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("could not resolve {host}: {source}")]
    Lookup {
        host: String,
        #[source]
        source: io::Error,
    },
    #[error("{0} has no IPv4 address")]
    NoIpv4(String),
}

/// Failures booting the in-process synthesis engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine failed to boot: {0}")]
    Boot(String),
    #[error("engine options rejected: {0}")]
    Options(String),
}

/// Errors loading a [`NetworkConfig`](crate::config::NetworkConfig).
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Any error an exposed entry point can return.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Argument(#[from] ArgumentError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Controls(#[from] ControlsError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
