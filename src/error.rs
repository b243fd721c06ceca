//! Error types for RTM bridge operations.
//!
//! This module provides a unified error type [`RtmError`] that encompasses all possible
//! errors that can occur while negotiating, connecting and bridging messages.
//!
//! # Examples
//!
//! ```no_run
//! use rtm_bridge::{RtmClient, RtmError, RtmOptions};
//!
//! # fn main() {
//! match RtmClient::start("api-token", RtmOptions::new()) {
//!     Ok(client) => { /* use client */ },
//!     Err(RtmError::Session(msg)) => {
//!         eprintln!("Session negotiation failed: {}", msg);
//!     },
//!     Err(RtmError::Handshake(msg)) => {
//!         eprintln!("Server did not acknowledge the connection: {}", msg);
//!     },
//!     Err(e) => {
//!         eprintln!("Start failed: {}", e);
//!     }
//! }
//! # }
//! ```

use std::fmt;

/// Error type for all RTM bridge operations.
///
/// # Error Categories
///
/// - **Startup errors**: [`Session`](Self::Session), [`InvalidUri`](Self::InvalidUri),
///   [`Connection`](Self::Connection), [`Handshake`](Self::Handshake)
/// - **Configuration errors**: [`InvalidConfiguration`](Self::InvalidConfiguration)
/// - **Runtime errors**: [`Decode`](Self::Decode), [`TransportRead`](Self::TransportRead),
///   [`TransportWrite`](Self::TransportWrite), [`Io`](Self::Io)
///
/// Startup errors are returned from [`RtmClient::start`](crate::RtmClient::start) and
/// abort the start attempt before any loop is spawned. Runtime errors are surfaced on
/// [`RtmClient::error_rx`](crate::RtmClient) while the loops keep running (or, for a
/// fatal read failure, right before the receive loop exits).
#[derive(Debug)]
pub enum RtmError {
    /// The connection URL could not be parsed or does not follow the
    /// WebSocket URI scheme (`ws://` or `wss://`).
    InvalidUri(String),

    /// Invalid configuration was provided, such as a zero-duration interval.
    InvalidConfiguration(String),

    /// Session negotiation failed: the HTTP call did not complete, the
    /// response was not valid JSON, the server rejected the request, or the
    /// response carried no connection URL.
    Session(String),

    /// Transport-level connect failure. Fatal to the connect attempt in
    /// progress, including the single reconnect attempt after a close frame.
    Connection(String),

    /// The first frame after connect was not the expected `"hello"`
    /// acknowledgment (or could not be decoded at all). The connect attempt
    /// is aborted and no loops are started.
    Handshake(String),

    /// A received frame's payload could not be parsed into a message. The
    /// affected frame is dropped; the receive loop continues.
    Decode(serde_json::Error),

    /// Reading from the socket failed with something other than a close.
    /// Fatal to the receive loop.
    TransportRead(String),

    /// Writing a frame failed. The outbound message is dropped, not retried.
    TransportWrite(String),

    /// An I/O operation failed outside the read/write paths, e.g. socket
    /// configuration or thread spawning.
    Io(std::io::Error),
}

impl fmt::Display for RtmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RtmError::InvalidUri(uri) => write!(f, "Invalid URI: {}", uri),
            RtmError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {}", msg),
            RtmError::Session(msg) => write!(f, "Session negotiation failed: {}", msg),
            RtmError::Connection(msg) => write!(f, "Connection failed: {}", msg),
            RtmError::Handshake(msg) => write!(f, "Handshake failed: {}", msg),
            RtmError::Decode(err) => write!(f, "Decode failed: {}", err),
            RtmError::TransportRead(msg) => write!(f, "Transport read failed: {}", msg),
            RtmError::TransportWrite(msg) => write!(f, "Transport write failed: {}", msg),
            RtmError::Io(err) => write!(f, "IO error: {}", err),
        }
    }
}

impl std::error::Error for RtmError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RtmError::Decode(err) => Some(err),
            RtmError::Io(err) => Some(err),
            _ => None,
        }
    }
}

// Convert from serde_json decode errors to RtmError
impl From<serde_json::Error> for RtmError {
    fn from(err: serde_json::Error) -> Self {
        RtmError::Decode(err)
    }
}

// Convert from std::io::Error to RtmError
impl From<std::io::Error> for RtmError {
    fn from(err: std::io::Error) -> Self {
        RtmError::Io(err)
    }
}

/// Convenience type alias for `Result<T, RtmError>`.
///
/// This type is used throughout the RTM bridge API for operations that can fail.
pub type RtmResult<T> = Result<T, RtmError>;
