//! Error types for the session client.

use std::fmt;
use std::io;

use skirm_codec::FrameError;
use skirm_core::{ConfigError, DecodingError, EncodingError};

use crate::session::SessionState;

/// Errors from establishing or driving a session.
#[derive(Debug)]
pub enum SessionError {
    /// The TCP connection could not be established.
    Connection {
        /// Engine host as given to `connect`.
        host: String,
        /// Engine port as given to `connect`.
        port: u16,
        /// The underlying socket error.
        source: io::Error,
    },
    /// The engine closed the connection.
    Closed,
    /// The engine violated the message sequence (wrong reply kind,
    /// unknown tag, oversized frame).
    Protocol {
        /// What was out of sequence.
        detail: String,
    },
    /// An inbound payload could not be decoded.
    Decoding(DecodingError),
    /// An outbound batch could not be encoded.
    Encoding(EncodingError),
    /// A rejected option set.
    Config(ConfigError),
    /// An operation called in a state that does not permit it, or a
    /// second send before the cycle's receive.
    InvalidState {
        /// The rejected operation.
        operation: &'static str,
        /// Session state at the time of the call.
        state: SessionState,
    },
    /// Socket read or write failed mid-session.
    Io(io::Error),
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection { host, port, source } => {
                write!(f, "failed to connect to {host}:{port}: {source}")
            }
            Self::Closed => write!(f, "connection closed by the engine"),
            Self::Protocol { detail } => write!(f, "protocol violation: {detail}"),
            Self::Decoding(e) => write!(f, "decoding error: {e}"),
            Self::Encoding(e) => write!(f, "encoding error: {e}"),
            Self::Config(e) => write!(f, "invalid options: {e}"),
            Self::InvalidState { operation, state } => {
                write!(f, "operation `{operation}` not valid in state {state}")
            }
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Connection { source, .. } => Some(source),
            Self::Decoding(e) => Some(e),
            Self::Encoding(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<DecodingError> for SessionError {
    fn from(e: DecodingError) -> Self {
        Self::Decoding(e)
    }
}

impl From<EncodingError> for SessionError {
    fn from(e: EncodingError) -> Self {
        Self::Encoding(e)
    }
}

impl From<ConfigError> for SessionError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<io::Error> for SessionError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<FrameError> for SessionError {
    fn from(e: FrameError) -> Self {
        match e {
            FrameError::Io(e) => Self::Io(e),
            FrameError::UnexpectedEof => Self::Closed,
            FrameError::TooLarge { len } => Self::Protocol {
                detail: format!("frame length {len} exceeds the wire limit"),
            },
        }
    }
}
