//! TCP session client for the Skirm engine bridge.
//!
//! A [`Session`] drives the lock-step protocol: connect, handshake via
//! [`Session::initialize`], then alternate [`Session::send`] and
//! [`Session::receive`] once per frame cycle. Frame delivery can be
//! blocking or polled; see [`Pacing`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod pacing;
pub mod session;

pub use error::SessionError;
pub use pacing::Pacing;
pub use session::{GameInfo, Received, Session, SessionState, CONNECT_TIMEOUT};
