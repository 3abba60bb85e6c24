//! Wire protocol codec for the Skirm RTS engine bridge.
//!
//! Everything on the wire is little-endian. Each message is framed
//! with a `u32` length prefix ([`framing`]), and the payload starts
//! with a one-byte message tag ([`message`]). Strings and byte
//! arrays are length-prefixed with a `u32`. The format is
//! intentionally simple: no alignment padding, no self-describing
//! schema.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod command;
pub mod framing;
pub mod message;
pub mod snapshot;
pub mod wire;

pub use framing::{read_frame, write_frame, FrameError, MAX_FRAME_LEN};
pub use message::{
    decode_client, decode_server, encode_client, encode_server, ClientHandshake, ClientMessage,
    ServerMessage,
};
pub use wire::Cursor;

/// Protocol version negotiated at handshake. Bumped on any wire
/// layout change.
pub const PROTOCOL_VERSION: u8 = 1;

// ── Message tags ────────────────────────────────────────────────

/// Client→engine: handshake (version, uid, requested map, options).
pub const MSG_HANDSHAKE_CLIENT: u8 = 1;
/// Client→engine: ordered command batch.
pub const MSG_COMMANDS: u8 = 2;
/// Engine→client: handshake reply (game info, map, first frame).
pub const MSG_HANDSHAKE_SERVER: u8 = 3;
/// Engine→client: frame snapshot.
pub const MSG_FRAME: u8 = 4;
/// Engine→client: game over (final frame + outcome).
pub const MSG_END_GAME: u8 = 5;
