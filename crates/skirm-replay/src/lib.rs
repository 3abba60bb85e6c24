//! Replay recording, storage, and verification for Skirm sessions.
//!
//! Records the frame stream a session observed and persists it to a
//! single self-contained file that reproduces every frame and every
//! static map layer exactly as recorded.
//!
//! # Architecture
//!
//! - [`Recorder`] buffers pushed frames and writes the file atomically
//! - [`Replay`] loads a file and serves random access via the
//!   key-frame index
//! - [`verify_frames`] and [`verify_map`] check a loaded replay
//!   against the live stream it was recorded from
//!
//! # Format
//!
//! ```text
//! [MAGIC "SKRP"] [VERSION u8] [flags u8] [MapData]
//! [key_frame_interval u32] [unit peaks] [frame_count u32]
//! [key-frame index] [stream_len u64] [checksum u64]
//! [stream bytes, optionally one lz4 block]
//! ```
//!
//! The stream is a sequence of records: a full frame at every
//! key-frame position, a delta against the predecessor everywhere
//! else. No timestamps are stored anywhere, so encoding the same
//! recording twice yields byte-identical files.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod codec;
pub mod delta;
pub mod error;
pub mod reader;
pub mod recorder;
pub mod verify;

pub use delta::FrameDelta;
pub use error::ReplayError;
pub use reader::{FrameIter, Replay};
pub use recorder::Recorder;
pub use verify::{verify_frames, verify_map};

/// Magic bytes at the start of every replay file.
pub const MAGIC: [u8; 4] = *b"SKRP";

/// Current binary format version.
pub const FORMAT_VERSION: u8 = 1;

/// Header flag bit: the stream section is one lz4 block.
pub const FLAG_LZ4: u8 = 0b0000_0001;

/// Stream record tag: full frame snapshot (seek anchor).
pub const REC_KEY: u8 = 1;

/// Stream record tag: delta against the preceding frame.
pub const REC_DELTA: u8 = 2;

/// Key-frame interval used when the caller never sets one.
pub const DEFAULT_KEY_FRAME_INTERVAL: u32 = 100;
