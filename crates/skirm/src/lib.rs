//! Skirm: a lock-step bridge to an RTS game engine, with deterministic
//! replay recording.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Skirm sub-crates. For most users, adding `skirm` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use skirm::prelude::*;
//!
//! // Record a short run and verify it against itself.
//! let mut map = MapData {
//!     name: "flat".into(),
//!     walkability: Grid::zeroed(8, 8),
//!     ground_height: Grid::zeroed(8, 8),
//!     buildability: Grid::zeroed(8, 8),
//!     start_locations: vec![(0, 0), (7, 7)],
//! };
//! map.walkability.cells.fill(1);
//!
//! let mut recorder = Recorder::new();
//! recorder.start(map).unwrap();
//! for i in 0..3 {
//!     let mut frame = Frame::new(FrameId(i));
//!     frame.units.insert(PlayerId(0), vec![
//!         Unit::new(UnitId(1), PlayerId(0), 7, i as i32, 4),
//!     ]);
//!     recorder.push(frame).unwrap();
//! }
//! assert_eq!(recorder.frame_count(), 3);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `skirm-core` | Frames, units, commands, options, ids |
//! | [`codec`] | `skirm-codec` | Wire framing and message encoding |
//! | [`client`] | `skirm-client` | TCP session and frame pacing |
//! | [`replay`] | `skirm-replay` | Replay recording, playback, verification |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core data model (`skirm-core`).
///
/// Frames, units, maps, commands, session options, and the shared
/// error types ([`types::EncodingError`], [`types::DecodingError`],
/// [`types::ConfigError`]).
pub use skirm_core as types;

/// Wire protocol codec (`skirm-codec`).
///
/// Length-prefixed framing ([`codec::read_frame`],
/// [`codec::write_frame`]) and client/server message encoding.
pub use skirm_codec as codec;

/// Session client (`skirm-client`).
///
/// [`client::Session`] drives the lock-step protocol over TCP;
/// [`client::Pacing`] configures frame delivery.
pub use skirm_client as client;

/// Replay engine (`skirm-replay`).
///
/// Record with [`replay::Recorder`], play back with
/// [`replay::Replay`], check determinism with
/// [`replay::verify_frames`].
pub use skirm_replay as replay;

/// Common imports for typical Skirm usage.
///
/// ```rust
/// use skirm::prelude::*;
/// ```
pub mod prelude {
    // Data model
    pub use skirm_core::{
        Command, Frame, FrameId, Grid, MapData, OptionValue, PlayerId, SessionOptions, Unit,
        UnitId,
    };

    // Errors
    pub use skirm_core::{ConfigError, DecodingError, EncodingError};

    // Session
    pub use skirm_client::{GameInfo, Pacing, Received, Session, SessionError, SessionState};

    // Replay
    pub use skirm_replay::{verify_frames, verify_map, Recorder, Replay, ReplayError};
}
