//! Core data model for the Skirm RTS engine bridge.
//!
//! Defines the strongly-typed command set, the per-tick [`Frame`]
//! snapshot model, the static [`MapData`] captured once per game, and
//! the session option set negotiated with the engine. No I/O lives
//! here; the wire and replay codecs build on these types.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod command;
pub mod error;
pub mod frame;
pub mod id;
pub mod map;
pub mod options;
pub mod unit;

pub use command::{Command, CommandKind, OptionValue};
pub use error::{ConfigError, DecodingError, EncodingError};
pub use frame::{Frame, ImageBuffer, StatusFlags};
pub use id::{FrameId, PlayerId, UnitId};
pub use map::{Grid, MapData};
pub use options::SessionOptions;
pub use unit::{Unit, UnitAttributes, UnitOrder};
