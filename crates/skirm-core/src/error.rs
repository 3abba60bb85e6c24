//! Error types for the core data model and codecs.
//!
//! Organized per subsystem: encoding (outbound command batches),
//! decoding (inbound snapshots), and configuration (option misuse
//! caught before any I/O). Every variant carries enough context to
//! reproduce the failure without re-running the session.

use std::error::Error;
use std::fmt;

use crate::command::CommandKind;
use crate::id::UnitId;

/// Errors from encoding an outbound command batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EncodingError {
    /// A command's argument count does not match its kind's declared shape.
    ArityMismatch {
        /// The offending command kind.
        kind: CommandKind,
        /// Argument count the kind declares.
        expected: usize,
        /// Argument count that was supplied.
        got: usize,
    },
    /// A batch exceeds the maximum encodable command count.
    BatchTooLarge {
        /// Number of commands in the rejected batch.
        len: usize,
    },
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArityMismatch {
                kind,
                expected,
                got,
            } => write!(
                f,
                "command {kind} takes {expected} argument(s), got {got}"
            ),
            Self::BatchTooLarge { len } => {
                write!(f, "command batch of {len} exceeds u32 count limit")
            }
        }
    }
}

impl Error for EncodingError {}

/// Errors from decoding an inbound message into the structured model.
///
/// All variants signal a corrupt or out-of-protocol stream; the
/// framing may no longer be recoverable, so nothing here is retried.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DecodingError {
    /// The payload ended before a complete value could be read.
    Truncated {
        /// What was being read when the payload ran out.
        detail: String,
    },
    /// An unrecognized tag byte.
    BadTag {
        /// The tag that was read.
        tag: u8,
        /// What kind of tag was expected (message, command, record).
        context: &'static str,
    },
    /// A string field was not valid UTF-8.
    InvalidUtf8 {
        /// The field being decoded.
        field: &'static str,
    },
    /// An order targets a unit that exists in no player's list.
    ///
    /// Treated as a corrupt-stream signal rather than silently
    /// dropping the reference.
    DanglingTarget {
        /// The unit whose order carries the reference.
        unit: UnitId,
        /// The missing target.
        target: UnitId,
    },
    /// A map grid's cell payload disagrees with its declared
    /// dimensions, or the map's grids disagree with each other.
    GridSizeMismatch {
        /// What was being decoded when the mismatch was found.
        detail: String,
    },
    /// Image payload length disagrees with the declared dimensions.
    ImageSizeMismatch {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Declared channel count.
        channels: u8,
        /// Bytes actually present.
        got: usize,
    },
    /// A command argument decoded to an out-of-domain value
    /// (e.g. a player slot above `u8::MAX`).
    BadArgument {
        /// The command kind being decoded.
        kind: CommandKind,
        /// Which argument was out of domain.
        detail: String,
    },
}

impl fmt::Display for DecodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Truncated { detail } => write!(f, "truncated payload: {detail}"),
            Self::BadTag { tag, context } => {
                write!(f, "unknown {context} tag {tag:#04x}")
            }
            Self::InvalidUtf8 { field } => write!(f, "field '{field}' is not valid UTF-8"),
            Self::DanglingTarget { unit, target } => write!(
                f,
                "unit {unit} orders against target {target}, which exists in no player's list"
            ),
            Self::GridSizeMismatch { detail } => {
                write!(f, "map grid size mismatch: {detail}")
            }
            Self::ImageSizeMismatch {
                width,
                height,
                channels,
                got,
            } => write!(
                f,
                "image payload is {got} bytes, expected {width}x{height}x{channels}"
            ),
            Self::BadArgument { kind, detail } => {
                write!(f, "bad argument for {kind}: {detail}")
            }
        }
    }
}

impl Error for DecodingError {}

/// Errors from validating session options or pacing policy.
///
/// Surfaced synchronously, before any I/O is attempted.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// combine_frames must be at least 1.
    InvalidCombineFrames {
        /// The rejected value.
        requested: u32,
    },
    /// Frameskip 0 with blocking disabled cannot make progress:
    /// the engine would never be permitted to skip past an unconsumed
    /// frame, and the caller never waits for one.
    FrameskipZeroNonBlocking,
    /// An option value is outside its domain.
    InvalidOption {
        /// The option's wire name.
        name: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidCombineFrames { requested } => {
                write!(f, "combine_frames must be >= 1, got {requested}")
            }
            Self::FrameskipZeroNonBlocking => write!(
                f,
                "frameskip 0 with blocking disabled cannot make progress"
            ),
            Self::InvalidOption { name, reason } => {
                write!(f, "invalid option '{name}': {reason}")
            }
        }
    }
}

impl Error for ConfigError {}
