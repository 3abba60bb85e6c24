//! Error types for the replay system.

use std::fmt;
use std::io;

use skirm_core::DecodingError;

/// Errors from replay recording, persistence, or playback.
#[derive(Debug)]
pub enum ReplayError {
    /// File read or write failed.
    Io(io::Error),
    /// The file does not start with the `b"SKRP"` magic bytes.
    InvalidMagic,
    /// The format version is not supported by this build.
    UnsupportedVersion {
        /// The version found in the file.
        found: u8,
    },
    /// The file structure is internally inconsistent (bad index,
    /// stream length mismatch, undecodable section).
    CorruptFile {
        /// What was inconsistent.
        detail: String,
    },
    /// The stream checksum does not match the header.
    ChecksumMismatch {
        /// Checksum recorded in the header.
        expected: u64,
        /// Checksum computed over the decoded stream.
        found: u64,
    },
    /// A stream record could not be decoded.
    MalformedFrame {
        /// What went wrong, with the offending offset where known.
        detail: String,
    },
    /// A frame index past the end of the recording.
    FrameOutOfRange {
        /// The requested index.
        index: usize,
        /// Number of frames in the recording.
        len: usize,
    },
    /// A key-frame interval that would produce zero key frames.
    InvalidKeyFrameInterval {
        /// The rejected value.
        requested: u32,
    },
    /// `start` was called on a recorder that is already recording.
    AlreadyStarted,
    /// An operation that needs an active recording before `start`.
    NotStarted,
}

impl fmt::Display for ReplayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::InvalidMagic => write!(f, "invalid magic bytes (expected b\"SKRP\")"),
            Self::UnsupportedVersion { found } => {
                write!(f, "unsupported format version {found}")
            }
            Self::CorruptFile { detail } => write!(f, "corrupt replay file: {detail}"),
            Self::ChecksumMismatch { expected, found } => write!(
                f,
                "stream checksum mismatch: header={expected:#018x}, computed={found:#018x}"
            ),
            Self::MalformedFrame { detail } => write!(f, "malformed frame record: {detail}"),
            Self::FrameOutOfRange { index, len } => {
                write!(f, "frame index {index} out of range for {len} frame(s)")
            }
            Self::InvalidKeyFrameInterval { requested } => {
                write!(f, "key-frame interval must be >= 1, got {requested}")
            }
            Self::AlreadyStarted => write!(f, "recorder already started"),
            Self::NotStarted => write!(f, "recorder not started"),
        }
    }
}

impl std::error::Error for ReplayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for ReplayError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<DecodingError> for ReplayError {
    fn from(e: DecodingError) -> Self {
        Self::MalformedFrame {
            detail: e.to_string(),
        }
    }
}
