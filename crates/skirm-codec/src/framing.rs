//! Length-delimited message framing (u32 little-endian length prefix).
//!
//! Sits between the TCP stream and the payload codecs: one frame is
//! one protocol message. A hard length cap keeps a corrupt or hostile
//! prefix from provoking an absurd allocation.

use std::error::Error;
use std::fmt;
use std::io::{Read, Write};

/// Largest accepted frame payload.
pub const MAX_FRAME_LEN: u32 = 64 * 1024 * 1024;

/// Errors from reading or writing a framed message.
#[derive(Debug)]
pub enum FrameError {
    /// The underlying stream failed.
    Io(std::io::Error),
    /// The length prefix exceeds [`MAX_FRAME_LEN`].
    TooLarge {
        /// The declared payload length.
        len: u32,
    },
    /// The stream ended inside a frame.
    UnexpectedEof,
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "io error: {e}"),
            Self::TooLarge { len } => {
                write!(f, "frame of {len} bytes exceeds cap of {MAX_FRAME_LEN}")
            }
            Self::UnexpectedEof => write!(f, "stream ended mid-frame"),
        }
    }
}

impl Error for FrameError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for FrameError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Write one framed message and flush.
pub fn write_frame<W: Write>(w: &mut W, payload: &[u8]) -> Result<(), FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge { len: u32::MAX })?;
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge { len });
    }
    w.write_all(&len.to_le_bytes())?;
    w.write_all(payload)?;
    w.flush()?;
    Ok(())
}

/// Read one framed message.
///
/// An EOF at a frame boundary (zero bytes of the length prefix) is
/// reported as `UnexpectedEof` too; the session layer decides whether
/// that counts as a clean close.
pub fn read_frame<R: Read>(r: &mut R) -> Result<Vec<u8>, FrameError> {
    let mut len_bytes = [0u8; 4];
    read_exact_or_eof(r, &mut len_bytes)?;
    let len = u32::from_le_bytes(len_bytes);
    if len > MAX_FRAME_LEN {
        return Err(FrameError::TooLarge { len });
    }
    let mut payload = vec![0u8; len as usize];
    read_exact_or_eof(r, &mut payload)?;
    Ok(payload)
}

fn read_exact_or_eof<R: Read>(r: &mut R, buf: &mut [u8]) -> Result<(), FrameError> {
    let mut off = 0usize;
    while off < buf.len() {
        match r.read(&mut buf[off..]) {
            Ok(0) => return Err(FrameError::UnexpectedEof),
            Ok(n) => off += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(FrameError::Io(e)),
        }
    }
    Ok(())
}
