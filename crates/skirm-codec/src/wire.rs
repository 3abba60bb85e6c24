//! Primitive little-endian readers and writers.
//!
//! Writers append to a `Vec<u8>` and cannot fail; payloads are
//! assembled fully in memory before framing. Reads go through
//! [`Cursor`], which tracks its offset in a borrowed slice and turns
//! every short read into [`DecodingError::Truncated`] with a note on
//! what was being read.

use skirm_core::DecodingError;

// ── Writers ─────────────────────────────────────────────────────

/// Append a single byte.
pub fn put_u8(buf: &mut Vec<u8>, v: u8) {
    buf.push(v);
}

/// Append a little-endian u32.
pub fn put_u32_le(buf: &mut Vec<u8>, v: u32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Append a little-endian u64.
pub fn put_u64_le(buf: &mut Vec<u8>, v: u64) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Append a little-endian i32.
pub fn put_i32_le(buf: &mut Vec<u8>, v: i32) {
    buf.extend_from_slice(&v.to_le_bytes());
}

/// Append a length-prefixed UTF-8 string (u32 length + bytes).
pub fn put_str(buf: &mut Vec<u8>, s: &str) {
    put_u32_le(buf, s.len() as u32);
    buf.extend_from_slice(s.as_bytes());
}

/// Append a length-prefixed byte array (u32 length + bytes).
pub fn put_bytes(buf: &mut Vec<u8>, b: &[u8]) {
    put_u32_le(buf, b.len() as u32);
    buf.extend_from_slice(b);
}

// ── Reader ──────────────────────────────────────────────────────

/// Offset-tracking reader over a borrowed payload.
#[derive(Debug)]
pub struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// A cursor at the start of `data`.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    /// Whether every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Take `n` raw bytes, or fail naming `what` was being read.
    pub fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], DecodingError> {
        if self.remaining() < n {
            return Err(DecodingError::Truncated {
                detail: format!(
                    "{what}: need {n} byte(s), {} left at offset {}",
                    self.remaining(),
                    self.pos
                ),
            });
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    /// Read a single byte.
    pub fn u8(&mut self, what: &str) -> Result<u8, DecodingError> {
        Ok(self.take(1, what)?[0])
    }

    /// Read a little-endian u32.
    pub fn u32_le(&mut self, what: &str) -> Result<u32, DecodingError> {
        let bytes = self.take(4, what)?;
        // take() guarantees exactly 4 bytes.
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a little-endian u64.
    pub fn u64_le(&mut self, what: &str) -> Result<u64, DecodingError> {
        let bytes = self.take(8, what)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    /// Read a little-endian i32.
    pub fn i32_le(&mut self, what: &str) -> Result<i32, DecodingError> {
        let bytes = self.take(4, what)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Read a length-prefixed byte array.
    pub fn bytes(&mut self, what: &str) -> Result<Vec<u8>, DecodingError> {
        let len = self.u32_le(what)? as usize;
        Ok(self.take(len, what)?.to_vec())
    }

    /// Read a length-prefixed UTF-8 string.
    pub fn str(&mut self, field: &'static str) -> Result<String, DecodingError> {
        let len = self.u32_le(field)? as usize;
        let raw = self.take(len, field)?;
        String::from_utf8(raw.to_vec()).map_err(|_| DecodingError::InvalidUtf8 { field })
    }
}
