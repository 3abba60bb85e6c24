//! Binary encode/decode for the replay file.
//!
//! Layout, all little-endian:
//!
//! ```text
//! magic ‖ version u8 ‖ flags u8 ‖ MapData ‖ key_frame_interval u32
//! ‖ unit peaks ‖ frame_count u32 ‖ index ‖ stream_len u64
//! ‖ checksum u64 ‖ stream section
//! ```
//!
//! The checksum is xxh3 of the *decoded* stream, so it validates
//! content identically for compressed and uncompressed files. The
//! index maps key-frame ordinals to byte offsets within the decoded
//! stream.

use skirm_codec::snapshot::{
    decode_frame, decode_map, decode_opt_image, decode_unit, encode_frame, encode_map,
    encode_opt_image, encode_unit,
};
use skirm_codec::wire::{self, Cursor};
use skirm_core::{DecodingError, Frame, FrameId, MapData, PlayerId, StatusFlags, UnitId};
use xxhash_rust::xxh3::xxh3_64;

use crate::delta::{FrameDelta, PlayerDelta};
use crate::error::ReplayError;
use crate::{FLAG_LZ4, FORMAT_VERSION, MAGIC, REC_DELTA, REC_KEY};

/// Everything a replay file holds, with the stream already decoded.
#[derive(Debug)]
pub struct FileContents {
    /// Static map data.
    pub map: MapData,
    /// Key-frame interval the stream was encoded with.
    pub key_frame_interval: u32,
    /// Per-player peak unit counts over the recording.
    pub unit_peaks: Vec<(PlayerId, u32)>,
    /// Number of frames in the stream.
    pub frame_count: u32,
    /// Key-frame ordinals and their offsets into the decoded stream.
    pub index: Vec<(u32, u64)>,
    /// The decoded record stream.
    pub stream: Vec<u8>,
}

// ── Stream records ──────────────────────────────────────────────

/// Append a key-frame record (full snapshot).
pub fn encode_record_key(buf: &mut Vec<u8>, frame: &Frame) {
    wire::put_u8(buf, REC_KEY);
    encode_frame(buf, frame);
}

/// Append a delta record.
pub fn encode_record_delta(buf: &mut Vec<u8>, delta: &FrameDelta) {
    wire::put_u8(buf, REC_DELTA);
    wire::put_u32_le(buf, delta.id.0);
    wire::put_u8(buf, delta.flags.to_bits());
    wire::put_u32_le(buf, delta.battle_frame_count);

    wire::put_u8(buf, delta.players.len() as u8);
    for pd in &delta.players {
        wire::put_u8(buf, pd.player.0);
        wire::put_u32_le(buf, pd.removed.len() as u32);
        for id in &pd.removed {
            wire::put_i32_le(buf, id.0);
        }
        wire::put_u32_le(buf, pd.upserts.len() as u32);
        for (idx, unit) in &pd.upserts {
            wire::put_u32_le(buf, *idx);
            encode_unit(buf, unit);
        }
    }

    wire::put_u32_le(buf, delta.deaths.len() as u32);
    for death in &delta.deaths {
        wire::put_i32_le(buf, death.0);
    }
    encode_opt_image(buf, delta.image.as_ref());
}

fn decode_delta(cur: &mut Cursor<'_>) -> Result<FrameDelta, DecodingError> {
    let id = FrameId(cur.u32_le("delta frame id")?);
    let flags = StatusFlags::from_bits(cur.u8("delta flags")?);
    let battle_frame_count = cur.u32_le("delta battle frame count")?;

    let player_count = cur.u8("delta player count")?;
    let mut players = Vec::with_capacity(player_count as usize);
    for _ in 0..player_count {
        let player = PlayerId(cur.u8("delta player slot")?);
        let removed_count = cur.u32_le("delta removed count")? as usize;
        let mut removed = Vec::with_capacity(removed_count.min(4096));
        for _ in 0..removed_count {
            removed.push(UnitId(cur.i32_le("delta removed id")?));
        }
        let upsert_count = cur.u32_le("delta upsert count")? as usize;
        let mut upserts = Vec::with_capacity(upsert_count.min(4096));
        for _ in 0..upsert_count {
            let idx = cur.u32_le("delta upsert index")?;
            upserts.push((idx, decode_unit(cur)?));
        }
        players.push(PlayerDelta {
            player,
            removed,
            upserts,
        });
    }

    let death_count = cur.u32_le("delta death count")? as usize;
    let mut deaths = Vec::with_capacity(death_count.min(4096));
    for _ in 0..death_count {
        deaths.push(UnitId(cur.i32_le("delta death id")?));
    }
    let image = decode_opt_image(cur)?;

    Ok(FrameDelta {
        id,
        flags,
        battle_frame_count,
        players,
        deaths,
        image,
    })
}

/// Decode one stream record into a frame.
///
/// A key record stands alone; a delta record needs the decoded
/// predecessor. A delta with no predecessor, or an unknown tag, is a
/// malformed stream.
pub fn decode_record(
    cur: &mut Cursor<'_>,
    prev: Option<&Frame>,
) -> Result<Frame, ReplayError> {
    match cur.u8("record tag")? {
        REC_KEY => Ok(decode_frame(cur)?),
        REC_DELTA => {
            let delta = decode_delta(cur)?;
            let prev = prev.ok_or_else(|| ReplayError::MalformedFrame {
                detail: format!("delta record for frame {} has no predecessor", delta.id),
            })?;
            crate::delta::apply(prev, &delta)
        }
        tag => Err(ReplayError::MalformedFrame {
            detail: format!("unknown record tag {tag:#04x}"),
        }),
    }
}

// ── File encode/decode ──────────────────────────────────────────

/// Assemble the full file image from header fields and the encoded
/// stream. Deterministic: no timestamps, no environment input.
pub fn encode_file(
    map: &MapData,
    key_frame_interval: u32,
    unit_peaks: &[(PlayerId, u32)],
    frame_count: u32,
    index: &[(u32, u64)],
    stream: &[u8],
    compress: bool,
) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&MAGIC);
    wire::put_u8(&mut buf, FORMAT_VERSION);
    wire::put_u8(&mut buf, if compress { FLAG_LZ4 } else { 0 });

    encode_map(&mut buf, map);
    wire::put_u32_le(&mut buf, key_frame_interval);

    wire::put_u8(&mut buf, unit_peaks.len() as u8);
    for (player, peak) in unit_peaks {
        wire::put_u8(&mut buf, player.0);
        wire::put_u32_le(&mut buf, *peak);
    }

    wire::put_u32_le(&mut buf, frame_count);
    wire::put_u32_le(&mut buf, index.len() as u32);
    for (ordinal, offset) in index {
        wire::put_u32_le(&mut buf, *ordinal);
        wire::put_u64_le(&mut buf, *offset);
    }

    wire::put_u64_le(&mut buf, stream.len() as u64);
    wire::put_u64_le(&mut buf, xxh3_64(stream));
    if compress {
        buf.extend_from_slice(&lz4_flex::compress_prepend_size(stream));
    } else {
        buf.extend_from_slice(stream);
    }
    buf
}

/// Parse and validate a full file image, decompressing the stream.
pub fn decode_file(bytes: &[u8]) -> Result<FileContents, ReplayError> {
    if bytes.len() < MAGIC.len() || bytes[..MAGIC.len()] != MAGIC {
        return Err(ReplayError::InvalidMagic);
    }
    let mut cur = Cursor::new(&bytes[MAGIC.len()..]);

    let version = header_field(cur.u8("format version"))?;
    if version != FORMAT_VERSION {
        return Err(ReplayError::UnsupportedVersion { found: version });
    }
    let flags = header_field(cur.u8("file flags"))?;
    let compressed = flags & FLAG_LZ4 != 0;

    let map = header_field(decode_map(&mut cur))?;
    let key_frame_interval = header_field(cur.u32_le("key frame interval"))?;
    if key_frame_interval == 0 {
        return Err(ReplayError::CorruptFile {
            detail: "key frame interval 0".into(),
        });
    }

    let peak_count = header_field(cur.u8("unit peak count"))?;
    let mut unit_peaks = Vec::with_capacity(peak_count as usize);
    for _ in 0..peak_count {
        let player = PlayerId(header_field(cur.u8("unit peak player"))?);
        let peak = header_field(cur.u32_le("unit peak value"))?;
        unit_peaks.push((player, peak));
    }

    let frame_count = header_field(cur.u32_le("frame count"))?;
    let index_len = header_field(cur.u32_le("index length"))? as usize;
    let mut index = Vec::with_capacity(index_len.min(4096));
    let mut prev_ordinal = None;
    for _ in 0..index_len {
        let ordinal = header_field(cur.u32_le("index ordinal"))?;
        let offset = header_field(cur.u64_le("index offset"))?;
        if prev_ordinal.is_some_and(|p| ordinal <= p) {
            return Err(ReplayError::CorruptFile {
                detail: format!("key-frame index not strictly increasing at ordinal {ordinal}"),
            });
        }
        prev_ordinal = Some(ordinal);
        index.push((ordinal, offset));
    }
    if frame_count > 0 && index.first().map(|(o, _)| *o) != Some(0) {
        return Err(ReplayError::CorruptFile {
            detail: "non-empty stream without a key frame at ordinal 0".into(),
        });
    }

    let stream_len = header_field(cur.u64_le("stream length"))? as usize;
    let checksum = header_field(cur.u64_le("stream checksum"))?;

    let section = cur.take(cur.remaining(), "stream section")?;
    let stream = if compressed {
        lz4_flex::decompress_size_prepended(section).map_err(|e| ReplayError::CorruptFile {
            detail: format!("lz4 stream: {e}"),
        })?
    } else {
        section.to_vec()
    };
    if stream.len() != stream_len {
        return Err(ReplayError::CorruptFile {
            detail: format!(
                "stream is {} byte(s), header declares {stream_len}",
                stream.len()
            ),
        });
    }
    let found = xxh3_64(&stream);
    if found != checksum {
        return Err(ReplayError::ChecksumMismatch {
            expected: checksum,
            found,
        });
    }

    Ok(FileContents {
        map,
        key_frame_interval,
        unit_peaks,
        frame_count,
        index,
        stream,
    })
}

fn header_field<T>(res: Result<T, DecodingError>) -> Result<T, ReplayError> {
    res.map_err(|e| ReplayError::CorruptFile {
        detail: e.to_string(),
    })
}
