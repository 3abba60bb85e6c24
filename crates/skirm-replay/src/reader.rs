//! Replay loading and random access.
//!
//! [`Replay::load`] parses and validates the whole file up front: the
//! header gives map and frame count without touching the stream, the
//! stream is decompressed once and checksummed, and every later
//! access decodes records out of the in-memory stream. Seeking to
//! frame `i` starts at the nearest key frame at or before `i` and
//! replays at most `key_frame_interval - 1` deltas; it never scans
//! from frame 0.

use std::io::Read;
use std::path::Path;

use skirm_codec::wire::Cursor;
use skirm_core::{Frame, MapData, PlayerId};

use crate::codec::{decode_file, decode_record, FileContents};
use crate::error::ReplayError;

/// A loaded replay file.
pub struct Replay {
    contents: FileContents,
}

impl Replay {
    /// Load a replay from a file path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let bytes = std::fs::read(path)?;
        Ok(Self {
            contents: decode_file(&bytes)?,
        })
    }

    /// Load a replay from any `Read` source.
    pub fn load_from<R: Read>(mut reader: R) -> Result<Self, ReplayError> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Ok(Self {
            contents: decode_file(&bytes)?,
        })
    }

    /// The static map data recorded at the start of the game.
    pub fn map(&self) -> &MapData {
        &self.contents.map
    }

    /// Number of frames in the recording.
    pub fn frame_count(&self) -> usize {
        self.contents.frame_count as usize
    }

    /// The key-frame interval the file was encoded with.
    pub fn key_frame_interval(&self) -> u32 {
        self.contents.key_frame_interval
    }

    /// Key-frame ordinals and their stream offsets, ascending.
    pub fn key_frame_index(&self) -> &[(u32, u64)] {
        &self.contents.index
    }

    /// Peak unit count per player over the whole recording.
    pub fn unit_peaks(&self) -> &[(PlayerId, u32)] {
        &self.contents.unit_peaks
    }

    /// Random access to the `index`-th recorded frame.
    ///
    /// Costs one key-frame decode plus at most
    /// `index mod key_frame_interval` delta applications.
    pub fn get_frame(&self, index: usize) -> Result<Frame, ReplayError> {
        if index >= self.frame_count() {
            return Err(ReplayError::FrameOutOfRange {
                index,
                len: self.frame_count(),
            });
        }
        let ordinal = index as u32;

        // Last key frame at or before the target.
        let slot = match self
            .contents
            .index
            .binary_search_by_key(&ordinal, |&(o, _)| o)
        {
            Ok(exact) => exact,
            Err(0) => {
                return Err(ReplayError::CorruptFile {
                    detail: format!("no key frame at or before ordinal {ordinal}"),
                })
            }
            Err(after) => after - 1,
        };
        let (key_ordinal, offset) = self.contents.index[slot];
        let offset = usize::try_from(offset).map_err(|_| ReplayError::CorruptFile {
            detail: format!("key-frame offset {offset} unrepresentable"),
        })?;
        if offset >= self.contents.stream.len() {
            return Err(ReplayError::CorruptFile {
                detail: format!(
                    "key-frame offset {offset} past stream of {} byte(s)",
                    self.contents.stream.len()
                ),
            });
        }

        let mut cur = Cursor::new(&self.contents.stream[offset..]);
        let mut frame = decode_record(&mut cur, None)?;
        for _ in key_ordinal..ordinal {
            frame = decode_record(&mut cur, Some(&frame))?;
        }
        Ok(frame)
    }

    /// Iterate over every frame in recorded order.
    pub fn frames(&self) -> FrameIter<'_> {
        FrameIter {
            cursor: Cursor::new(&self.contents.stream),
            prev: None,
            remaining: self.contents.frame_count,
            failed: false,
        }
    }
}

/// Iterator over a replay's frames, in order.
pub struct FrameIter<'a> {
    cursor: Cursor<'a>,
    prev: Option<Frame>,
    remaining: u32,
    failed: bool,
}

impl Iterator for FrameIter<'_> {
    type Item = Result<Frame, ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.remaining == 0 {
            return None;
        }
        match decode_record(&mut self.cursor, self.prev.as_ref()) {
            Ok(frame) => {
                self.remaining -= 1;
                self.prev = Some(frame.clone());
                Some(Ok(frame))
            }
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::Recorder;
    use skirm_core::FrameId;
    use skirm_test_utils::fixtures;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("skirm_replay_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("game.skrp")
    }

    fn varied_frames(count: u32) -> Vec<Frame> {
        (0..count)
            .map(|i| {
                let mut frame =
                    fixtures::frame_with_units(i, &[(0, (i % 5) as usize), (1, 2)]);
                frame.battle_frame_count = i * 2;
                if i % 7 == 0 {
                    frame.deaths.push(skirm_core::UnitId(i as i32 + 1000));
                }
                frame
            })
            .collect()
    }

    fn record_and_load(
        name: &str,
        frames: &[Frame],
        interval: u32,
        compress: bool,
    ) -> Replay {
        let path = temp_path(name);
        let mut recorder = Recorder::new();
        recorder.set_key_frame_interval(interval).unwrap();
        recorder.start(fixtures::map(16, 16)).unwrap();
        for frame in frames {
            recorder.push(frame.clone()).unwrap();
        }
        recorder.save(&path, compress).unwrap();
        Replay::load(&path).unwrap()
    }

    #[test]
    fn roundtrip_across_intervals_and_compression() {
        let frames = varied_frames(30);
        for (interval, compress) in [(1, false), (1, true), (3, false), (7, true), (100, true)] {
            let name = format!("rt_{interval}_{compress}");
            let replay = record_and_load(&name, &frames, interval, compress);
            assert_eq!(replay.frame_count(), frames.len());
            assert_eq!(replay.map(), &fixtures::map(16, 16));
            let loaded: Vec<Frame> = replay.frames().map(|f| f.unwrap()).collect();
            assert_eq!(loaded, frames);
        }
    }

    #[test]
    fn random_access_matches_sequential() {
        let frames = varied_frames(25);
        let replay = record_and_load("random_access", &frames, 4, true);
        for index in [0usize, 1, 3, 4, 5, 12, 23, 24] {
            assert_eq!(replay.get_frame(index).unwrap(), frames[index]);
        }
    }

    #[test]
    fn out_of_range_index_rejected() {
        let frames = varied_frames(5);
        let replay = record_and_load("oob", &frames, 2, false);
        let err = replay.get_frame(5).unwrap_err();
        assert!(matches!(
            err,
            ReplayError::FrameOutOfRange { index: 5, len: 5 }
        ));
    }

    #[test]
    fn empty_recording_loads_with_no_frames() {
        let replay = record_and_load("empty", &[], 10, true);
        assert_eq!(replay.frame_count(), 0);
        assert!(replay.frames().next().is_none());
        assert!(replay.key_frame_index().is_empty());
    }

    #[test]
    fn first_frame_is_always_a_key_frame() {
        let frames = varied_frames(10);
        let replay = record_and_load("first_key", &frames, 1000, false);
        assert_eq!(replay.key_frame_index(), &[(0, 0)]);
        assert_eq!(replay.get_frame(0).unwrap(), frames[0]);
    }

    #[test]
    fn unit_peaks_survive_the_file() {
        let frames = varied_frames(10);
        let replay = record_and_load("peaks", &frames, 3, false);
        // Player 0 peaks at i % 5 == 4 units, player 1 is constant.
        assert!(replay
            .unit_peaks()
            .contains(&(skirm_core::PlayerId(0), 4)));
        assert!(replay
            .unit_peaks()
            .contains(&(skirm_core::PlayerId(1), 2)));
    }

    // The long-haul scenario: 5001 frames, interval 1000, compressed.
    #[test]
    fn long_recording_random_access_uses_the_index() {
        let frames: Vec<Frame> = (0..=5000u32)
            .map(|i| fixtures::frame_with_units(i, &[(0, 2)]))
            .collect();
        let replay = record_and_load("long", &frames, 1000, true);

        assert_eq!(replay.frame_count(), 5001);
        let ordinals: Vec<u32> = replay.key_frame_index().iter().map(|&(o, _)| o).collect();
        assert_eq!(ordinals, vec![0, 1000, 2000, 3000, 4000, 5000]);

        // Seeking to 2500 anchors at key frame 2000; frames 0..=1999
        // are not touched. The anchor is visible structurally: the
        // chosen index slot is (2000, offset).
        let frame = replay.get_frame(2500).unwrap();
        assert_eq!(frame.id, FrameId(2500));

        let loaded: Vec<Frame> = replay.frames().map(|f| f.unwrap()).collect();
        assert_eq!(loaded.len(), frames.len());
        assert_eq!(crate::verify::verify_frames(&frames, &loaded), None);
        assert!(crate::verify::verify_map(
            &fixtures::map(16, 16),
            replay.map()
        ));
    }
}
