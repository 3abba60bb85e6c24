//! Replay recording.
//!
//! [`Recorder`] buffers the frames a session observes and persists
//! them with [`Recorder::save`]. Pushing is amortized O(1) and never
//! touches the disk; all encoding happens at save time.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use log::{debug, info};
use skirm_core::{Frame, MapData, PlayerId};

use crate::codec::{encode_file, encode_record_delta, encode_record_key};
use crate::delta::diff;
use crate::error::ReplayError;
use crate::DEFAULT_KEY_FRAME_INTERVAL;

/// Buffers frames and writes the replay file.
///
/// # Examples
///
/// ```no_run
/// use skirm_core::{Frame, FrameId, Grid, MapData};
/// use skirm_replay::Recorder;
///
/// let map = MapData {
///     name: "crossing".into(),
///     walkability: Grid::zeroed(8, 8),
///     ground_height: Grid::zeroed(8, 8),
///     buildability: Grid::zeroed(8, 8),
///     start_locations: vec![(1, 1), (6, 6)],
/// };
///
/// let mut recorder = Recorder::new();
/// recorder.set_key_frame_interval(100).unwrap();
/// recorder.start(map).unwrap();
/// for i in 0..500u32 {
///     recorder.push(Frame::new(FrameId(i))).unwrap();
/// }
/// recorder.save("game.skrp", true).unwrap();
/// ```
#[derive(Debug)]
pub struct Recorder {
    map: Option<MapData>,
    frames: Vec<Frame>,
    key_frame_interval: u32,
    unit_peaks: IndexMap<PlayerId, u32>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new()
    }
}

impl Recorder {
    /// A recorder with the default key-frame interval, not yet
    /// started.
    pub fn new() -> Self {
        Self {
            map: None,
            frames: Vec::new(),
            key_frame_interval: DEFAULT_KEY_FRAME_INTERVAL,
            unit_peaks: IndexMap::new(),
        }
    }

    /// Set the key-frame interval: every n-th pushed frame is stored
    /// as a full snapshot. 1 makes every frame a key frame. The first
    /// frame is always a key frame regardless.
    pub fn set_key_frame_interval(&mut self, interval: u32) -> Result<(), ReplayError> {
        if interval == 0 {
            return Err(ReplayError::InvalidKeyFrameInterval { requested: 0 });
        }
        self.key_frame_interval = interval;
        Ok(())
    }

    /// Begin a recording with the game's static map data.
    pub fn start(&mut self, map: MapData) -> Result<(), ReplayError> {
        if self.map.is_some() {
            return Err(ReplayError::AlreadyStarted);
        }
        debug!("recording started on map '{}'", map.name);
        self.map = Some(map);
        Ok(())
    }

    /// Whether a recording is active.
    pub fn is_started(&self) -> bool {
        self.map.is_some()
    }

    /// Append one frame to the recording.
    pub fn push(&mut self, frame: Frame) -> Result<(), ReplayError> {
        if self.map.is_none() {
            return Err(ReplayError::NotStarted);
        }
        for (&player, units) in &frame.units {
            let peak = self.unit_peaks.entry(player).or_insert(0);
            *peak = (*peak).max(units.len() as u32);
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Frames buffered since the last save.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Peak unit count seen per player across all pushed frames.
    pub fn unit_peaks(&self) -> &IndexMap<PlayerId, u32> {
        &self.unit_peaks
    }

    /// Encode the recording and write it to `path`.
    ///
    /// The file is written to a temporary sibling path, synced, and
    /// renamed into place, so a failure leaves no partial file at the
    /// target. On success the frame buffer is drained; on failure it
    /// is left intact for a retry.
    pub fn save(&mut self, path: impl AsRef<Path>, compress: bool) -> Result<(), ReplayError> {
        let map = self.map.as_ref().ok_or(ReplayError::NotStarted)?;

        let mut stream = Vec::new();
        let mut index = Vec::new();
        for (ordinal, frame) in self.frames.iter().enumerate() {
            if ordinal as u32 % self.key_frame_interval == 0 {
                index.push((ordinal as u32, stream.len() as u64));
                encode_record_key(&mut stream, frame);
            } else {
                let delta = diff(&self.frames[ordinal - 1], frame);
                encode_record_delta(&mut stream, &delta);
            }
        }

        let unit_peaks: Vec<(PlayerId, u32)> =
            self.unit_peaks.iter().map(|(&p, &n)| (p, n)).collect();
        let bytes = encode_file(
            map,
            self.key_frame_interval,
            &unit_peaks,
            self.frames.len() as u32,
            &index,
            &stream,
            compress,
        );

        atomic_write(path.as_ref(), &bytes)?;
        info!(
            "saved {} frame(s), {} key frame(s), {} byte(s) to {}",
            self.frames.len(),
            index.len(),
            bytes.len(),
            path.as_ref().display()
        );
        self.frames.clear();
        Ok(())
    }

    /// Discard the recording and return to the pre-`start` state. The
    /// configured key-frame interval is kept.
    pub fn reset(&mut self) {
        self.map = None;
        self.frames.clear();
        self.unit_peaks.clear();
    }
}

/// Write-rename so a crash mid-write cannot leave a truncated file at
/// the target path.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(&tmp)?;
    file.write_all(data)?;
    file.sync_all()?;
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use skirm_core::FrameId;
    use skirm_test_utils::fixtures;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("skirm_recorder_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir.join("game.skrp")
    }

    #[test]
    fn push_before_start_rejected() {
        let mut recorder = Recorder::new();
        let err = recorder.push(Frame::new(FrameId(0))).unwrap_err();
        assert!(matches!(err, ReplayError::NotStarted));
    }

    #[test]
    fn double_start_rejected_until_reset() {
        let mut recorder = Recorder::new();
        recorder.start(fixtures::map(8, 8)).unwrap();
        assert!(matches!(
            recorder.start(fixtures::map(8, 8)),
            Err(ReplayError::AlreadyStarted)
        ));
        recorder.reset();
        recorder.start(fixtures::map(8, 8)).unwrap();
    }

    #[test]
    fn zero_interval_rejected() {
        let mut recorder = Recorder::new();
        assert!(matches!(
            recorder.set_key_frame_interval(0),
            Err(ReplayError::InvalidKeyFrameInterval { requested: 0 })
        ));
        recorder.set_key_frame_interval(1).unwrap();
    }

    #[test]
    fn unit_peaks_track_maximum() {
        let mut recorder = Recorder::new();
        recorder.start(fixtures::map(8, 8)).unwrap();
        recorder
            .push(fixtures::frame_with_units(0, &[(0, 2), (1, 5)]))
            .unwrap();
        recorder
            .push(fixtures::frame_with_units(1, &[(0, 4), (1, 1)]))
            .unwrap();
        assert_eq!(recorder.unit_peaks().get(&PlayerId(0)), Some(&4));
        assert_eq!(recorder.unit_peaks().get(&PlayerId(1)), Some(&5));
    }

    #[test]
    fn save_drains_buffer_and_leaves_no_temp_file() {
        let path = temp_path("drain");
        let mut recorder = Recorder::new();
        recorder.start(fixtures::map(8, 8)).unwrap();
        for i in 0..10 {
            recorder
                .push(fixtures::frame_with_units(i, &[(0, 1)]))
                .unwrap();
        }
        recorder.save(&path, false).unwrap();
        assert_eq!(recorder.frame_count(), 0);
        assert!(path.exists());
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        assert!(!Path::new(&tmp).exists());
    }

    #[test]
    fn save_before_start_rejected() {
        let path = temp_path("not_started");
        let mut recorder = Recorder::new();
        let err = recorder.save(&path, false).unwrap_err();
        assert!(matches!(err, ReplayError::NotStarted));
        assert!(!path.exists());
    }

    #[test]
    fn identical_recordings_save_byte_identical_files() {
        let record = |name: &str| {
            let path = temp_path(name);
            let mut recorder = Recorder::new();
            recorder.set_key_frame_interval(3).unwrap();
            recorder.start(fixtures::map(8, 8)).unwrap();
            for i in 0..20 {
                recorder
                    .push(fixtures::frame_with_units(i, &[(0, 3), (1, 2)]))
                    .unwrap();
            }
            recorder.save(&path, true).unwrap();
            fs::read(&path).unwrap()
        };
        assert_eq!(record("det_a"), record("det_b"));
    }
}
