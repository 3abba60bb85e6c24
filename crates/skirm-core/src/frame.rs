//! The per-tick frame snapshot.

use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::id::{FrameId, PlayerId, UnitId};
use crate::unit::Unit;

/// One reported game-state snapshot.
///
/// A frame is an immutable value once decoded; ownership passes to
/// whichever component consumes it. Unit lists are full snapshots,
/// keyed by player slot in an [`IndexMap`] so iteration order is
/// deterministic; the replay codec depends on that for
/// byte-identical re-encoding.
///
/// # Examples
///
/// ```
/// use skirm_core::{Frame, FrameId, PlayerId, Unit, UnitId};
///
/// let mut frame = Frame::new(FrameId(12));
/// frame
///     .units
///     .entry(PlayerId(0))
///     .or_default()
///     .push(Unit::new(UnitId(1), PlayerId(0), 37, 10, 10));
/// assert_eq!(frame.unit_count(), 1);
/// assert!(frame.find_unit(UnitId(1)).is_some());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// Frame sequence number.
    pub id: FrameId,
    /// Unit snapshots per player slot.
    pub units: IndexMap<PlayerId, Vec<Unit>>,
    /// Status flags; absent flags in older protocol versions decode
    /// as false.
    pub flags: StatusFlags,
    /// Frames elapsed within the current battle (micro-battle mode).
    pub battle_frame_count: u32,
    /// Units destroyed since the previous reported frame. Inline for
    /// the common case of a handful of deaths per frame.
    pub deaths: SmallVec<[UnitId; 4]>,
    /// Raw screen capture, when image capture is enabled.
    pub image: Option<ImageBuffer>,
}

impl Frame {
    /// An empty frame with the given sequence number.
    pub fn new(id: FrameId) -> Self {
        Self {
            id,
            units: IndexMap::new(),
            flags: StatusFlags::default(),
            battle_frame_count: 0,
            deaths: SmallVec::new(),
            image: None,
        }
    }

    /// Total unit count across all players.
    pub fn unit_count(&self) -> usize {
        self.units.values().map(Vec::len).sum()
    }

    /// Find a unit by id in any player's list.
    pub fn find_unit(&self, id: UnitId) -> Option<&Unit> {
        self.units
            .values()
            .flat_map(|units| units.iter())
            .find(|u| u.id == id)
    }
}

/// Status flags reported with each frame.
///
/// The battle flags are only populated when micro-battles mode was
/// negotiated at handshake; outside that mode they stay false.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StatusFlags {
    /// The game has ended.
    pub game_ended: bool,
    /// A battle ended at this frame (micro-battle mode).
    pub battle_just_ended: bool,
    /// The battle that just ended was won (micro-battle mode).
    pub battle_won: bool,
    /// The engine is waiting for a restart command (micro-battle mode).
    pub waiting_for_restart: bool,
}

impl StatusFlags {
    /// Pack into a wire bitmask.
    pub fn to_bits(self) -> u8 {
        (self.game_ended as u8)
            | (self.battle_just_ended as u8) << 1
            | (self.battle_won as u8) << 2
            | (self.waiting_for_restart as u8) << 3
    }

    /// Unpack from a wire bitmask. Unknown high bits are ignored so
    /// newer engines can add flags without breaking older clients.
    pub fn from_bits(bits: u8) -> Self {
        Self {
            game_ended: bits & 1 != 0,
            battle_just_ended: bits & 2 != 0,
            battle_won: bits & 4 != 0,
            waiting_for_restart: bits & 8 != 0,
        }
    }
}

/// Raw pixel buffer embedded in a frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImageBuffer {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Channels per pixel (3 for RGB).
    pub channels: u8,
    /// Row-major pixel bytes, `width * height * channels` long.
    pub pixels: Vec<u8>,
}

impl ImageBuffer {
    /// Whether the pixel buffer length matches the declared dimensions.
    pub fn is_consistent(&self) -> bool {
        let expected = self.width as usize * self.height as usize * self.channels as usize;
        self.pixels.len() == expected
    }
}
