//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a player slot within a game.
///
/// The engine assigns slots at handshake time; slot numbering is
/// stable for the duration of the game. Neutral units carry the
/// `neutral_id` reported in the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PlayerId(pub u8);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for PlayerId {
    fn from(v: u8) -> Self {
        Self(v)
    }
}

/// Identifies a unit.
///
/// Stable across frames until the unit is destroyed; the engine may
/// recycle ids afterwards, so a `UnitId` is only meaningful relative
/// to a frame sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UnitId(pub i32);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i32> for UnitId {
    fn from(v: i32) -> Self {
        Self(v)
    }
}

/// Frame sequence number as reported by the engine.
///
/// Monotonically increasing across one game. With combine-frames
/// negotiated, consecutive reported frames differ by the combine
/// count rather than by one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameId(pub u32);

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FrameId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}
