//! Per-frame unit snapshot model.

use crate::id::{PlayerId, UnitId};

/// One unit as reported in a single frame.
///
/// A `Unit` is owned by the [`Frame`](crate::frame::Frame) that
/// reports it; frames hold full snapshots, not diffs, so identity
/// across frames is carried only by [`UnitId`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Unit {
    /// Stable identifier until the unit is destroyed.
    pub id: UnitId,
    /// Owning player slot.
    pub player: PlayerId,
    /// Engine unit type code.
    pub unit_type: i32,
    /// Position x, in walk tiles.
    pub x: i32,
    /// Position y, in walk tiles.
    pub y: i32,
    /// Optional per-type attributes.
    pub attrs: UnitAttributes,
}

/// Optional per-type attributes of a unit.
///
/// Absent attributes are omitted on the wire via presence flags;
/// buildings, for example, report no energy, and neutral resource
/// nodes report no order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct UnitAttributes {
    /// Current hit points.
    pub health: Option<i32>,
    /// Maximum hit points.
    pub max_health: Option<i32>,
    /// Current shield points.
    pub shield: Option<i32>,
    /// Current energy.
    pub energy: Option<i32>,
    /// The order the unit is currently executing.
    pub order: Option<UnitOrder>,
}

/// The order a unit is executing, as reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnitOrder {
    /// Engine order type code.
    pub order_type: i32,
    /// Target unit, if the order has one.
    pub target: Option<UnitId>,
    /// Order target x coordinate.
    pub target_x: i32,
    /// Order target y coordinate.
    pub target_y: i32,
}

impl Unit {
    /// Construct a unit with no optional attributes set.
    pub fn new(id: UnitId, player: PlayerId, unit_type: i32, x: i32, y: i32) -> Self {
        Self {
            id,
            player,
            unit_type,
            x,
            y,
            attrs: UnitAttributes::default(),
        }
    }
}
