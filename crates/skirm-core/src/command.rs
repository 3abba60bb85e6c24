//! The outbound command set.
//!
//! Commands are a closed tagged-variant type: each kind has a fixed,
//! validated argument shape, so an arity mistake is unrepresentable
//! once a [`Command`] is constructed. The wire layer still validates
//! arity on the raw argument path, for callers that assemble batches
//! from untyped sources.

use std::fmt;

use crate::error::ConfigError;
use crate::id::{PlayerId, UnitId};
use crate::options::SessionOptions;

/// One action submitted to the engine.
///
/// A send operation owns an ordered sequence of commands; order is
/// preserved end to end. Commands are immutable once constructed.
///
/// # Examples
///
/// ```
/// use skirm_core::{Command, CommandKind, PlayerId, UnitId};
///
/// let spawn = Command::SpawnUnit {
///     player: PlayerId(0),
///     unit_type: 37,
///     x: 100,
///     y: 120,
/// };
/// assert_eq!(spawn.kind(), CommandKind::SpawnUnit);
/// assert_eq!(spawn.kind().arity(), 4);
///
/// let kill = Command::KillUnit { unit: UnitId(17) };
/// assert_eq!(kill.kind().arity(), 1);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    /// Spawn a new unit of `unit_type` for `player` at walk-tile (x, y).
    SpawnUnit {
        /// Owning player slot.
        player: PlayerId,
        /// Engine unit type code.
        unit_type: i32,
        /// Spawn x coordinate.
        x: i32,
        /// Spawn y coordinate.
        y: i32,
    },
    /// Remove an existing unit.
    KillUnit {
        /// The unit to remove.
        unit: UnitId,
    },
    /// Issue an order to a unit.
    UnitOrder {
        /// The unit receiving the order.
        unit: UnitId,
        /// Engine order type code.
        order_type: i32,
        /// Optional target unit; positional orders carry none.
        target: Option<UnitId>,
        /// Target x coordinate.
        x: i32,
        /// Target y coordinate.
        y: i32,
    },
    /// Update one session option, effective from the next frame boundary.
    SetOption(OptionValue),
    /// Enable or disable image capture in subsequent frames.
    RequestImage {
        /// Whether frames should embed an image buffer.
        enabled: bool,
    },
    /// Ask the engine process to shut down the session.
    Quit,
}

impl Command {
    /// The kind discriminant of this command.
    pub fn kind(&self) -> CommandKind {
        match self {
            Self::SpawnUnit { .. } => CommandKind::SpawnUnit,
            Self::KillUnit { .. } => CommandKind::KillUnit,
            Self::UnitOrder { .. } => CommandKind::UnitOrder,
            Self::SetOption(_) => CommandKind::SetOption,
            Self::RequestImage { .. } => CommandKind::RequestImage,
            Self::Quit => CommandKind::Quit,
        }
    }
}

/// Command kind discriminants with their declared argument shapes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// `SpawnUnit(player, unit_type, x, y)`
    SpawnUnit,
    /// `KillUnit(unit)`
    KillUnit,
    /// `UnitOrder(unit, order_type, target, x, y)`
    UnitOrder,
    /// `SetOption(option_code, value)`
    SetOption,
    /// `RequestImage(enabled)`
    RequestImage,
    /// `Quit()`
    Quit,
}

impl CommandKind {
    /// Wire code for this kind.
    pub fn code(self) -> u8 {
        match self {
            Self::SpawnUnit => 0,
            Self::KillUnit => 1,
            Self::UnitOrder => 2,
            Self::SetOption => 3,
            Self::RequestImage => 4,
            Self::Quit => 5,
        }
    }

    /// Look a kind up by wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::SpawnUnit),
            1 => Some(Self::KillUnit),
            2 => Some(Self::UnitOrder),
            3 => Some(Self::SetOption),
            4 => Some(Self::RequestImage),
            5 => Some(Self::Quit),
            _ => None,
        }
    }

    /// Declared argument count for this kind.
    pub fn arity(self) -> usize {
        match self {
            Self::SpawnUnit => 4,
            Self::KillUnit => 1,
            Self::UnitOrder => 5,
            Self::SetOption => 2,
            Self::RequestImage => 1,
            Self::Quit => 0,
        }
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SpawnUnit => "spawn-unit",
            Self::KillUnit => "kill-unit",
            Self::UnitOrder => "unit-order",
            Self::SetOption => "set-option",
            Self::RequestImage => "request-image",
            Self::Quit => "quit",
        };
        f.write_str(name)
    }
}

/// A single session option update.
///
/// Carried by [`Command::SetOption`]; applied by the engine from the
/// next frame boundary. Values round-trip through the wire format
/// unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptionValue {
    /// Minimum wall-clock delay between engine ticks; 0 = run as fast
    /// as possible.
    Speed(u32),
    /// Coalesce this many internal ticks into one reported frame.
    CombineFrames(u32),
    /// Whether the engine renders its own window.
    Gui(bool),
    /// Whether `receive()` suspends until a frame is ready.
    Blocking(bool),
    /// Cap on internal frames skipped without being reported.
    Frameskip(u32),
    /// Engine-side verbose logging.
    Logging(bool),
    /// Let the engine merge redundant unit orders within a batch.
    CommandOptimization(bool),
    /// Report all units regardless of visibility.
    MapHack(bool),
}

impl OptionValue {
    /// The option's wire name, used in error context.
    pub fn name(self) -> &'static str {
        match self {
            Self::Speed(_) => "speed",
            Self::CombineFrames(_) => "combine_frames",
            Self::Gui(_) => "gui",
            Self::Blocking(_) => "blocking",
            Self::Frameskip(_) => "frameskip",
            Self::Logging(_) => "logging",
            Self::CommandOptimization(_) => "command_optimization",
            Self::MapHack(_) => "map_hack",
        }
    }

    /// Wire code identifying the option.
    pub fn code(self) -> u8 {
        match self {
            Self::Speed(_) => 0,
            Self::CombineFrames(_) => 1,
            Self::Gui(_) => 2,
            Self::Blocking(_) => 3,
            Self::Frameskip(_) => 4,
            Self::Logging(_) => 5,
            Self::CommandOptimization(_) => 6,
            Self::MapHack(_) => 7,
        }
    }

    /// The option's scalar wire value.
    pub fn value(self) -> i32 {
        match self {
            Self::Speed(v) | Self::CombineFrames(v) | Self::Frameskip(v) => v as i32,
            Self::Gui(b)
            | Self::Blocking(b)
            | Self::Logging(b)
            | Self::CommandOptimization(b)
            | Self::MapHack(b) => b as i32,
        }
    }

    /// Reconstruct an option from its wire code and value.
    ///
    /// Returns `None` for an unknown code or an out-of-domain value.
    pub fn from_wire(code: u8, value: i32) -> Option<Self> {
        Self::try_from_wire(code, value)?.ok()
    }

    /// Like [`OptionValue::from_wire`], but distinguishes an unknown
    /// code (`None`) from a known option with an out-of-domain value
    /// ([`ConfigError::InvalidOption`]).
    pub fn try_from_wire(code: u8, value: i32) -> Option<Result<Self, ConfigError>> {
        let unsigned = |name: &'static str, build: fn(u32) -> Self| match u32::try_from(value) {
            Ok(v) => Ok(build(v)),
            Err(_) => Err(ConfigError::InvalidOption {
                name,
                reason: format!("expected a non-negative value, got {value}"),
            }),
        };
        let boolean = |name: &'static str, build: fn(bool) -> Self| match value {
            0 => Ok(build(false)),
            1 => Ok(build(true)),
            _ => Err(ConfigError::InvalidOption {
                name,
                reason: format!("expected 0 or 1, got {value}"),
            }),
        };
        Some(match code {
            0 => unsigned("speed", Self::Speed),
            1 => unsigned("combine_frames", Self::CombineFrames),
            2 => boolean("gui", Self::Gui),
            3 => boolean("blocking", Self::Blocking),
            4 => unsigned("frameskip", Self::Frameskip),
            5 => boolean("logging", Self::Logging),
            6 => boolean("command_optimization", Self::CommandOptimization),
            7 => boolean("map_hack", Self::MapHack),
            _ => return None,
        })
    }

    /// Apply this update onto an option set.
    ///
    /// The update is validated against the resulting set as a whole;
    /// on rejection the original set is left untouched.
    pub fn apply(self, options: &mut SessionOptions) -> Result<(), ConfigError> {
        let mut next = options.clone();
        match self {
            Self::Speed(v) => next.speed = v,
            Self::CombineFrames(v) => next.combine_frames = v,
            Self::Gui(b) => next.gui = b,
            Self::Blocking(b) => next.blocking = b,
            Self::Frameskip(v) => next.frameskip = v,
            Self::Logging(b) => next.logging = b,
            Self::CommandOptimization(b) => next.command_optimization = b,
            Self::MapHack(b) => next.map_hack = b,
        }
        next.validate()?;
        *options = next;
        Ok(())
    }
}
