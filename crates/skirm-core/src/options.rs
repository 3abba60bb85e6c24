//! Session options negotiated with the engine.

use crate::error::ConfigError;

/// Mutable per-session options.
///
/// The engine starts a session with [`SessionOptions::default`] and
/// applies changes as option commands arrive. Every mutation goes
/// through [`SessionOptions::validate`] so an invalid request can never
/// leave a half-applied option set behind.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionOptions {
    /// Milliseconds of delay the engine inserts between frames.
    /// 0 runs as fast as possible.
    pub speed: u32,
    /// How many engine frames are folded into one delivered frame.
    /// Must be at least 1.
    pub combine_frames: u32,
    /// Whether the engine renders a GUI.
    pub gui: bool,
    /// Whether the engine waits for this client's commands each frame.
    pub blocking: bool,
    /// Engine frames to skip between observations when non-blocking.
    /// 0 means "every frame" and is only meaningful when blocking.
    pub frameskip: u32,
    /// Engine-side command logging.
    pub logging: bool,
    /// Merge compatible orders issued in the same batch.
    pub command_optimization: bool,
    /// Reveal the full map regardless of fog of war.
    pub map_hack: bool,
    /// Whether the engine segments play into scripted micro battles.
    pub micro_battles: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            speed: 0,
            combine_frames: 1,
            gui: false,
            blocking: true,
            frameskip: 1,
            logging: false,
            command_optimization: false,
            map_hack: false,
            micro_battles: false,
        }
    }
}

impl SessionOptions {
    /// Check cross-field invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.combine_frames == 0 {
            return Err(ConfigError::InvalidCombineFrames { requested: 0 });
        }
        if self.frameskip == 0 && !self.blocking {
            return Err(ConfigError::FrameskipZeroNonBlocking);
        }
        Ok(())
    }
}
