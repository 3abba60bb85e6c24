//! Frame pacing configuration.
//!
//! Pacing values are engine-side options; the client forwards them as
//! option commands and they take effect at the next frame boundary.

use skirm_core::{ConfigError, OptionValue, SessionOptions};

/// How the engine paces frames toward this client.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Pacing {
    /// Milliseconds of delay between engine ticks; 0 runs unthrottled.
    pub speed: u32,
    /// Engine ticks folded into one delivered frame. At least 1.
    pub combine_frames: u32,
    /// Whether the engine waits for this client's commands each frame.
    pub blocking: bool,
    /// Engine frames skipped between observations when non-blocking.
    pub frameskip: u32,
}

impl Default for Pacing {
    fn default() -> Self {
        let opts = SessionOptions::default();
        Self {
            speed: opts.speed,
            combine_frames: opts.combine_frames,
            blocking: opts.blocking,
            frameskip: opts.frameskip,
        }
    }
}

impl Pacing {
    /// Extract the pacing slice of a full option set.
    pub fn from_options(options: &SessionOptions) -> Self {
        Self {
            speed: options.speed,
            combine_frames: options.combine_frames,
            blocking: options.blocking,
            frameskip: options.frameskip,
        }
    }

    /// Check pacing invariants before any I/O happens.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.combine_frames == 0 {
            return Err(ConfigError::InvalidCombineFrames { requested: 0 });
        }
        if self.frameskip == 0 && !self.blocking {
            return Err(ConfigError::FrameskipZeroNonBlocking);
        }
        Ok(())
    }

    /// The option updates that carry this pacing to the engine.
    pub fn option_values(&self) -> [OptionValue; 4] {
        [
            OptionValue::Speed(self.speed),
            OptionValue::CombineFrames(self.combine_frames),
            OptionValue::Blocking(self.blocking),
            OptionValue::Frameskip(self.frameskip),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_matches_session_defaults() {
        assert_eq!(Pacing::default(), Pacing::from_options(&SessionOptions::default()));
        assert!(Pacing::default().validate().is_ok());
    }

    #[test]
    fn frameskip_zero_non_blocking_rejected() {
        let pacing = Pacing {
            frameskip: 0,
            blocking: false,
            ..Pacing::default()
        };
        assert!(matches!(
            pacing.validate(),
            Err(ConfigError::FrameskipZeroNonBlocking)
        ));
    }

    #[test]
    fn option_values_roundtrip_through_apply() {
        let pacing = Pacing {
            speed: 50,
            combine_frames: 3,
            blocking: true,
            frameskip: 2,
        };
        let mut options = SessionOptions::default();
        for value in pacing.option_values() {
            value.apply(&mut options).unwrap();
        }
        assert_eq!(Pacing::from_options(&options), pacing);
    }
}
