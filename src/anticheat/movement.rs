//! Server-side movement validation.
//!
//! Validation is a soft signal: the clamped position is always accepted, but
//! failures are counted per player and surface as a correction rate for
//! higher layers to act on.

use crate::game::constants::{in_bounds, movement, validation};
use crate::util::vec2::Vec2;

/// Why a movement update failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementFault {
    OutOfBounds,
    SpeedExceeded,
    PositionMismatch,
}

impl MovementFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementFault::OutOfBounds => "out_of_bounds",
            MovementFault::SpeedExceeded => "speed_exceeded",
            MovementFault::PositionMismatch => "position_mismatch",
        }
    }
}

/// Tunable validation thresholds.
#[derive(Debug, Clone, Copy)]
pub struct ValidationConfig {
    /// Multiplier of tolerance on the applicable speed cap
    pub speed_tolerance: f64,
    /// Relative tolerance on `new - old` vs `velocity * dt`
    pub consistency_tolerance: f64,
    /// Displacement under which the consistency check is skipped
    pub min_displacement: f64,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            speed_tolerance: validation::SPEED_TOLERANCE,
            consistency_tolerance: validation::CONSISTENCY_TOLERANCE,
            min_displacement: validation::CONSISTENCY_MIN_DISPLACEMENT,
        }
    }
}

/// Validates one movement update against bounds, speed and consistency.
#[derive(Debug, Clone, Copy, Default)]
pub struct MovementValidator {
    config: ValidationConfig,
}

impl MovementValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// The speed cap that applies to the player's current movement mode.
    pub fn max_speed(is_rolling: bool, is_sprinting: bool) -> f64 {
        if is_rolling {
            movement::ROLL_VELOCITY
        } else if is_sprinting {
            movement::SPRINT_SPEED
        } else {
            movement::MOVE_SPEED
        }
    }

    /// Validate a movement update. `Ok(())` means the update is clean.
    pub fn validate(
        &self,
        old: Vec2,
        new: Vec2,
        velocity: Vec2,
        dt: f64,
        is_rolling: bool,
        is_sprinting: bool,
    ) -> Result<(), MovementFault> {
        if !in_bounds(new) {
            return Err(MovementFault::OutOfBounds);
        }

        let max_speed = Self::max_speed(is_rolling, is_sprinting);
        if velocity.length() > max_speed * self.config.speed_tolerance {
            return Err(MovementFault::SpeedExceeded);
        }

        let expected = velocity * dt;
        let displacement = expected.length();
        if displacement > self.config.min_displacement {
            let error = (new - old - expected).length();
            if error > displacement * self.config.consistency_tolerance {
                return Err(MovementFault::PositionMismatch);
            }
        }

        Ok(())
    }
}

/// Correction rate above which the loop logs an anti-cheat warning.
pub fn over_correction_threshold(rate: f64) -> bool {
    rate > validation::CORRECTION_WARN_RATE
}
