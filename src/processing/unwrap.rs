//! Angle unwrapping and multi-turn counting
//!
//! A resolver reports its absolute angle wrapped into (-π, π]. [`TurnCounter`]
//! follows successive samples, takes the short way round between each pair
//! and accumulates the result as a continuous turn count.
//!
//! # Limitation
//!
//! The short-path correction assumes the true displacement between two
//! samples is below half a turn. A larger displacement (a skipped sample, a
//! transient fault) is read as a smaller move in the opposite direction.
//! Steps close to half a turn are flagged as ambiguous in [`UnwrapStep`] but
//! are never corrected.

use std::f64::consts::{PI, TAU};

/// Default magnitude above which a step is flagged as ambiguous
pub const DEFAULT_AMBIGUOUS_THRESHOLD: f64 = 0.75 * PI;

/// Normalize an angle into (-π, π]. Values already in range are returned as is.
pub fn wrap_angle(angle: f64) -> f64 {
    if angle > -PI && angle <= PI {
        return angle;
    }
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}

/// Apply a single ±2π correction so the delta takes the short way round
///
/// For two angles in (-π, π] the raw delta lies in (-2π, 2π), so one
/// correction is always enough.
pub fn minimal_wrap(delta: f64) -> f64 {
    if delta > PI {
        delta - TAU
    } else if delta < -PI {
        delta + TAU
    } else {
        delta
    }
}

/// Result of feeding one angle into a [`TurnCounter`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnwrapStep {
    /// Minimally-wrapped delta in radians, `None` for the first sample
    pub delta: Option<f64>,
    /// Accumulated turns after this sample
    pub turns: f64,
    /// The step was close enough to half a turn that its direction is uncertain
    pub ambiguous: bool,
}

/// Continuous turn counter over wrapped angle samples
#[derive(Debug, Clone)]
pub struct TurnCounter {
    previous_angle: Option<f64>,
    accumulated_turns: f64,
    ambiguous_threshold: f64,
    ambiguous_steps: u64,
}

impl TurnCounter {
    /// Create a counter with the default ambiguity threshold
    pub fn new() -> Self {
        Self::with_ambiguous_threshold(DEFAULT_AMBIGUOUS_THRESHOLD)
    }

    /// Create a counter that flags steps larger than `threshold` radians
    pub fn with_ambiguous_threshold(threshold: f64) -> Self {
        Self {
            previous_angle: None,
            accumulated_turns: 0.0,
            ambiguous_threshold: threshold,
            ambiguous_steps: 0,
        }
    }

    /// Feed the next angle sample
    pub fn update(&mut self, angle: f64) -> UnwrapStep {
        let Some(previous) = self.previous_angle.replace(angle) else {
            return UnwrapStep {
                delta: None,
                turns: self.accumulated_turns,
                ambiguous: false,
            };
        };

        let delta = minimal_wrap(angle - previous);
        self.accumulated_turns += delta / TAU;

        let ambiguous = delta.abs() > self.ambiguous_threshold;
        if ambiguous {
            self.ambiguous_steps += 1;
            tracing::warn!(
                "Angle step of {:.3} rad is near half a turn; direction may be misread",
                delta
            );
        }

        UnwrapStep {
            delta: Some(delta),
            turns: self.accumulated_turns,
            ambiguous,
        }
    }

    /// Accumulated turns so far
    pub fn turns(&self) -> f64 {
        self.accumulated_turns
    }

    /// Last angle seen
    pub fn previous_angle(&self) -> Option<f64> {
        self.previous_angle
    }

    /// Number of steps flagged as ambiguous since the last reset
    pub fn ambiguous_steps(&self) -> u64 {
        self.ambiguous_steps
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.previous_angle = None;
        self.accumulated_turns = 0.0;
        self.ambiguous_steps = 0;
    }
}

impl Default for TurnCounter {
    fn default() -> Self {
        Self::new()
    }
}
