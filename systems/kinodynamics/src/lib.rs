#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Closed-form time-of-arrival estimates for bounded-acceleration,
//! bounded-velocity motion.
//!
//! [`time_cost`] solves the one-dimensional problem; [`ApproachProfile`]
//! sums a heading term and a distance term into the scalar cost that both
//! post assignment and leader arbitration rank agents by.

use team_tasking_core::{MotionState, Vec2};

/// Translation speed assumed for an agent heading to a post.
pub const TRANSLATION_SPEED_ESTIMATE: f32 = 75.0;

/// Extra time charged when a standing agent has to start walking.
pub const STAND_TO_WALK_PENALTY: f32 = 2.0;

/// Distance below which a standing agent is considered already in place.
pub const STAND_TO_WALK_DISTANCE: f32 = 750.0;

/// Acceleration and velocity limits of one motion axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MotionBounds {
    /// Largest attainable acceleration magnitude.
    pub max_accel: f32,
    /// Largest attainable velocity magnitude.
    pub max_vel: f32,
}

impl MotionBounds {
    /// Limits of the turning axis, in radians.
    pub const HEADING: Self = Self {
        max_accel: 0.2,
        max_vel: 0.25,
    };

    /// Limits of the walking axis, in field units.
    pub const TRANSLATION: Self = Self {
        max_accel: 16.0,
        max_vel: 220.0,
    };
}

/// Minimum time to move from `(x0, v0)` to `(xf, vf)` under `bounds`.
///
/// The acceleration sign is chosen from the velocity delta, the position
/// delta and the distance covered while changing velocity at full
/// acceleration. When the velocity bound is reached the trapezoidal profile
/// time is returned, otherwise the triangular profile is solved in closed
/// form. A negative discriminant in the triangular case yields `0.0`; ranking
/// code treats that value as "no cost" rather than as infeasible.
#[must_use]
pub fn time_cost(x0: f32, v0: f32, xf: f32, vf: f32, bounds: MotionBounds) -> f32 {
    let a = acceleration(x0, v0, xf, vf, bounds.max_accel);
    if a == 0.0 {
        return 0.0;
    }

    let t1 = (a.signum() * bounds.max_vel - v0) / a;
    let k3 = t1 + (v0 + vf) / a;
    let t2 = -((-a / 2.0) * k3 * k3 + a * t1 * k3 + v0 * k3 - (a / 2.0) * t1 * t1 + x0 - xf)
        / (a * t1 + v0);

    // cruise segment t2 - t1 exists only when the velocity bound is reached
    if t2 - t1 >= 0.0 {
        return t2 + k3;
    }

    let c3 = (v0 - vf) / a;
    let c4 = 2.0 * v0 / a;
    let delta = c4 * c4 + 2.0 * c3 * c3 - 4.0 * ((v0 * c3) - (xf - x0)) / a;

    if delta > 0.0 {
        c3 - c4 + delta.sqrt()
    } else if delta == 0.0 {
        c3 - c4
    } else {
        0.0
    }
}

fn acceleration(x0: f32, v0: f32, xf: f32, vf: f32, max_accel: f32) -> f32 {
    let dx = xf - x0;

    if vf > v0 {
        if xf > x0 {
            let dx_min = (vf * vf - v0 * v0) / (2.0 * max_accel);
            if dx < dx_min {
                -max_accel
            } else {
                max_accel
            }
        } else {
            -max_accel
        }
    } else if vf < v0 {
        if xf < x0 {
            let dx_min = (vf * vf - v0 * v0) / (-2.0 * max_accel);
            if dx < dx_min {
                -max_accel
            } else {
                max_accel
            }
        } else {
            max_accel
        }
    } else if dx > 0.0 {
        max_accel
    } else if dx < 0.0 {
        -max_accel
    } else {
        0.0
    }
}

/// Parameters of the heading-plus-distance approach cost.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ApproachProfile {
    /// Initial speed along the distance axis.
    pub initial_speed: f32,
}

impl ApproachProfile {
    /// Profile used when ranking agents against formation posts.
    pub const TO_POST: Self = Self {
        initial_speed: TRANSLATION_SPEED_ESTIMATE,
    };

    /// Profile used when ranking agents by time to the ball.
    pub const TO_BALL: Self = Self { initial_speed: 0.0 };

    /// Seconds needed to turn toward and walk to `local_target`, given in the
    /// agent's own frame.
    ///
    /// `motion` is the agent's locomotion state when known; a standing agent
    /// with a target farther than [`STAND_TO_WALK_DISTANCE`] pays
    /// [`STAND_TO_WALK_PENALTY`].
    #[must_use]
    pub fn cost(&self, local_target: Vec2, motion: Option<MotionState>) -> f32 {
        let distance = local_target.length();
        let heading = local_target.y.atan2(local_target.x);

        let turn = time_cost(heading, 0.0, 0.0, 0.0, MotionBounds::HEADING);
        let walk = time_cost(
            distance,
            self.initial_speed,
            0.0,
            0.0,
            MotionBounds::TRANSLATION,
        );

        let start = match motion {
            Some(MotionState::Standing) if distance > STAND_TO_WALK_DISTANCE => {
                STAND_TO_WALK_PENALTY
            }
            _ => 0.0,
        };

        turn + walk + start
    }
}
