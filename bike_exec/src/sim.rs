//! # Bike simulation
//!
//! Kinematic single-track model used to close the loop around trajectory
//! control without hardware.
//!
//! The balance controller is assumed to track the roll reference perfectly,
//! so the steady-state relation used by the roll map is inverted to recover
//! the effective steering angle:
//!
//! ```text
//! tan(eff) = -tan(roll) * (lr + lf) * g / v^2
//! psi_dot  = v * tan(eff) / (lr + lf) = -tan(roll) * g / v
//! ```
//!
//! and the pose is Euler integrated at constant speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use crate::loc::{Pose, PoseEstimate};
use crate::traj_ctrl::BikeParams;
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct BikeSim {
    pose: Pose,
    speed_ms: f64,
    bike: BikeParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BikeSim {
    pub fn new(start_pose: Pose, speed_ms: f64, bike: BikeParams) -> Self {
        Self {
            pose: start_pose,
            speed_ms,
            bike,
        }
    }

    /// Current pose and speed.
    pub fn estimate(&self) -> PoseEstimate {
        PoseEstimate {
            pose: self.pose,
            speed_ms: self.speed_ms,
        }
    }

    /// Effective steering angle that holds the given roll at the current
    /// speed.
    pub fn effective_steer_rad(&self, roll_ref_rad: f64) -> f64 {
        if self.speed_ms <= 0.0 {
            return 0.0;
        }

        (-roll_ref_rad.tan() * self.bike.wheelbase_m() * self.bike.g / self.speed_ms.powi(2))
            .atan()
    }

    /// Advance the model by `dt_s` with the bike holding `roll_ref_rad`.
    pub fn step(&mut self, roll_ref_rad: f64, dt_s: f64) {
        let psi_dot_rads =
            self.speed_ms * self.effective_steer_rad(roll_ref_rad).tan() / self.bike.wheelbase_m();

        self.pose.x_m += self.speed_ms * self.pose.psi_rad.cos() * dt_s;
        self.pose.y_m += self.speed_ms * self.pose.psi_rad.sin() * dt_s;
        self.pose.psi_rad = wrap_pi(self.pose.psi_rad + psi_dot_rads * dt_s);
    }
}
