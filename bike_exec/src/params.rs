//! # Bike Executable Parameters
//!
//! This module provide parameters for the bike executable.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::loc::Pose;

// ---------------------------------------------------------------------------
// STRUCTS
// ---------------------------------------------------------------------------

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BikeExecParams {
    /// Target period of one cycle
    pub cycle_period_s: f64,

    /// Number of reference points given to trajectory control each cycle
    pub window_len: usize,

    /// Number of consecutive trajectory control errors tolerated before
    /// safe mode is entered
    pub max_consec_traj_ctrl_errors: u64,

    /// Starting pose of the simulated bike
    pub sim_start_pose: Pose,

    /// Constant forward speed of the simulated bike
    pub sim_speed_ms: f64,
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse() {
        let params: BikeExecParams = util::params::parse(
            r#"
            cycle_period_s = 0.01
            window_len = 10
            max_consec_traj_ctrl_errors = 5
            sim_speed_ms = 3.0

            [sim_start_pose]
            x_m = 0.0
            y_m = 0.2
            psi_rad = 0.0
            "#,
        )
        .unwrap();

        assert_eq!(params.window_len, 10);
        assert_eq!(params.max_consec_traj_ctrl_errors, 5);
        assert_eq!(params.sim_start_pose, Pose::new(0.0, 0.2, 0.0));
    }

    #[test]
    fn test_shipped_params_load() {
        let params: BikeExecParams = util::params::load_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/bike_exec.toml"
        ))
        .unwrap();

        assert!(params.cycle_period_s > 0.0);
        assert!(params.window_len >= crate::traj_ctrl::MIN_WINDOW_LEN);
    }
}
