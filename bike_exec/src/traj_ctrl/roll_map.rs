//! Steering to roll mapping

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use super::BikeParams;

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a steering reference into the roll reference for the balance
/// controller.
///
/// The steering angle is projected through the steering axis angle to give
/// the effective steer, which together with the speed sets the curvature of
/// the turn. The returned roll is the steady-state lean of a single-track
/// vehicle in that turn, negated to match the balance controller's sign
/// convention.
///
/// No limit is applied, the steering reference is already limited.
pub fn steer_to_roll(steer_ref_rad: f64, speed_ms: f64, bike: &BikeParams) -> f64 {
    let eff_steer_rad = steer_ref_rad * bike.lambda_rad.sin();

    -(eff_steer_rad.tan() * (speed_ms.powi(2) / bike.wheelbase_m()) / bike.g).atan()
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn bike() -> BikeParams {
        BikeParams {
            g: 9.81,
            lr_m: 0.4,
            lf_m: 0.7,
            lambda_rad: 1.2217,
        }
    }

    #[test]
    fn test_zero_steer_gives_zero_roll() {
        assert_eq!(steer_to_roll(0.0, 3.0, &bike()), 0.0);
    }

    #[test]
    fn test_odd_symmetry() {
        for delta in [0.01, 0.1, 0.3, std::f64::consts::FRAC_PI_4].iter() {
            for v in [0.5, 2.0, 5.0].iter() {
                assert_abs_diff_eq!(
                    steer_to_roll(-delta, *v, &bike()),
                    -steer_to_roll(*delta, *v, &bike()),
                    epsilon = 1e-15
                );
            }
        }
    }

    #[test]
    fn test_known_value() {
        let b = bike();
        let delta = 0.1;
        let v = 3.0;

        let eff = delta * b.lambda_rad.sin();
        let expected = -(eff.tan() * v * v / (b.lr_m + b.lf_m) / b.g).atan();

        assert_abs_diff_eq!(steer_to_roll(delta, v, &b), expected, epsilon = 1e-15);

        // Positive steer leans the reference negative
        assert!(steer_to_roll(delta, v, &b) < 0.0);
    }

    #[test]
    fn test_roll_grows_with_speed() {
        let b = bike();
        let slow = steer_to_roll(0.1, 1.0, &b).abs();
        let fast = steer_to_roll(0.1, 4.0, &b).abs();
        assert!(fast > slow);
        assert!(fast < std::f64::consts::FRAC_PI_2);
    }
}
