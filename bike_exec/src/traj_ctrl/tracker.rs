//! # Trajectory tracker
//!
//! This module holds the tracking control law: the closest point search, the
//! error calculations and the combined feedback/feedforward steering law.
//! None of it allocates, and every loop is bounded by the window length.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{
    DegenerateCause, HeadingRateFilter, HeadingRateFilterState, LocalTrajectory, TrajCtrlError,
    TrajParams, MAX_STEER_RAD,
};
use crate::loc::Pose;
use util::maths::{clamp, dist, dist_sq, limit_ang_diff, sign, wrap_pi};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Result of one tracker cycle.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct TrackerOutput {
    /// Limited steering reference.
    ///
    /// Units: radians
    pub steer_ref_rad: f64,

    /// Index of the point behind the closest point. The window manager
    /// shifts the window forward by this many points.
    pub closest_point_idx: usize,

    /// Errors and intermediate terms of this cycle.
    pub errors: TrackingErrors,

    /// Feedback steering contribution.
    ///
    /// Units: radians
    pub delta_error_rad: f64,

    /// Feedforward steering contribution.
    ///
    /// Units: radians
    pub delta_psi_rad: f64,

    /// True if the lateral error was above its saturation limit.
    pub lat_error_saturated: bool,

    /// True if the steering reference hit its limit.
    pub steer_saturated: bool,
}

/// Tracking errors against the window.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct TrackingErrors {
    /// Index of the closest point in the window.
    pub closest_idx: usize,

    /// Index of the point whose heading is tracked.
    pub heading_idx: usize,

    /// Lateral error, positive when the bike is to the left of the path.
    ///
    /// Units: meters
    pub e1_m: f64,

    /// Heading error in `[-pi, pi)`.
    ///
    /// Units: radians
    pub e2_rad: f64,

    /// Heading rate reference between the closest and next points.
    ///
    /// Units: radians/second
    pub dpsiref_rads: f64,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run one cycle of the tracker.
///
/// On success the filter state has been advanced by exactly one step. On
/// error it is left untouched.
pub fn compute(
    window: &LocalTrajectory,
    pose: &Pose,
    speed_ms: f64,
    traj_params: &TrajParams,
    filter: &HeadingRateFilter,
    filter_state: &mut HeadingRateFilterState,
) -> Result<TrackerOutput, TrajCtrlError> {
    window.check_len()?;

    if !window.is_finite() || !pose.is_finite() || !speed_ms.is_finite() {
        return Err(TrajCtrlError::DegenerateInput(DegenerateCause::NonFiniteInput));
    }
    if speed_ms <= 0.0 {
        return Err(TrajCtrlError::DegenerateInput(DegenerateCause::NonPositiveSpeed));
    }

    let errors = calc_tracking_errors(window, pose, speed_ms)?;

    // ---- FEEDBACK ----

    let (delta_error_rad, lat_error_saturated) =
        calc_feedback_steer(errors.e1_m, errors.e2_rad, traj_params);

    // ---- FEEDFORWARD ----

    let delta_psi_rad = filter.output(filter_state, errors.dpsiref_rads);
    let next_state = filter.next_state(filter_state, errors.dpsiref_rads);

    // ---- TOTAL ----

    let steer_unlim_rad = delta_psi_rad + delta_error_rad;
    let steer_ref_rad = clamp(steer_unlim_rad, -MAX_STEER_RAD, MAX_STEER_RAD);
    let steer_saturated = steer_unlim_rad >= MAX_STEER_RAD || steer_unlim_rad <= -MAX_STEER_RAD;

    if !steer_ref_rad.is_finite() || !next_state.is_finite() {
        return Err(TrajCtrlError::DegenerateInput(DegenerateCause::NonFiniteOutput));
    }

    *filter_state = next_state;

    trace!(
        "closest {} heading {} e1 {:.4} e2 {:.4} dpsiref {:.4} steer {:.4}",
        errors.closest_idx,
        errors.heading_idx,
        errors.e1_m,
        errors.e2_rad,
        errors.dpsiref_rads,
        steer_ref_rad
    );

    Ok(TrackerOutput {
        steer_ref_rad,
        closest_point_idx: errors.closest_idx - 1,
        errors,
        delta_error_rad,
        delta_psi_rad,
        lat_error_saturated,
        steer_saturated,
    })
}

/// Calculate the tracking errors and heading rate reference for the pose.
///
/// The window length and speed must already have been checked.
fn calc_tracking_errors(
    window: &LocalTrajectory,
    pose: &Pose,
    speed_ms: f64,
) -> Result<TrackingErrors, TrajCtrlError> {
    let x = window.x_m();
    let y = window.y_m();
    let psi = window.psi_rad();

    let closest_idx = find_closest_point(window, pose)?;
    let heading_idx = select_heading_index(window, pose, closest_idx)?;

    // ---- LATERAL AND HEADING ERRORS ----

    let dx = pose.x_m - x[closest_idx];
    let dy = pose.y_m - y[closest_idx];
    let psi_ref = psi[heading_idx];

    let e1_m = dy * psi_ref.cos() - dx * psi_ref.sin();
    let e2_rad = wrap_pi(pose.psi_rad - psi_ref);

    // ---- HEADING RATE REFERENCE ----

    let d_psiref = limit_ang_diff(psi[closest_idx + 1] - psi[closest_idx]);

    // Time to traverse the segment ahead of the closest point
    let seg_len_m = dist(
        x[closest_idx + 1],
        y[closest_idx + 1],
        x[closest_idx],
        y[closest_idx],
    );
    let ts_psi_s = seg_len_m / speed_ms;

    if ts_psi_s == 0.0 {
        return Err(TrajCtrlError::DegenerateInput(DegenerateCause::CoincidentWaypoints));
    }

    let dpsiref_rads = d_psiref / ts_psi_s;

    Ok(TrackingErrors {
        closest_idx,
        heading_idx,
        e1_m,
        e2_rad,
        dpsiref_rads,
    })
}

/// Find the closest point by climbing forward from index 1.
///
/// The search advances while the next point is at least as close as the
/// current one, so it assumes distance along the window first falls then
/// rises. A window which doubles back on itself can lock onto the wrong
/// point.
///
/// The returned index always has a point after it. If the climb reaches the
/// last point the bike is beyond the window and `TrackingLost` is returned.
fn find_closest_point(window: &LocalTrajectory, pose: &Pose) -> Result<usize, TrajCtrlError> {
    let x = window.x_m();
    let y = window.y_m();
    let len = window.len();

    let mut idx = 1;

    loop {
        if idx + 1 >= len {
            return Err(TrajCtrlError::TrackingLost { len });
        }

        let curr_dist_sq = dist_sq(x[idx], y[idx], pose.x_m, pose.y_m);
        let next_dist_sq = dist_sq(x[idx + 1], y[idx + 1], pose.x_m, pose.y_m);

        if curr_dist_sq >= next_dist_sq {
            idx += 1;
        } else {
            break;
        }
    }

    Ok(idx)
}

/// Select the point whose heading is tracked.
///
/// The distance from the point behind the closest point to the bike is
/// projected onto the closest point's heading. If that projection reaches
/// the length of the segment, the bike has passed the closest point and the
/// next point's heading is used.
fn select_heading_index(
    window: &LocalTrajectory,
    pose: &Pose,
    closest_idx: usize,
) -> Result<usize, TrajCtrlError> {
    let x = window.x_m();
    let y = window.y_m();
    let psi = window.psi_rad();
    let prev_idx = closest_idx - 1;

    let prev_dx = x[prev_idx] - pose.x_m;
    if prev_dx == 0.0 {
        return Err(TrajCtrlError::DegenerateInput(DegenerateCause::UndefinedBearing));
    }

    let prev_dist_m = dist(x[prev_idx], y[prev_idx], pose.x_m, pose.y_m);

    // Angle of the line between the previous point and the bike
    let alpha_star_rad = ((y[prev_idx] - pose.y_m) / prev_dx).atan();

    let projected_dist_m = (prev_dist_m * (alpha_star_rad - psi[closest_idx]).cos()).abs();
    let seg_len_m = dist(x[closest_idx], y[closest_idx], x[prev_idx], y[prev_idx]);

    if projected_dist_m >= seg_len_m {
        Ok(closest_idx + 1)
    } else {
        Ok(closest_idx)
    }
}

/// Feedback steering from the tracking errors.
///
/// The lateral error is saturated at `e1_max_m` before its gain is applied.
/// Returns the steering contribution and whether the lateral error was
/// saturated.
pub fn calc_feedback_steer(e1_m: f64, e2_rad: f64, traj_params: &TrajParams) -> (f64, bool) {
    let lat_error_saturated = e1_m.abs() > traj_params.e1_max_m;

    let delta_error_rad = -traj_params.k1 * sign(e1_m) * e1_m.abs().min(traj_params.e1_max_m)
        - traj_params.k2 * e2_rad;

    (delta_error_rad, lat_error_saturated)
}
