//! # Trajectory control module
//!
//! Trajectory control keeps the bike on the reference path by producing a
//! roll reference for the balance controller once per cycle.
//!
//! The path arrives as a short window of waypoints `(X, Y, Psi)` in which
//! index 0 is behind the bike. Each cycle the tracker:
//!
//!  1. Climbs forward from index 1 to the closest waypoint.
//!  1. Picks which waypoint's heading to track. Once the bike's projection
//!     onto the path has passed the closest point the next point's heading
//!     is used, which removes the jump in heading error at the crossing.
//!  1. Computes the lateral error `e1` (signed distance from the path
//!     tangent) and heading error `e2`.
//!  1. Converts the heading change between the closest point and the next
//!     into a heading rate reference using the time to traverse the segment
//!     at the current speed.
//!  1. Sums a saturated feedback on `e1`/`e2` with a feedforward of the
//!     heading rate shaped by a discrete filter, and limits the result to
//!     +/- 45 degrees of steering.
//!
//! The steering reference is then mapped onto the roll angle a single-track
//! vehicle needs to hold the same turn at the current speed.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod filter;
pub mod params;
pub mod roll_map;
pub mod state;
pub mod tracker;
pub mod window;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use filter::*;
pub use params::{BikeParams, FilterCoeffs, Params, TrajParams};
pub use roll_map::steer_to_roll;
pub use state::*;
pub use tracker::*;
pub use window::*;

use util::{archive::ArchiveError, params::LoadError};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum number of points in a window.
///
/// The search starts at index 1 and needs the points either side of the
/// closest point, plus one to climb into.
pub const MIN_WINDOW_LEN: usize = 4;

/// Steering reference limit.
///
/// Units: radians
pub const MAX_STEER_RAD: f64 = std::f64::consts::FRAC_PI_4;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error)]
pub enum TrajCtrlError {
    #[error("Could not load parameters: {0}")]
    ParamLoadError(LoadError),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Could not open or write the archives: {0}")]
    ArchiveError(ArchiveError),

    /// The window holds fewer than `MIN_WINDOW_LEN` points.
    #[error("Trajectory window has {len} points, the tracker needs at least 4")]
    WindowTooShort { len: usize },

    /// The parallel arrays making up a window differ in length.
    #[error("Trajectory window arrays differ in length (X: {x}, Y: {y}, Psi: {psi})")]
    MismatchedWindow { x: usize, y: usize, psi: usize },

    /// The inputs make the control law singular this cycle.
    #[error("Degenerate input: {0}")]
    DegenerateInput(DegenerateCause),

    /// The closest point search reached the end of the window without the
    /// distance starting to increase.
    #[error("Tracking lost: closest point search ran off the end of the {len} point window")]
    TrackingLost { len: usize },
}

/// The numerical degeneracy behind a `TrajCtrlError::DegenerateInput`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DegenerateCause {
    #[error("speed must be positive")]
    NonPositiveSpeed,

    #[error("pose, speed or trajectory window is not finite")]
    NonFiniteInput,

    #[error("bike shares its X coordinate with the point behind the closest point")]
    UndefinedBearing,

    #[error("segment ahead of the closest point has zero traversal time")]
    CoincidentWaypoints,

    #[error("steering, roll or filter state is not finite")]
    NonFiniteOutput,
}
