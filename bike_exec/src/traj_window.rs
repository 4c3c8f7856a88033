//! # Trajectory window manager
//!
//! Holds the full reference trajectory and hands trajectory control a short
//! window of it each cycle. The window slides forward by the number of points
//! trajectory control reports the bike has moved past, so index 0 of the
//! window always stays just behind the bike.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, info};
use std::path::Path;

// Internal
use crate::traj_ctrl::{LocalTrajectory, Waypoint, MIN_WINDOW_LEN};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A complete reference trajectory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefTrajectory {
    points: Vec<Waypoint>,
}

/// Slides a fixed length window along a reference trajectory.
#[derive(Debug, Clone)]
pub struct TrajWindowMgr {
    traj: RefTrajectory,

    /// Index into the trajectory of the first window point
    start: usize,

    window_len: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of filling a window.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WindowStatus {
    /// The window holds at least the minimum number of points.
    Filled,

    /// Too few points remain ahead of the bike to track.
    EndOfTrajectory,
}

#[derive(Debug, thiserror::Error)]
pub enum WindowError {
    #[error("Could not read the reference trajectory: {0}")]
    LoadError(csv::Error),

    #[error("Reference trajectory has {0} points, at least 4 are needed")]
    TrajectoryTooShort(usize),

    #[error("Reference trajectory point {0} is not finite")]
    NonFinitePoint(usize),

    #[error("Window length {0} is below the minimum of 4")]
    WindowTooShort(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RefTrajectory {
    /// Build a trajectory from a list of points.
    pub fn new(points: Vec<Waypoint>) -> Result<Self, WindowError> {
        if points.len() < MIN_WINDOW_LEN {
            return Err(WindowError::TrajectoryTooShort(points.len()));
        }

        if let Some(idx) = points
            .iter()
            .position(|p| !(p.x_m.is_finite() && p.y_m.is_finite() && p.psi_rad.is_finite()))
        {
            return Err(WindowError::NonFinitePoint(idx));
        }

        Ok(Self { points })
    }

    /// Load a trajectory from a CSV file with columns `x_m,y_m,psi_rad`.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self, WindowError> {
        let reader = csv::Reader::from_path(path).map_err(WindowError::LoadError)?;

        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, WindowError> {
        let points = reader
            .deserialize()
            .collect::<Result<Vec<Waypoint>, csv::Error>>()
            .map_err(WindowError::LoadError)?;

        debug!("Read {} reference trajectory points", points.len());

        Self::new(points)
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[Waypoint] {
        &self.points
    }
}

impl TrajWindowMgr {
    pub fn new(traj: RefTrajectory, window_len: usize) -> Result<Self, WindowError> {
        if window_len < MIN_WINDOW_LEN {
            return Err(WindowError::WindowTooShort(window_len));
        }

        info!(
            "Window manager tracking {} points with a {} point window",
            traj.len(),
            window_len
        );

        Ok(Self {
            traj,
            start: 0,
            window_len,
        })
    }

    /// Refill `window` with the points from the current start.
    ///
    /// Near the end of the trajectory the window is shorter than the
    /// configured length. Once fewer than the minimum remain
    /// `EndOfTrajectory` is returned and the window is left empty.
    pub fn fill(&self, window: &mut LocalTrajectory) -> WindowStatus {
        let points = self.traj.points();
        let start = self.start.min(points.len());
        let end = (start + self.window_len).min(points.len());

        if end - start < MIN_WINDOW_LEN {
            window.refill(std::iter::empty::<&Waypoint>());
            return WindowStatus::EndOfTrajectory;
        }

        window.refill(points[start..end].iter());

        WindowStatus::Filled
    }

    /// Shift the window forward by the given number of points.
    pub fn advance(&mut self, closest_point_idx: usize) {
        self.start = self.start.saturating_add(closest_point_idx);
    }

    /// Index into the trajectory of the first window point.
    pub fn start(&self) -> usize {
        self.start
    }

    pub fn window_len(&self) -> usize {
        self.window_len
    }

    /// Number of trajectory points from the window start to the end.
    pub fn remaining(&self) -> usize {
        self.traj.len().saturating_sub(self.start)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn line(n: usize) -> RefTrajectory {
        RefTrajectory::new(
            (0..n)
                .map(|i| Waypoint {
                    x_m: i as f64,
                    y_m: 0.0,
                    psi_rad: 0.0,
                })
                .collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_load_from_csv() {
        let data = "x_m,y_m,psi_rad\n0,0,0\n0.5,0,0\n1.0,0.1,0.2\n1.5,0.3,0.4\n";
        let traj = RefTrajectory::from_reader(csv::Reader::from_reader(data.as_bytes())).unwrap();

        assert_eq!(traj.len(), 4);
        assert_eq!(
            traj.points()[2],
            Waypoint {
                x_m: 1.0,
                y_m: 0.1,
                psi_rad: 0.2
            }
        );
    }

    #[test]
    fn test_load_errors() {
        let short = "x_m,y_m,psi_rad\n0,0,0\n1,0,0\n";
        assert!(matches!(
            RefTrajectory::from_reader(csv::Reader::from_reader(short.as_bytes())),
            Err(WindowError::TrajectoryTooShort(2))
        ));

        let bad = "x_m,y_m,psi_rad\n0,0,0\n1,zero,0\n";
        assert!(matches!(
            RefTrajectory::from_reader(csv::Reader::from_reader(bad.as_bytes())),
            Err(WindowError::LoadError(_))
        ));

        let mut points = line(5).points().to_vec();
        points[3].psi_rad = f64::NAN;
        assert!(matches!(
            RefTrajectory::new(points),
            Err(WindowError::NonFinitePoint(3))
        ));
    }

    #[test]
    fn test_window_len_checked() {
        assert!(matches!(
            TrajWindowMgr::new(line(10), 3),
            Err(WindowError::WindowTooShort(3))
        ));
    }

    #[test]
    fn test_fill_and_advance() {
        let mut mgr = TrajWindowMgr::new(line(10), 5).unwrap();
        let mut window = LocalTrajectory::with_capacity(5);

        assert_eq!(mgr.fill(&mut window), WindowStatus::Filled);
        assert_eq!(window.x_m(), &[0.0, 1.0, 2.0, 3.0, 4.0]);

        mgr.advance(2);
        assert_eq!(mgr.start(), 2);
        assert_eq!(mgr.fill(&mut window), WindowStatus::Filled);
        assert_eq!(window.x_m(), &[2.0, 3.0, 4.0, 5.0, 6.0]);

        // Truncated near the end
        mgr.advance(4);
        assert_eq!(mgr.fill(&mut window), WindowStatus::Filled);
        assert_eq!(window.x_m(), &[6.0, 7.0, 8.0, 9.0]);

        mgr.advance(1);
        assert_eq!(mgr.remaining(), 3);
        assert_eq!(mgr.fill(&mut window), WindowStatus::EndOfTrajectory);
        assert!(window.is_empty());
    }

    #[test]
    fn test_advance_past_end() {
        let mut mgr = TrajWindowMgr::new(line(6), 4).unwrap();
        let mut window = LocalTrajectory::default();

        mgr.advance(100);
        assert_eq!(mgr.remaining(), 0);
        assert_eq!(mgr.fill(&mut window), WindowStatus::EndOfTrajectory);
    }

    #[test]
    fn test_shipped_trajectory_loads() {
        let traj = RefTrajectory::load_csv(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../data/ref_traj.csv"
        ))
        .unwrap();

        assert!(traj.len() > 10);
        assert!(traj
            .points()
            .iter()
            .all(|p| p.psi_rad >= -std::f64::consts::PI && p.psi_rad < std::f64::consts::PI));
    }
}
