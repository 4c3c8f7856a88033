//! # Localisation module
//!
//! This module provides the pose of the bike to the rest of the exec. The
//! on-board estimator is not part of this software, instead the pose comes
//! from one of two stand-ins:
//!
//!  - `PoseSource::Sim` runs a single-track model closed loop with the roll
//!    reference produced by trajectory control.
//!  - `PoseSource::Replay` plays back a recorded estimator log, one row per
//!    cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use serde::{Deserialize, Serialize};
use std::path::Path;

// Internal
use crate::sim::BikeSim;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The current pose of the bike in the trajectory frame.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position along the X axis
    pub x_m: f64,

    /// Position along the Y axis
    pub y_m: f64,

    /// Heading, anticlockwise from the positive X axis
    pub psi_rad: f64,
}

/// A pose along with the forward speed of the bike.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    pub pose: Pose,

    /// Forward speed
    ///
    /// Units: meters/second
    pub speed_ms: f64,
}

/// Plays back poses from an estimator log.
#[derive(Debug, Clone)]
pub struct PoseReplay {
    estimates: Vec<PoseEstimate>,
    next: usize,
}

/// Row layout of an estimator log.
#[derive(Debug, Deserialize)]
struct ReplayRow {
    x_m: f64,
    y_m: f64,
    psi_rad: f64,
    v_ms: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where the exec gets its pose from.
pub enum PoseSource {
    Sim(BikeSim),
    Replay(PoseReplay),
}

#[derive(Debug, thiserror::Error)]
pub enum LocError {
    #[error("Could not read the pose replay file: {0}")]
    ReplayLoadError(csv::Error),

    #[error("The pose replay file contains no rows")]
    EmptyReplay,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    pub fn new(x_m: f64, y_m: f64, psi_rad: f64) -> Self {
        Self { x_m, y_m, psi_rad }
    }

    pub fn is_finite(&self) -> bool {
        self.x_m.is_finite() && self.y_m.is_finite() && self.psi_rad.is_finite()
    }
}

impl PoseReplay {
    /// Load an estimator log with columns `x_m,y_m,psi_rad,v_ms`.
    pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Self, LocError> {
        let reader = csv::Reader::from_path(path).map_err(LocError::ReplayLoadError)?;

        Self::from_reader(reader)
    }

    fn from_reader<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<Self, LocError> {
        let mut estimates = Vec::new();

        for row in reader.deserialize() {
            let row: ReplayRow = row.map_err(LocError::ReplayLoadError)?;
            estimates.push(PoseEstimate {
                pose: Pose::new(row.x_m, row.y_m, row.psi_rad),
                speed_ms: row.v_ms,
            });
        }

        if estimates.is_empty() {
            return Err(LocError::EmptyReplay);
        }

        debug!("Loaded {} replay poses", estimates.len());

        Ok(Self { estimates, next: 0 })
    }

    /// Number of rows in the log.
    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// Get the next estimate, or `None` once the log is exhausted.
    pub fn next_estimate(&mut self) -> Option<PoseEstimate> {
        let estimate = self.estimates.get(self.next).copied();
        if estimate.is_some() {
            self.next += 1;
        }
        estimate
    }
}

impl PoseSource {
    /// Get the pose estimate for this cycle.
    ///
    /// `None` means the source has nothing more to give and the run should
    /// end.
    pub fn get(&mut self) -> Option<PoseEstimate> {
        match self {
            PoseSource::Sim(sim) => Some(sim.estimate()),
            PoseSource::Replay(replay) => replay.next_estimate(),
        }
    }

    /// Apply the roll reference for the given time step.
    ///
    /// Only the simulation reacts, a replay is open loop.
    pub fn apply_roll_ref(&mut self, roll_ref_rad: f64, dt_s: f64) {
        if let PoseSource::Sim(sim) = self {
            sim.step(roll_ref_rad, dt_s);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_replay_plays_rows_in_order() {
        let data = "x_m,y_m,psi_rad,v_ms\n0.0,0.0,0.0,2.0\n0.2,0.01,0.05,2.1\n";
        let mut replay =
            PoseReplay::from_reader(csv::Reader::from_reader(data.as_bytes())).unwrap();

        assert_eq!(replay.len(), 2);

        let first = replay.next_estimate().unwrap();
        assert_eq!(first.pose, Pose::new(0.0, 0.0, 0.0));
        assert_eq!(first.speed_ms, 2.0);

        let second = replay.next_estimate().unwrap();
        assert_eq!(second.pose, Pose::new(0.2, 0.01, 0.05));

        assert!(replay.next_estimate().is_none());
        assert!(replay.next_estimate().is_none());
    }

    #[test]
    fn test_replay_errors() {
        let header_only = "x_m,y_m,psi_rad,v_ms\n";
        assert!(matches!(
            PoseReplay::from_reader(csv::Reader::from_reader(header_only.as_bytes())),
            Err(LocError::EmptyReplay)
        ));

        let bad = "x_m,y_m,psi_rad,v_ms\n0.0,zero,0.0,1.0\n";
        assert!(matches!(
            PoseReplay::from_reader(csv::Reader::from_reader(bad.as_bytes())),
            Err(LocError::ReplayLoadError(_))
        ));

        assert!(matches!(
            PoseReplay::load_csv("/nonexistent/replay.csv"),
            Err(LocError::ReplayLoadError(_))
        ));
    }

    #[test]
    fn test_replay_source_ignores_roll() {
        let data = "x_m,y_m,psi_rad,v_ms\n1.0,2.0,0.0,3.0\n";
        let replay = PoseReplay::from_reader(csv::Reader::from_reader(data.as_bytes())).unwrap();
        let mut source = PoseSource::Replay(replay);

        source.apply_roll_ref(0.3, 0.1);
        let est = source.get().unwrap();
        assert_eq!(est.pose, Pose::new(1.0, 2.0, 0.0));
        assert!(source.get().is_none());
    }

    #[test]
    fn test_pose_is_finite() {
        assert!(Pose::new(1.0, -2.0, 0.5).is_finite());
        assert!(!Pose::new(f64::NAN, 0.0, 0.0).is_finite());
        assert!(!Pose::new(0.0, f64::INFINITY, 0.0).is_finite());
    }

    #[test]
    fn test_shipped_replay_loads() {
        let mut replay = PoseReplay::load_csv(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../data/replay_straight.csv"
        ))
        .unwrap();

        assert_eq!(replay.len(), 300);

        let first = replay.next_estimate().unwrap();
        assert!(first.pose.is_finite());
        assert_eq!(first.speed_ms, 3.0);
    }
}
