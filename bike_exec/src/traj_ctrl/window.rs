//! # Local trajectory window
//!
//! The tracker only ever sees a short window of the reference trajectory,
//! refilled every cycle by the window manager. Waypoints are stored as three
//! parallel arrays so the packed `[X.., Y.., Psi..]` layout used by planners
//! maps straight onto it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::{TrajCtrlError, MIN_WINDOW_LEN};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single reference point with the heading the path has there.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x_m: f64,
    pub y_m: f64,
    pub psi_rad: f64,
}

/// Ordered window of waypoints, index 0 behind the bike.
///
/// The arrays always have equal length, which is the window length.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LocalTrajectory {
    x_m: Vec<f64>,
    y_m: Vec<f64>,
    psi_rad: Vec<f64>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LocalTrajectory {
    /// Create an empty window able to hold `capacity` points without
    /// reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            x_m: Vec::with_capacity(capacity),
            y_m: Vec::with_capacity(capacity),
            psi_rad: Vec::with_capacity(capacity),
        }
    }

    /// Build a window from three parallel arrays.
    pub fn from_arrays(
        x_m: &[f64],
        y_m: &[f64],
        psi_rad: &[f64],
    ) -> Result<Self, TrajCtrlError> {
        if x_m.len() != y_m.len() || x_m.len() != psi_rad.len() {
            return Err(TrajCtrlError::MismatchedWindow {
                x: x_m.len(),
                y: y_m.len(),
                psi: psi_rad.len(),
            });
        }

        let window = Self {
            x_m: x_m.to_vec(),
            y_m: y_m.to_vec(),
            psi_rad: psi_rad.to_vec(),
        };
        window.check_len()?;

        Ok(window)
    }

    /// Build a window from the packed layout `[X[0..n], Y[0..n], Psi[0..n]]`.
    ///
    /// The point count `num_points` is given explicitly and must match the
    /// packed buffer.
    pub fn from_packed(packed: &[f64], num_points: usize) -> Result<Self, TrajCtrlError> {
        if num_points.checked_mul(3) != Some(packed.len()) {
            return Err(TrajCtrlError::MismatchedWindow {
                x: num_points,
                y: num_points,
                psi: packed.len().saturating_sub(num_points.saturating_mul(2)),
            });
        }

        let (x_m, rest) = packed.split_at(num_points);
        let (y_m, psi_rad) = rest.split_at(num_points);

        Self::from_arrays(x_m, y_m, psi_rad)
    }

    /// Build a window from a sequence of waypoints.
    pub fn from_waypoints<'a, I>(points: I) -> Result<Self, TrajCtrlError>
    where
        I: IntoIterator<Item = &'a Waypoint>,
    {
        let mut window = Self::default();
        window.refill(points);
        window.check_len()?;

        Ok(window)
    }

    /// Replace the contents of the window, reusing its allocation.
    ///
    /// No length check is made, the tracker checks the length each cycle.
    pub fn refill<'a, I>(&mut self, points: I)
    where
        I: IntoIterator<Item = &'a Waypoint>,
    {
        self.x_m.clear();
        self.y_m.clear();
        self.psi_rad.clear();

        for p in points {
            self.x_m.push(p.x_m);
            self.y_m.push(p.y_m);
            self.psi_rad.push(p.psi_rad);
        }
    }

    /// Number of points in the window.
    pub fn len(&self) -> usize {
        self.x_m.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x_m.is_empty()
    }

    /// Error if the window is too short for the tracker.
    pub fn check_len(&self) -> Result<(), TrajCtrlError> {
        if self.len() < MIN_WINDOW_LEN {
            Err(TrajCtrlError::WindowTooShort { len: self.len() })
        } else {
            Ok(())
        }
    }

    /// True if every coordinate and heading in the window is finite.
    pub fn is_finite(&self) -> bool {
        self.x_m
            .iter()
            .chain(self.y_m.iter())
            .chain(self.psi_rad.iter())
            .all(|v| v.is_finite())
    }

    /// Get the waypoint at the given index, if it exists.
    pub fn get(&self, idx: usize) -> Option<Waypoint> {
        if idx < self.len() {
            Some(Waypoint {
                x_m: self.x_m[idx],
                y_m: self.y_m[idx],
                psi_rad: self.psi_rad[idx],
            })
        } else {
            None
        }
    }

    pub fn x_m(&self) -> &[f64] {
        &self.x_m
    }

    pub fn y_m(&self) -> &[f64] {
        &self.y_m
    }

    pub fn psi_rad(&self) -> &[f64] {
        &self.psi_rad
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_from_packed() {
        let packed = [0.0, 1.0, 2.0, 3.0, 0.0, 0.1, 0.2, 0.3, 0.0, 0.0, 0.1, 0.1];
        let window = LocalTrajectory::from_packed(&packed, 4).unwrap();

        assert_eq!(window.len(), 4);
        assert_eq!(window.x_m(), &[0.0, 1.0, 2.0, 3.0]);
        assert_eq!(window.y_m(), &[0.0, 0.1, 0.2, 0.3]);
        assert_eq!(
            window.get(2),
            Some(Waypoint { x_m: 2.0, y_m: 0.2, psi_rad: 0.1 })
        );
        assert_eq!(window.get(4), None);
    }

    #[test]
    fn test_window_length_checks() {
        assert!(matches!(
            LocalTrajectory::from_packed(&[0.0; 9], 3),
            Err(TrajCtrlError::WindowTooShort { len: 3 })
        ));
        assert!(matches!(
            LocalTrajectory::from_packed(&[0.0; 11], 4),
            Err(TrajCtrlError::MismatchedWindow { .. })
        ));
        assert!(matches!(
            LocalTrajectory::from_arrays(&[0.0; 4], &[0.0; 4], &[0.0; 5]),
            Err(TrajCtrlError::MismatchedWindow { x: 4, y: 4, psi: 5 })
        ));
    }

    #[test]
    fn test_packed_count_overflow() {
        assert!(matches!(
            LocalTrajectory::from_packed(&[0.0; 12], usize::MAX),
            Err(TrajCtrlError::MismatchedWindow { .. })
        ));
    }

    #[test]
    fn test_is_finite() {
        let mut window = LocalTrajectory::from_packed(&[0.0; 12], 4).unwrap();
        assert!(window.is_finite());

        let points = [
            Waypoint::default(),
            Waypoint { y_m: f64::INFINITY, ..Default::default() },
        ];
        window.refill(points.iter());
        assert!(!window.is_finite());
    }

    #[test]
    fn test_refill_reuses_buffer() {
        let points: Vec<Waypoint> = (0..6)
            .map(|i| Waypoint { x_m: i as f64, ..Default::default() })
            .collect();

        let mut window = LocalTrajectory::with_capacity(6);
        window.refill(points.iter());
        assert_eq!(window.len(), 6);

        window.refill(points[2..4].iter());
        assert_eq!(window.x_m(), &[2.0, 3.0]);
        assert!(window.check_len().is_err());
    }
}
