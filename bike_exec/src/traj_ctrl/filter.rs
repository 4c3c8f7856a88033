//! # Discrete state-space filter
//!
//! The feedforward steering path runs the heading-rate reference through a
//! discrete linear system
//!
//! ```text
//! y[k]   = C x[k] + D u[k]
//! x[k+1] = A x[k] + B u[k]
//! ```
//!
//! with a single input and output. The coefficients are read-only, the state
//! lives in a separate `FilterState` owned by whoever runs the filter so that
//! independent controllers never share it and tests can inject it directly.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::{Matrix1, RowSVector, RowVector1, SMatrix, SVector, Vector1};

// Internal
use super::params::FilterCoeffs;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Single-input single-output discrete filter with `N` states.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateSpaceFilter<const N: usize> {
    a: SMatrix<f64, N, N>,
    b: SVector<f64, N>,
    c: RowSVector<f64, N>,
    d: f64,
}

/// The internal state of a `StateSpaceFilter`.
///
/// Starts at zero and is advanced exactly once per filter step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterState<const N: usize> {
    pub x: SVector<f64, N>,
}

/// The heading-rate feedforward filter used by the tracker.
pub type HeadingRateFilter = StateSpaceFilter<1>;

/// State of the heading-rate feedforward filter.
pub type HeadingRateFilterState = FilterState<1>;

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<const N: usize> StateSpaceFilter<N> {
    pub fn new(
        a: SMatrix<f64, N, N>,
        b: SVector<f64, N>,
        c: RowSVector<f64, N>,
        d: f64,
    ) -> Self {
        Self { a, b, c, d }
    }

    /// Output for input `u` given the current (pre-update) state.
    pub fn output(&self, state: &FilterState<N>, u: f64) -> f64 {
        (self.c * state.x)[0] + self.d * u
    }

    /// State following `state` after input `u`.
    pub fn next_state(&self, state: &FilterState<N>, u: f64) -> FilterState<N> {
        FilterState {
            x: self.a * state.x + self.b * u,
        }
    }

    /// Advance the filter by one sample, returning the output computed from
    /// the state before the update.
    pub fn step(&self, state: &mut FilterState<N>, u: f64) -> f64 {
        let y = self.output(state, u);
        *state = self.next_state(state, u);
        y
    }
}

impl From<&FilterCoeffs> for HeadingRateFilter {
    fn from(coeffs: &FilterCoeffs) -> Self {
        Self::new(
            Matrix1::new(coeffs.ad),
            Vector1::new(coeffs.bd),
            RowVector1::new(coeffs.cd),
            coeffs.dd,
        )
    }
}

impl<const N: usize> Default for FilterState<N> {
    fn default() -> Self {
        Self {
            x: SVector::zeros(),
        }
    }
}

impl<const N: usize> FilterState<N> {
    pub fn new(x: SVector<f64, N>) -> Self {
        Self { x }
    }

    pub fn is_finite(&self) -> bool {
        self.x.iter().all(|v| v.is_finite())
    }
}

impl FilterState<1> {
    pub fn from_scalar(x: f64) -> Self {
        Self {
            x: Vector1::new(x),
        }
    }

    pub fn scalar(&self) -> f64 {
        self.x[0]
    }
}
