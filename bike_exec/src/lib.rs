//! # Bike library.
//!
//! This library allows other crates in the workspace, and the benchmarks, to access items defined
//! inside the bike crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - per cycle data shared between the modules of the exec
pub mod data_store;

/// Localisation module - provides the bike's pose from simulation or a replayed log
pub mod loc;

/// Executable parameters
pub mod params;

/// Bike simulation - single-track model driven by the roll reference
pub mod sim;

/// Trajectory control module - keeps the bike on the given path
pub mod traj_ctrl;

/// Trajectory window manager - slides the reference window along the trajectory
pub mod traj_window;
