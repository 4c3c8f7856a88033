//! # Data Store

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{error, warn};
use serde::Serialize;

use crate::{loc::PoseEstimate, traj_ctrl};

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Gives the reason the bike has been put into safe mode
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum SafeModeCause {
    TrajCtrlErrorLimit,
}

/// Why the main loop stopped.
#[derive(Debug, Eq, PartialEq, Copy, Clone, Serialize)]
pub enum EndReason {
    EndOfTrajectory,
    PoseSourceExhausted,
    MaxCyclesReached,
    SafeMode,
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Global data store for the executable.
#[derive(Default)]
pub struct DataStore {
    // Cycle management
    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Session elapsed time
    pub elapsed_s: f64,

    // Safe mode variables
    /// Determines if the bike is in safe mode.
    pub safe: bool,

    /// Gives the reason for the bike being in safe mode.
    pub safe_cause: Option<SafeModeCause>,

    // Localisation
    pub pose_estimate: Option<PoseEstimate>,

    // TrajCtrl
    pub traj_ctrl: traj_ctrl::TrajCtrl,
    pub traj_ctrl_input: traj_ctrl::InputData,
    pub traj_ctrl_output: traj_ctrl::OutputData,
    pub traj_ctrl_status_rpt: traj_ctrl::StatusReport,

    /// Roll reference published to the balance controller. Held from the
    /// last successful cycle when trajectory control fails.
    pub roll_ref_rad: f64,

    // Monitoring Counters
    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,

    /// Number of consecutive trajectory control errors
    pub num_consec_traj_ctrl_errors: u64,

    /// Total number of trajectory control errors
    pub num_traj_ctrl_errors: u64,

    /// Largest lateral error seen
    pub max_abs_e1_m: f64,
}

/// Summary of a run, saved into the session at shutdown.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub end_reason: EndReason,
    pub num_cycles: u64,
    pub num_traj_ctrl_errors: u64,
    pub safe_cause: Option<SafeModeCause>,
    pub max_abs_e1_m: f64,
    pub final_pose: Option<PoseEstimate>,
    pub elapsed_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLS
// ---------------------------------------------------------------------------

impl DataStore {
    /// Puts the bike into safe mode with the given cause.
    ///
    /// The roll reference is zeroed so the balance controller holds the bike
    /// upright.
    pub fn make_safe(&mut self, cause: SafeModeCause) {
        if !self.safe {
            warn!("Make safe requested, cause: {:?}", cause);
            self.safe = true;
            self.safe_cause = Some(cause);
            self.roll_ref_rad = 0.0;

            self.traj_ctrl.make_safe();
        }
    }

    /// Perform actions required at the start of a cycle.
    pub fn cycle_start(&mut self) {
        self.traj_ctrl_output = traj_ctrl::OutputData::default();
        self.traj_ctrl_status_rpt = traj_ctrl::StatusReport::default();

        self.elapsed_s = util::session::get_elapsed_seconds();
    }

    /// Store the result of trajectory control processing.
    ///
    /// On error the previous roll reference is held and the error counted.
    /// More than `max_consec_errors` errors in a row puts the bike into safe
    /// mode. Returns true if processing succeeded.
    pub fn handle_traj_ctrl_result(
        &mut self,
        result: Result<(traj_ctrl::OutputData, traj_ctrl::StatusReport), traj_ctrl::TrajCtrlError>,
        max_consec_errors: u64,
    ) -> bool {
        match result {
            Ok((output, report)) => {
                self.traj_ctrl_output = output;
                self.traj_ctrl_status_rpt = report;
                self.roll_ref_rad = output.roll_ref_rad;
                self.num_consec_traj_ctrl_errors = 0;
                self.max_abs_e1_m = self.max_abs_e1_m.max(report.e1_m.abs());
                true
            }
            Err(e) => {
                warn!("Error during TrajCtrl processing: {}", e);
                self.num_traj_ctrl_errors += 1;
                self.num_consec_traj_ctrl_errors += 1;

                if self.num_consec_traj_ctrl_errors > max_consec_errors {
                    if !self.safe {
                        error!(
                            "Maximum number of consecutive TrajCtrl errors ({}) has been exceeded",
                            max_consec_errors
                        );
                    }
                    self.make_safe(SafeModeCause::TrajCtrlErrorLimit);
                }
                false
            }
        }
    }

    /// Build the run summary.
    pub fn summary(&self, end_reason: EndReason) -> RunSummary {
        RunSummary {
            end_reason,
            num_cycles: self.num_cycles,
            num_traj_ctrl_errors: self.num_traj_ctrl_errors,
            safe_cause: self.safe_cause,
            max_abs_e1_m: self.max_abs_e1_m,
            final_pose: self.pose_estimate,
            elapsed_s: self.elapsed_s,
        }
    }
}
