//! Main bike-side executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise all modules
//!     - Main loop:
//!         - Pose acquisition (simulation or replayed estimator log)
//!         - Reference window update
//!         - Trajectory control processing
//!         - Roll reference output
//!
//! # Modules
//!
//! All modules (e.g. `traj_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.
//!

// ---------------------------------------------------------------------------
// USE MODULES FROM LIBRARY
// ---------------------------------------------------------------------------

use bike_lib::{
    data_store::{DataStore, EndReason},
    loc::{PoseReplay, PoseSource},
    params::BikeExecParams,
    sim::BikeSim,
    traj_window::{RefTrajectory, TrajWindowMgr, WindowStatus},
};

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Bike trajectory control executable
#[derive(Debug, StructOpt)]
#[structopt(name = "bike_exec")]
struct Opts {
    /// Reference trajectory CSV with columns x_m,y_m,psi_rad
    #[structopt(parse(from_os_str))]
    traj_path: PathBuf,

    /// Replay poses from an estimator log (x_m,y_m,psi_rad,v_ms) instead of
    /// running the simulation
    #[structopt(long, parse(from_os_str))]
    replay: Option<PathBuf>,

    /// Stop after this many cycles
    #[structopt(long)]
    max_cycles: Option<u64>,

    /// Pace the loop at the cycle period instead of running as fast as
    /// possible
    #[structopt(long)]
    realtime: bool,

    /// Minimum log level, at least `info`
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("bike_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opts.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Bike Trajectory Control Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI options: {:?}", opts);

    // ---- LOAD PARAMETERS ----

    let exec_params: BikeExecParams =
        util::params::load("bike_exec.toml").wrap_err("Could not load exec params")?;

    if !(exec_params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "Cycle period must be positive, found {}",
            exec_params.cycle_period_s
        ));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();

    // ---- INITIALISE MODULES ----

    ds.traj_ctrl
        .init("traj_ctrl.toml", &session)
        .wrap_err("Failed to initialise TrajCtrl")?;
    info!("TrajCtrl init complete");

    let traj = RefTrajectory::load_csv(&opts.traj_path)
        .wrap_err_with(|| format!("Failed to load the trajectory {:?}", opts.traj_path))?;
    info!("Loaded {} point reference trajectory", traj.len());

    let mut window_mgr = TrajWindowMgr::new(traj, exec_params.window_len)
        .wrap_err("Failed to initialise the window manager")?;

    let mut pose_source = match opts.replay {
        Some(ref path) => {
            let replay = PoseReplay::load_csv(path)
                .wrap_err_with(|| format!("Failed to load the pose replay {:?}", path))?;
            info!("Replaying {} poses from {:?}", replay.len(), path);
            PoseSource::Replay(replay)
        }
        None => {
            info!(
                "Simulating the bike from {:?} at {} m/s",
                exec_params.sim_start_pose, exec_params.sim_speed_ms
            );
            PoseSource::Sim(BikeSim::new(
                exec_params.sim_start_pose,
                exec_params.sim_speed_ms,
                ds.traj_ctrl.params().bike,
            ))
        }
    };

    info!("Module initialisation complete\n");

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    let cycle_period = Duration::from_secs_f64(exec_params.cycle_period_s);

    let end_reason = loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start();

        if let Some(max_cycles) = opts.max_cycles {
            if ds.num_cycles >= max_cycles {
                info!("Reached the maximum of {} cycles, stopping", max_cycles);
                break EndReason::MaxCyclesReached;
            }
        }

        // ---- DATA INPUT ----

        ds.pose_estimate = pose_source.get();

        let estimate = match ds.pose_estimate {
            Some(e) => e,
            None => {
                info!("Pose source exhausted, stopping");
                break EndReason::PoseSourceExhausted;
            }
        };

        // ---- REFERENCE WINDOW ----

        if window_mgr.fill(&mut ds.traj_ctrl_input.window) == WindowStatus::EndOfTrajectory {
            info!("End of the reference trajectory reached, stopping");
            break EndReason::EndOfTrajectory;
        }

        ds.traj_ctrl_input.pose = estimate.pose;
        ds.traj_ctrl_input.speed_ms = estimate.speed_ms;

        // ---- CONTROL ALGORITHM PROCESSING ----

        let result = ds.traj_ctrl.proc(&ds.traj_ctrl_input);

        if ds.handle_traj_ctrl_result(result, exec_params.max_consec_traj_ctrl_errors) {
            window_mgr.advance(ds.traj_ctrl_output.closest_point_idx);
        }

        // ---- OUTPUT ----

        pose_source.apply_roll_ref(ds.roll_ref_rad, exec_params.cycle_period_s);

        if ds.safe {
            warn!("Safe mode engaged, roll reference zeroed, stopping");
            break EndReason::SafeMode;
        }

        // ---- CYCLE MANAGEMENT ----

        if opts.realtime {
            let cycle_dur = Instant::now() - cycle_start_instant;

            // Get sleep duration
            match cycle_period.checked_sub(cycle_dur) {
                Some(d) => {
                    ds.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - cycle_period.as_secs_f64()
                    );
                    ds.num_consec_cycle_overruns += 1;
                }
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    };

    // ---- SHUTDOWN ----

    let summary = ds.summary(end_reason);
    info!(
        "Ran {} cycles with {} TrajCtrl errors, max lateral error {:.3} m",
        summary.num_cycles, summary.num_traj_ctrl_errors, summary.max_abs_e1_m
    );

    session
        .save_json("run_summary.json", &summary)
        .wrap_err("Failed to save the run summary")?;

    info!("End of execution");

    Ok(())
}
