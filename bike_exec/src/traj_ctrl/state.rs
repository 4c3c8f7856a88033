//! Trajectory control module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, warn};
use serde::Serialize;

// Internal
use super::{
    roll_map::steer_to_roll, tracker, DegenerateCause, HeadingRateFilter, HeadingRateFilterState,
    LocalTrajectory, Params, TrajCtrlError,
};
use crate::loc::Pose;
use util::{archive::Archiver, module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Trajectory control module state
pub struct TrajCtrl {
    params: Params,

    filter: HeadingRateFilter,

    /// Feedforward filter state, carried from one cycle to the next
    filter_state: HeadingRateFilterState,

    report: StatusReport,
    arch_report: Option<Archiver>,

    output: OutputData,
    arch_output: Option<Archiver>,
}

/// Input data to trajectory control.
#[derive(Debug, Clone, Default)]
pub struct InputData {
    /// Estimated pose of the bike
    pub pose: Pose,

    /// Estimated forward speed
    ///
    /// Units: meters/second
    pub speed_ms: f64,

    /// Reference trajectory window for this cycle
    pub window: LocalTrajectory,
}

/// Output of trajectory control.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OutputData {
    /// Roll reference for the balance controller.
    ///
    /// Units: radians
    pub roll_ref_rad: f64,

    /// Number of points the window should be advanced by.
    pub closest_point_idx: usize,

    /// Limited steering reference the roll reference was mapped from.
    ///
    /// Units: radians
    pub steer_ref_rad: f64,
}

/// Status report for trajectory control processing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StatusReport {
    pub e1_m: f64,
    pub e2_rad: f64,
    pub dpsiref_rads: f64,
    pub delta_error_rad: f64,
    pub delta_psi_rad: f64,
    pub closest_idx: usize,
    pub heading_idx: usize,
    pub lat_error_saturated: bool,
    pub steer_saturated: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for TrajCtrl {
    fn default() -> Self {
        let params = Params::default();

        Self {
            params,
            filter: HeadingRateFilter::from(&params.filter),
            filter_state: HeadingRateFilterState::default(),
            report: StatusReport::default(),
            arch_report: None,
            output: OutputData::default(),
            arch_output: None,
        }
    }
}

impl State for TrajCtrl {
    type InitData = &'static str;
    type InitError = TrajCtrlError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = TrajCtrlError;

    /// Initialise the TrajCtrl module.
    ///
    /// Expected init data is the path to the parameter file, relative to the
    /// parameters directory.
    fn init(
        &mut self,
        init_data: Self::InitData,
        session: &Session,
    ) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data).map_err(TrajCtrlError::ParamLoadError)?;

        *self = Self::new(params)?;
        self.start_archiving(session)?;

        Ok(())
    }

    /// Perform one cycle of trajectory control.
    ///
    /// On error the filter state, last output and last report are unchanged.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let mut filter_state = self.filter_state;

        let tracked = tracker::compute(
            &input_data.window,
            &input_data.pose,
            input_data.speed_ms,
            &self.params.traj,
            &self.filter,
            &mut filter_state,
        )?;

        let roll_ref_rad = steer_to_roll(tracked.steer_ref_rad, input_data.speed_ms, &self.params.bike);
        if !roll_ref_rad.is_finite() {
            return Err(TrajCtrlError::DegenerateInput(DegenerateCause::NonFiniteOutput));
        }

        self.filter_state = filter_state;

        self.output = OutputData {
            roll_ref_rad,
            closest_point_idx: tracked.closest_point_idx,
            steer_ref_rad: tracked.steer_ref_rad,
        };
        self.report = StatusReport {
            e1_m: tracked.errors.e1_m,
            e2_rad: tracked.errors.e2_rad,
            dpsiref_rads: tracked.errors.dpsiref_rads,
            delta_error_rad: tracked.delta_error_rad,
            delta_psi_rad: tracked.delta_psi_rad,
            closest_idx: tracked.errors.closest_idx,
            heading_idx: tracked.errors.heading_idx,
            lat_error_saturated: tracked.lat_error_saturated,
            steer_saturated: tracked.steer_saturated,
        };

        self.write_archives();

        Ok((self.output, self.report))
    }
}

impl TrajCtrl {
    /// Create a new instance from already loaded parameters.
    pub fn new(params: Params) -> Result<Self, TrajCtrlError> {
        params.validate()?;

        Ok(Self {
            params,
            filter: HeadingRateFilter::from(&params.filter),
            ..Default::default()
        })
    }

    /// Replace the feedforward filter state.
    pub fn with_filter_state(mut self, filter_state: HeadingRateFilterState) -> Self {
        self.filter_state = filter_state;
        self
    }

    pub fn filter_state(&self) -> &HeadingRateFilterState {
        &self.filter_state
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Open the status report and output archives in the session.
    pub fn start_archiving(&mut self, session: &Session) -> Result<(), TrajCtrlError> {
        self.arch_report = Some(
            Archiver::from_path(session, "traj_ctrl/status_report.csv")
                .map_err(TrajCtrlError::ArchiveError)?,
        );
        self.arch_output = Some(
            Archiver::from_path(session, "traj_ctrl/output.csv")
                .map_err(TrajCtrlError::ArchiveError)?,
        );

        debug!("TrajCtrl archives opened in {:?}", session.arch_root);

        Ok(())
    }

    /// Zero the filter state and the held output.
    pub fn make_safe(&mut self) {
        self.filter_state = HeadingRateFilterState::default();
        self.output = OutputData::default();
    }

    fn write_archives(&mut self) {
        if let Some(ref mut arch) = self.arch_report {
            if let Err(e) = arch.serialise(self.report) {
                warn!("Could not archive the TrajCtrl status report: {}", e);
            }
        }
        if let Some(ref mut arch) = self.arch_output {
            if let Err(e) = arch.serialise(self.output) {
                warn!("Could not archive the TrajCtrl output: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::traj_ctrl::{BikeParams, FilterCoeffs, TrajParams};
    use approx::assert_abs_diff_eq;

    fn params() -> Params {
        Params {
            bike: BikeParams {
                g: 9.81,
                lr_m: 0.4,
                lf_m: 0.7,
                lambda_rad: 1.2217,
            },
            traj: TrajParams {
                k1: 0.5,
                k2: 1.0,
                e1_max_m: 0.5,
            },
            filter: FilterCoeffs {
                ad: 0.8,
                bd: 0.2,
                cd: 0.39,
                dd: 0.0,
            },
        }
    }

    fn straight_input(y_m: f64) -> InputData {
        InputData {
            pose: Pose::new(0.5, y_m, 0.0),
            speed_ms: 2.0,
            window: LocalTrajectory::from_arrays(
                &[-1.0, 0.0, 1.0, 2.0, 3.0],
                &[0.0; 5],
                &[0.0; 5],
            )
            .unwrap(),
        }
    }

    #[test]
    fn test_new_validates_params() {
        let mut bad = params();
        bad.bike.lr_m = -0.7;
        assert!(matches!(
            TrajCtrl::new(bad),
            Err(TrajCtrlError::InvalidParams(_))
        ));

        assert!(TrajCtrl::new(params()).is_ok());
    }

    #[test]
    fn test_on_path_gives_zero_roll() {
        let mut tc = TrajCtrl::new(params()).unwrap();

        let (out, rpt) = tc.proc(&straight_input(0.0)).unwrap();

        assert_eq!(out.roll_ref_rad, 0.0);
        assert_eq!(out.steer_ref_rad, 0.0);
        assert_eq!(out.closest_point_idx, 1);
        assert_eq!(rpt.closest_idx, 2);
        assert!(!rpt.lat_error_saturated);
        assert!(!rpt.steer_saturated);
    }

    #[test]
    fn test_roll_follows_steer() {
        let p = params();
        let mut tc = TrajCtrl::new(p).unwrap();

        let input = straight_input(0.2);
        let (out, rpt) = tc.proc(&input).unwrap();

        assert_abs_diff_eq!(rpt.e1_m, 0.2, epsilon = 1e-12);
        assert!(out.steer_ref_rad < 0.0);
        assert_abs_diff_eq!(
            out.roll_ref_rad,
            steer_to_roll(out.steer_ref_rad, input.speed_ms, &p.bike),
            epsilon = 1e-15
        );
        assert!(out.roll_ref_rad > 0.0);
    }

    #[test]
    fn test_error_keeps_state() {
        let injected = HeadingRateFilterState::from_scalar(0.3);
        let mut tc = TrajCtrl::new(params())
            .unwrap()
            .with_filter_state(injected);

        let mut input = straight_input(0.0);
        input.speed_ms = 0.0;

        assert!(matches!(
            tc.proc(&input),
            Err(TrajCtrlError::DegenerateInput(DegenerateCause::NonPositiveSpeed))
        ));
        assert_eq!(*tc.filter_state(), injected);
    }

    #[test]
    fn test_injected_state_drives_feedforward() {
        let mut tc = TrajCtrl::new(params())
            .unwrap()
            .with_filter_state(HeadingRateFilterState::from_scalar(0.1));

        let (out, rpt) = tc.proc(&straight_input(0.0)).unwrap();

        // Straight path so only the filter state contributes: C x = 0.39 * 0.1
        assert_abs_diff_eq!(rpt.delta_psi_rad, 0.039, epsilon = 1e-12);
        assert_abs_diff_eq!(out.steer_ref_rad, 0.039, epsilon = 1e-12);
        // x' = A x with zero input
        assert_abs_diff_eq!(tc.filter_state().scalar(), 0.08, epsilon = 1e-12);

        tc.make_safe();
        assert_eq!(tc.filter_state().scalar(), 0.0);
    }

    #[test]
    fn test_init_missing_params() {
        let tmp = std::env::temp_dir();
        let session = Session {
            session_root: tmp.clone(),
            arch_root: tmp.clone(),
            log_file_path: tmp.join("traj_ctrl_test.log"),
        };

        let mut tc = TrajCtrl::default();
        assert!(matches!(
            tc.init("no_such_traj_ctrl_params.toml", &session),
            Err(TrajCtrlError::ParamLoadError(_))
        ));
    }

    #[test]
    fn test_archives_written() {
        let root = std::env::temp_dir().join(format!("traj_ctrl_arch_{}", std::process::id()));
        let session = Session {
            session_root: root.clone(),
            arch_root: root.join("arch"),
            log_file_path: root.join("test.log"),
        };

        let mut tc = TrajCtrl::new(params()).unwrap();
        tc.start_archiving(&session).unwrap();
        tc.proc(&straight_input(0.0)).unwrap();
        tc.proc(&straight_input(0.1)).unwrap();

        let report = std::fs::read_to_string(root.join("arch/traj_ctrl/status_report.csv")).unwrap();
        let output = std::fs::read_to_string(root.join("arch/traj_ctrl/output.csv")).unwrap();
        std::fs::remove_dir_all(&root).ok();

        let report_lines: Vec<&str> = report.lines().collect();
        assert_eq!(report_lines.len(), 3);
        assert!(report_lines[0].starts_with("e1_m,e2_rad,dpsiref_rads"));

        let output_lines: Vec<&str> = output.lines().collect();
        assert_eq!(output_lines[0], "roll_ref_rad,closest_point_idx,steer_ref_rad");
        assert_eq!(output_lines.len(), 3);
    }
}
