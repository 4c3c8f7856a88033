//! Trajectory control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// Internal
use super::TrajCtrlError;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Standard gravity, used when the parameter file does not give `g`.
pub const DEFAULT_GRAVITY_MSS: f64 = 9.81;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for trajectory control
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct Params {
    /// Single-track model of the bike
    pub bike: BikeParams,

    /// Tracking gains and limits
    pub traj: TrajParams,

    /// Heading-rate feedforward filter
    pub filter: FilterCoeffs,
}

/// Geometry of the bike used by the single-track model.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
pub struct BikeParams {
    /// Gravitational acceleration.
    ///
    /// Units: meters/second^2
    #[serde(default = "default_gravity")]
    pub g: f64,

    /// Distance from the centre of mass to the rear axle.
    ///
    /// Units: meters
    pub lr_m: f64,

    /// Distance from the centre of mass to the front axle.
    ///
    /// Units: meters
    pub lf_m: f64,

    /// Steering axis angle.
    ///
    /// Units: radians
    pub lambda_rad: f64,
}

/// Gains and limits of the tracking feedback law.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct TrajParams {
    /// Lateral error gain
    pub k1: f64,

    /// Heading error gain
    pub k2: f64,

    /// Saturation on the lateral error before the gain is applied.
    ///
    /// Units: meters
    pub e1_max_m: f64,
}

/// Coefficients of the single-state discrete filter shaping the heading rate
/// reference into a steering contribution.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct FilterCoeffs {
    pub ad: f64,
    pub bd: f64,
    pub cd: f64,
    pub dd: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BikeParams {
    fn default() -> Self {
        Self {
            g: DEFAULT_GRAVITY_MSS,
            lr_m: 0.0,
            lf_m: 0.0,
            lambda_rad: 0.0,
        }
    }
}

impl BikeParams {
    /// Distance between the two axles.
    pub fn wheelbase_m(&self) -> f64 {
        self.lr_m + self.lf_m
    }
}

impl Params {
    /// Check the parameters describe a physically meaningful bike and
    /// controller.
    pub fn validate(&self) -> Result<(), TrajCtrlError> {
        let all = [
            self.bike.g,
            self.bike.lr_m,
            self.bike.lf_m,
            self.bike.lambda_rad,
            self.traj.k1,
            self.traj.k2,
            self.traj.e1_max_m,
            self.filter.ad,
            self.filter.bd,
            self.filter.cd,
            self.filter.dd,
        ];

        if all.iter().any(|p| !p.is_finite()) {
            return Err(TrajCtrlError::InvalidParams(
                "all parameters must be finite".into(),
            ));
        }

        if self.bike.g <= 0.0 {
            return Err(TrajCtrlError::InvalidParams(format!(
                "g must be positive, found {}",
                self.bike.g
            )));
        }

        if self.bike.wheelbase_m() <= 0.0 {
            return Err(TrajCtrlError::InvalidParams(format!(
                "lr_m + lf_m must be positive, found {}",
                self.bike.wheelbase_m()
            )));
        }

        if self.traj.e1_max_m < 0.0 {
            return Err(TrajCtrlError::InvalidParams(format!(
                "e1_max_m must not be negative, found {}",
                self.traj.e1_max_m
            )));
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_gravity() -> f64 {
    DEFAULT_GRAVITY_MSS
}

#[cfg(test)]
mod test {
    use super::*;

    const PARAMS_TOML: &str = r#"
        [bike]
        lr_m = 0.4
        lf_m = 0.7
        lambda_rad = 1.2217

        [traj]
        k1 = 0.5
        k2 = 1.0
        e1_max_m = 0.5

        [filter]
        ad = 0.8
        bd = 0.2
        cd = 0.39
        dd = 0.0
    "#;

    #[test]
    fn test_parse_params() {
        let params: Params = util::params::parse(PARAMS_TOML).unwrap();

        assert_eq!(params.bike.g, DEFAULT_GRAVITY_MSS);
        assert_eq!(params.bike.wheelbase_m(), 0.4 + 0.7);
        assert_eq!(params.traj.e1_max_m, 0.5);
        assert_eq!(params.filter.cd, 0.39);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_geometry() {
        let mut params: Params = util::params::parse(PARAMS_TOML).unwrap();
        params.bike.lr_m = -0.7;
        assert!(matches!(
            params.validate(),
            Err(TrajCtrlError::InvalidParams(_))
        ));

        let mut params: Params = util::params::parse(PARAMS_TOML).unwrap();
        params.traj.e1_max_m = -1.0;
        assert!(params.validate().is_err());

        let mut params: Params = util::params::parse(PARAMS_TOML).unwrap();
        params.filter.ad = std::f64::NAN;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_shipped_params_valid() {
        let params: Params = util::params::load_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/traj_ctrl.toml"
        ))
        .unwrap();

        assert!(params.validate().is_ok());
    }
}
