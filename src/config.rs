//! Controller configuration.
//!
//! Everything here is fixed at construction: controllers validate their
//! config once in `new` and never re-read it. Files are TOML:
//!
//! ```toml
//! [sim]
//! dt = 0.005
//!
//! [pose]
//! actuation = "acceleration"
//!
//! [pose.location]
//! kp = 400.0
//! ki = 10.0
//! kd = 40.0
//! output_min = -100.0
//! output_max = 100.0
//!
//! [gripper]
//! max_grip_force = 5.0
//! ```
//!
//! Gains left out of a `[pose]` section come from the preset of its
//! `actuation`; left out of `[gripper.finger]`, from the default finger loop.

use std::path::Path;

use nalgebra::{Unit, Vector3};
use serde::{Deserialize, Serialize};

use crate::dynamics::state::{Actuation, SimConfig};
use crate::error::{ConfigError, Result};

// ---------------------------------------------------------------------------
// PID gains and output bounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PidGains {
    pub kp: f64,
    pub ki: f64,
    pub kd: f64,
    pub output_min: f64,
    pub output_max: f64,
    /// Bound on |integral accumulator| per component; `None` leaves it free.
    pub integral_limit: Option<f64>,
}

impl PidGains {
    /// Gains with the output bounds still unset. A `Pid` refuses them until
    /// `with_output_limit` or `with_output_bounds` gives finite bounds.
    pub fn new(kp: f64, ki: f64, kd: f64) -> Self {
        Self {
            kp,
            ki,
            kd,
            output_min: f64::NEG_INFINITY,
            output_max: f64::INFINITY,
            integral_limit: None,
        }
    }

    /// Symmetric output clamp `[-limit, limit]`.
    pub fn with_output_limit(mut self, limit: f64) -> Self {
        self.output_min = -limit;
        self.output_max = limit;
        self
    }

    pub fn with_output_bounds(mut self, min: f64, max: f64) -> Self {
        self.output_min = min;
        self.output_max = max;
        self
    }

    pub fn with_integral_limit(mut self, limit: f64) -> Self {
        self.integral_limit = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.kp > 0.0 && self.kp.is_finite()) {
            return Err(ConfigError::InvalidProportionalGain(self.kp));
        }
        if !(self.ki >= 0.0 && self.ki.is_finite()) {
            return Err(ConfigError::InvalidIntegralGain(self.ki));
        }
        if !(self.kd >= 0.0 && self.kd.is_finite()) {
            return Err(ConfigError::InvalidDerivativeGain(self.kd));
        }
        // NaN fails the comparison as well
        if !(self.output_min < self.output_max && self.output_min.is_finite() && self.output_max.is_finite()) {
            return Err(ConfigError::InvalidOutputBounds {
                min: self.output_min,
                max: self.output_max,
            });
        }
        if let Some(limit) = self.integral_limit {
            if !(limit > 0.0) {
                return Err(ConfigError::InvalidIntegralLimit(limit));
            }
        }
        Ok(())
    }
}

impl Default for PidGains {
    fn default() -> Self {
        Self::new(1.0, 0.0, 0.0).with_output_limit(1.0)
    }
}

/// `PidGains` as written in a config file: absent fields fall back to a base.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PidGainsPatch {
    kp: Option<f64>,
    ki: Option<f64>,
    kd: Option<f64>,
    output_min: Option<f64>,
    output_max: Option<f64>,
    integral_limit: Option<f64>,
}

impl PidGainsPatch {
    fn over(self, base: PidGains) -> PidGains {
        PidGains {
            kp: self.kp.unwrap_or(base.kp),
            ki: self.ki.unwrap_or(base.ki),
            kd: self.kd.unwrap_or(base.kd),
            output_min: self.output_min.unwrap_or(base.output_min),
            output_max: self.output_max.unwrap_or(base.output_max),
            integral_limit: self.integral_limit.or(base.integral_limit),
        }
    }
}

// ---------------------------------------------------------------------------
// Integral reset policy on target discontinuity
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscontinuityPolicy {
    /// Target position jump (m) that counts as discontinuous.
    pub position_jump: Option<f64>,
    /// Target orientation jump (rad) that counts as discontinuous.
    pub angle_jump: Option<f64>,
}

impl DiscontinuityPolicy {
    pub fn never() -> Self {
        Self { position_jump: None, angle_jump: None }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for t in [self.position_jump, self.angle_jump].into_iter().flatten() {
            if !(t > 0.0) {
                return Err(ConfigError::InvalidResetThreshold(t));
            }
        }
        Ok(())
    }
}

impl Default for DiscontinuityPolicy {
    fn default() -> Self {
        Self {
            position_jump: Some(0.1),
            angle_jump: Some(std::f64::consts::FRAC_PI_4),
        }
    }
}

// ---------------------------------------------------------------------------
// 6-DOF pose controller
// ---------------------------------------------------------------------------

/// Loop gains for one body. In a config file, whatever is left out comes
/// from the preset of the chosen `actuation`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PoseControllerPatch")]
pub struct PoseControllerConfig {
    pub actuation: Actuation,
    pub location: PidGains,
    pub rotation: PidGains,
    pub reset: DiscontinuityPolicy,
}

impl PoseControllerConfig {
    /// Gains that work out of the box for each actuation mode.
    ///
    /// Tuned for a ~1 kg body with ~0.01 kg·m² principal inertia at 200 Hz.
    /// Force and impulse gains are mass dependent; impulse gains are the
    /// force gains scaled by one tick.
    pub fn preset(actuation: Actuation) -> Self {
        let (location, rotation) = match actuation {
            Actuation::Velocity => (
                PidGains::new(10.0, 0.1, 0.0).with_output_limit(0.2),
                PidGains::new(12.0, 0.1, 0.0).with_output_limit(15.0),
            ),
            Actuation::Acceleration => (
                PidGains::new(400.0, 10.0, 40.0).with_output_limit(100.0),
                PidGains::new(400.0, 10.0, 40.0).with_output_limit(200.0),
            ),
            Actuation::Force => (
                PidGains::new(400.0, 10.0, 40.0).with_output_limit(100.0),
                PidGains::new(4.0, 0.1, 0.4).with_output_limit(2.0),
            ),
            Actuation::Impulse => (
                PidGains::new(2.0, 0.05, 0.2).with_output_limit(0.5),
                PidGains::new(0.02, 0.0005, 0.002).with_output_limit(0.01),
            ),
        };
        Self { actuation, location, rotation, reset: DiscontinuityPolicy::default() }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.location.validate()?;
        self.rotation.validate()?;
        self.reset.validate()
    }
}

impl Default for PoseControllerConfig {
    fn default() -> Self {
        Self::preset(Actuation::Acceleration)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct PoseControllerPatch {
    actuation: Option<Actuation>,
    location: PidGainsPatch,
    rotation: PidGainsPatch,
    reset: Option<DiscontinuityPolicy>,
}

impl PoseControllerPatch {
    /// Fill the gaps from `base(actuation)`, `actuation` defaulting to `fallback`.
    fn resolve(self, fallback: Actuation, base: impl Fn(Actuation) -> PoseControllerConfig) -> PoseControllerConfig {
        let actuation = self.actuation.unwrap_or(fallback);
        let base = base(actuation);
        PoseControllerConfig {
            actuation,
            location: self.location.over(base.location),
            rotation: self.rotation.over(base.rotation),
            reset: self.reset.unwrap_or(base.reset),
        }
    }
}

impl From<PoseControllerPatch> for PoseControllerConfig {
    fn from(patch: PoseControllerPatch) -> Self {
        patch.resolve(Actuation::Acceleration, PoseControllerConfig::preset)
    }
}

// ---------------------------------------------------------------------------
// Parallel gripper
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "GripperConfigPatch")]
pub struct GripperConfig {
    /// Per-finger pose controller; must use force actuation.
    pub finger: PoseControllerConfig,
    /// Squeeze force (N) at which the grip target freezes.
    pub max_grip_force: f64,
    /// Squeeze force (N) above which a contact counts as a grasp.
    pub grasp_force_threshold: f64,
    /// Squeeze force (N) below which a frozen grip releases; defaults to 90% of max.
    pub release_force: Option<f64>,
    /// Fully open finger separation (m).
    pub max_width: f64,
    /// Closing axis in the gripper base frame.
    pub axis: [f64; 3],
    /// Weld a grasped object to the fingers; `None` leaves it to friction-free contact.
    pub fixation: Option<FixationConfig>,
}

/// Which objects a fixation grasp may pick up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FixationConfig {
    /// Heaviest object (kg) that can be fixated.
    pub max_mass: f64,
    /// Widest object (m) along the closing axis that can be fixated.
    pub max_length: f64,
}

impl FixationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.max_mass > 0.0 && self.max_mass.is_finite()) {
            return Err(ConfigError::InvalidMass(self.max_mass));
        }
        if !(self.max_length > 0.0 && self.max_length.is_finite()) {
            return Err(ConfigError::InvalidGraspWidth(self.max_length));
        }
        Ok(())
    }
}

impl Default for FixationConfig {
    fn default() -> Self {
        Self { max_mass: 15.0, max_length: 0.5 }
    }
}

impl GripperConfig {
    pub fn release_force(&self) -> f64 {
        self.release_force.unwrap_or(0.9 * self.max_grip_force)
    }

    pub fn axis(&self) -> Unit<Vector3<f64>> {
        Unit::try_new(Vector3::from(self.axis), 1e-9).unwrap_or_else(Vector3::y_axis)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.finger.validate()?;
        if self.finger.actuation != Actuation::Force {
            return Err(ConfigError::UnsupportedFingerActuation(self.finger.actuation));
        }
        if !(self.max_grip_force > 0.0 && self.max_grip_force.is_finite()) {
            return Err(ConfigError::InvalidGripForce(self.max_grip_force));
        }
        if !(self.grasp_force_threshold > 0.0 && self.grasp_force_threshold.is_finite()) {
            return Err(ConfigError::InvalidGripForce(self.grasp_force_threshold));
        }
        let release = self.release_force();
        if !(release >= 0.0 && release < self.max_grip_force) {
            return Err(ConfigError::InvalidReleaseForce { release, max: self.max_grip_force });
        }
        if !(self.max_width > 0.0 && self.max_width.is_finite()) {
            return Err(ConfigError::InvalidGraspWidth(self.max_width));
        }
        match &self.fixation {
            Some(fixation) => fixation.validate(),
            None => Ok(()),
        }
    }
}

impl Default for GripperConfig {
    fn default() -> Self {
        Self {
            finger: PoseControllerConfig {
                actuation: Actuation::Force,
                // Tuned for ~100 g fingers at 200 Hz
                location: PidGains::new(400.0, 0.0, 20.0).with_output_limit(50.0),
                rotation: PidGains::new(0.05, 0.0, 0.002).with_output_limit(1.0),
                reset: DiscontinuityPolicy::never(),
            },
            max_grip_force: 20.0,
            grasp_force_threshold: 1.0,
            release_force: None,
            max_width: 0.1,
            axis: [0.0, 1.0, 0.0],
            fixation: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct GripperConfigPatch {
    finger: PoseControllerPatch,
    max_grip_force: Option<f64>,
    grasp_force_threshold: Option<f64>,
    release_force: Option<f64>,
    max_width: Option<f64>,
    axis: Option<[f64; 3]>,
    fixation: Option<FixationConfig>,
}

impl From<GripperConfigPatch> for GripperConfig {
    fn from(patch: GripperConfigPatch) -> Self {
        let base = GripperConfig::default();
        // finger gains default to the tuned finger loop, not the generic force preset
        let finger = patch.finger.resolve(Actuation::Force, |actuation| match actuation {
            Actuation::Force => base.finger,
            other => PoseControllerConfig::preset(other),
        });
        GripperConfig {
            finger,
            max_grip_force: patch.max_grip_force.unwrap_or(base.max_grip_force),
            grasp_force_threshold: patch.grasp_force_threshold.unwrap_or(base.grasp_force_threshold),
            release_force: patch.release_force.or(base.release_force),
            max_width: patch.max_width.unwrap_or(base.max_width),
            axis: patch.axis.unwrap_or(base.axis),
            fixation: patch.fixation.or(base.fixation),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level config file
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sim: SimConfig,
    pub pose: PoseControllerConfig,
    pub gripper: GripperConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        tracing::debug!(path = %path.as_ref().display(), "loaded controller config");
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.sim.validate()?;
        self.pose.validate()?;
        self.gripper.validate()
    }
}
