use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Target pose: written by the input side, read every tick
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseTarget {
    pub position: Vector3<f64>,            // m, world frame
    pub orientation: UnitQuaternion<f64>,  // body→world rotation
}

impl PoseTarget {
    pub fn new(position: Vector3<f64>, orientation: UnitQuaternion<f64>) -> Self {
        Self { position, orientation }
    }

    pub fn at(position: Vector3<f64>) -> Self {
        Self { position, orientation: UnitQuaternion::identity() }
    }

    pub fn to_isometry(&self) -> Isometry3<f64> {
        Isometry3::from_parts(Translation3::from(self.position), self.orientation)
    }

    pub fn from_isometry(iso: &Isometry3<f64>) -> Self {
        Self { position: iso.translation.vector, orientation: iso.rotation }
    }

    /// Compose with a local offset expressed in this pose's frame.
    pub fn compose(&self, offset: &Isometry3<f64>) -> Self {
        Self::from_isometry(&(self.to_isometry() * offset))
    }
}

impl Default for PoseTarget {
    fn default() -> Self {
        Self::at(Vector3::zeros())
    }
}

// ---------------------------------------------------------------------------
// Body snapshot reported by the physics world (read-only to controllers)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyState {
    pub position: Vector3<f64>,             // m, world frame
    pub orientation: UnitQuaternion<f64>,   // body→world rotation
    pub linear_velocity: Vector3<f64>,      // m/s, world frame
    pub angular_velocity: Vector3<f64>,     // rad/s, world frame
}

impl BodyState {
    pub fn at_rest(position: Vector3<f64>) -> Self {
        Self {
            position,
            orientation: UnitQuaternion::identity(),
            linear_velocity: Vector3::zeros(),
            angular_velocity: Vector3::zeros(),
        }
    }

    pub fn pose(&self) -> PoseTarget {
        PoseTarget::new(self.position, self.orientation)
    }
}

impl Default for BodyState {
    fn default() -> Self {
        Self::at_rest(Vector3::zeros())
    }
}

// ---------------------------------------------------------------------------
// Controller output
// ---------------------------------------------------------------------------

/// How the physics world interprets a [`ControlOutput`].
///
/// - `Force`: force (N) and torque (N·m), mass dependent
/// - `Acceleration`: linear (m/s²) and angular (rad/s²) acceleration, mass independent
/// - `Velocity`: linear and angular velocity set-points
/// - `Impulse`: linear (N·s) and angular (N·m·s) impulse applied once
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actuation {
    #[default]
    Force,
    Acceleration,
    Velocity,
    Impulse,
}

/// Linear + angular command for exactly one simulation step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlOutput {
    pub actuation: Actuation,
    pub force: Vector3<f64>,
    pub torque: Vector3<f64>,
}

impl ControlOutput {
    pub fn zero(actuation: Actuation) -> Self {
        Self { actuation, force: Vector3::zeros(), torque: Vector3::zeros() }
    }

    pub fn is_zero(&self) -> bool {
        self.force == Vector3::zeros() && self.torque == Vector3::zeros()
    }
}

impl Default for ControlOutput {
    fn default() -> Self {
        Self::zero(Actuation::Force)
    }
}

// ---------------------------------------------------------------------------
// Simulation config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub dt: f64,
    pub max_time: f64,
    pub gravity: [f64; 3],
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.dt > 0.0 && self.dt.is_finite()) {
            return Err(ConfigError::InvalidTimestep(self.dt));
        }
        if !(self.max_time >= 0.0 && self.max_time.is_finite()) {
            return Err(ConfigError::InvalidTimestep(self.max_time));
        }
        Ok(())
    }

    pub fn gravity(&self) -> Vector3<f64> {
        Vector3::from(self.gravity)
    }

    pub fn steps(&self) -> usize {
        (self.max_time / self.dt).round() as usize
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            dt: 0.005,           // 200 Hz physics tick
            max_time: 5.0,
            gravity: [0.0; 3],   // controlled bodies fly without gravity
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn compose_applies_offset_in_local_frame() {
        let base = PoseTarget::new(
            Vector3::new(1.0, 0.0, 0.0),
            UnitQuaternion::from_axis_angle(&Vector3::z_axis(), FRAC_PI_2),
        );
        let offset = Isometry3::translation(1.0, 0.0, 0.0);
        let p = base.compose(&offset);
        // Local +X is world +Y after a 90 deg yaw
        assert!((p.position - Vector3::new(1.0, 1.0, 0.0)).norm() < 1e-12);
    }

    #[test]
    fn sim_config_rejects_non_positive_dt() {
        let cfg = SimConfig { dt: 0.0, ..SimConfig::default() };
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidTimestep(0.0)));
        let cfg = SimConfig { dt: -0.01, ..SimConfig::default() };
        assert!(cfg.validate().is_err());
        assert!(SimConfig::default().validate().is_ok());
    }

    #[test]
    fn steps_rounds_to_nearest_tick() {
        let cfg = SimConfig { dt: 0.01, max_time: 1.0, ..SimConfig::default() };
        assert_eq!(cfg.steps(), 100);
    }
}
