use nalgebra::{Isometry3, UnitQuaternion, Vector3};

use super::pid::{Pid, Signal, VectorPid};
use crate::config::{PidGains, PoseControllerConfig};
use crate::dynamics::state::{BodyState, ControlOutput, PoseTarget};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Orientation error
// ---------------------------------------------------------------------------

/// Shortest-arc rotation taking `current` onto `target`, as axis * angle (rad).
pub fn rotation_error(current: &UnitQuaternion<f64>, target: &UnitQuaternion<f64>) -> Vector3<f64> {
    let mut delta = (target * current.inverse()).into_inner();
    // q and -q are the same rotation; keep the short way round
    if delta.w < 0.0 {
        delta = -delta;
    }
    UnitQuaternion::new_normalize(delta).scaled_axis()
}

// ---------------------------------------------------------------------------
// 6-DOF pose controller
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    Idle,
    Tracking,
}

/// Drives one rigid body toward a target pose with a location PID and a
/// rotation PID. Output is bounded per component by the gains' clamp.
#[derive(Debug, Clone)]
pub struct PoseController {
    config: PoseControllerConfig,
    location: VectorPid,
    rotation: VectorPid,
    offset: Option<Isometry3<f64>>,
    target: Option<PoseTarget>,
    mode: TrackingMode,
    position_error: Vector3<f64>,
    rotation_error: Vector3<f64>,
    last_output: ControlOutput,
}

impl PoseController {
    pub fn new(config: PoseControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            location: Pid::new(config.location)?,
            rotation: Pid::new(config.rotation)?,
            config,
            offset: None,
            target: None,
            mode: TrackingMode::Idle,
            position_error: Vector3::zeros(),
            rotation_error: Vector3::zeros(),
            last_output: ControlOutput::zero(config.actuation),
        })
    }

    /// Track `target * offset` instead of the raw target.
    pub fn with_offset(mut self, offset: Isometry3<f64>) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn config(&self) -> &PoseControllerConfig {
        &self.config
    }

    pub fn set_target(&mut self, target: PoseTarget) {
        let target = match &self.offset {
            Some(offset) => target.compose(offset),
            None => target,
        };

        match (self.mode, self.target) {
            (TrackingMode::Idle, _) => {
                tracing::debug!(position = ?target.position, "pose controller: idle -> tracking");
                self.reset();
                self.mode = TrackingMode::Tracking;
            }
            (TrackingMode::Tracking, Some(prev)) if self.is_discontinuous(&prev, &target) => {
                tracing::debug!(
                    jump = (target.position - prev.position).norm(),
                    "pose target jumped, resetting PID state"
                );
                self.reset();
            }
            _ => {}
        }
        self.target = Some(target);
    }

    pub fn clear_target(&mut self) {
        if self.mode == TrackingMode::Tracking {
            tracing::debug!("pose controller: tracking -> idle");
        }
        self.target = None;
        self.mode = TrackingMode::Idle;
        self.position_error = Vector3::zeros();
        self.rotation_error = Vector3::zeros();
        self.last_output = ControlOutput::zero(self.config.actuation);
    }

    /// Set the target and advance one tick.
    pub fn tick(&mut self, target: &PoseTarget, current: &BodyState, dt: f64) -> ControlOutput {
        self.set_target(*target);
        self.update(current, dt)
    }

    /// Advance one tick against the held target. Idle yields zero output.
    pub fn update(&mut self, current: &BodyState, dt: f64) -> ControlOutput {
        let Some(target) = self.target else {
            return ControlOutput::zero(self.config.actuation);
        };

        let position_error = target.position - current.position;
        let rotation_error = rotation_error(&current.orientation, &target.orientation);
        if !position_error.all_finite() || !rotation_error.all_finite() {
            tracing::warn!(
                ?position_error,
                ?rotation_error,
                "non-finite pose error, resting output this tick"
            );
            return ControlOutput {
                actuation: self.config.actuation,
                force: self.location.rest_output(),
                torque: self.rotation.rest_output(),
            };
        }

        let force = self.location.update(position_error, dt);
        let torque = self.rotation.update(rotation_error, dt);

        self.position_error = position_error;
        self.rotation_error = rotation_error;
        self.last_output = ControlOutput { actuation: self.config.actuation, force, torque };
        self.last_output
    }

    /// Zero both PID accumulators and previous errors.
    pub fn reset(&mut self) {
        self.location.reset();
        self.rotation.reset();
    }

    /// Forget previous errors only, keeping the integral load.
    pub fn reset_derivative(&mut self) {
        self.location.reset_derivative();
        self.rotation.reset_derivative();
    }

    pub fn retune_location(&mut self, gains: PidGains, clear_errors: bool) -> Result<(), ConfigError> {
        self.location.retune(gains, clear_errors)?;
        self.config.location = gains;
        Ok(())
    }

    pub fn retune_rotation(&mut self, gains: PidGains, clear_errors: bool) -> Result<(), ConfigError> {
        self.rotation.retune(gains, clear_errors)?;
        self.config.rotation = gains;
        Ok(())
    }

    fn is_discontinuous(&self, prev: &PoseTarget, next: &PoseTarget) -> bool {
        let policy = &self.config.reset;
        let moved = policy
            .position_jump
            .is_some_and(|t| (next.position - prev.position).norm() > t);
        let turned = policy
            .angle_jump
            .is_some_and(|t| prev.orientation.angle_to(&next.orientation) > t);
        moved || turned
    }

    pub fn mode(&self) -> TrackingMode {
        self.mode
    }

    pub fn target(&self) -> Option<&PoseTarget> {
        self.target.as_ref()
    }

    pub fn last_output(&self) -> ControlOutput {
        self.last_output
    }

    pub fn position_error(&self) -> Vector3<f64> {
        self.position_error
    }

    pub fn rotation_error(&self) -> Vector3<f64> {
        self.rotation_error
    }

    /// Combined error norm (m and rad summed in quadrature).
    pub fn error_magnitude(&self) -> f64 {
        (self.position_error.norm_squared() + self.rotation_error.norm_squared()).sqrt()
    }

    pub fn location_pid(&self) -> &VectorPid {
        &self.location
    }

    pub fn rotation_pid(&self) -> &VectorPid {
        &self.rotation
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DiscontinuityPolicy;
    use crate::dynamics::state::Actuation;
    use std::f64::consts::{FRAC_PI_2, PI};

    fn config() -> PoseControllerConfig {
        PoseControllerConfig {
            actuation: Actuation::Force,
            location: PidGains::new(10.0, 1.0, 0.5).with_output_limit(5.0),
            rotation: PidGains::new(4.0, 0.0, 0.1).with_output_limit(2.0),
            reset: DiscontinuityPolicy::default(),
        }
    }

    #[test]
    fn rotation_error_is_zero_for_equal_orientations() {
        let q = UnitQuaternion::from_euler_angles(0.3, -0.2, 1.1);
        assert!(rotation_error(&q, &q).norm() < 1e-9);
    }

    #[test]
    fn rotation_error_takes_short_arc() {
        let current = UnitQuaternion::identity();
        let target = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), -FRAC_PI_2);
        let err = rotation_error(&current, &target);
        assert!((err - Vector3::new(0.0, 0.0, -FRAC_PI_2)).norm() < 1e-9);

        // 270 deg about +Z is 90 deg about -Z the short way
        let target = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 1.5 * PI);
        let err = rotation_error(&current, &target);
        assert!((err.norm() - FRAC_PI_2).abs() < 1e-9);
        assert!(err.z < 0.0);
    }

    #[test]
    fn idle_controller_outputs_zero() {
        let mut c = PoseController::new(config()).unwrap();
        assert_eq!(c.mode(), TrackingMode::Idle);
        let out = c.update(&BodyState::default(), 0.01);
        assert!(out.is_zero());
    }

    #[test]
    fn tick_pushes_toward_target() {
        let mut c = PoseController::new(config()).unwrap();
        let target = PoseTarget::at(Vector3::new(0.1, 0.0, 0.0));
        let out = c.tick(&target, &BodyState::default(), 0.01);
        assert_eq!(c.mode(), TrackingMode::Tracking);
        assert!(out.force.x > 0.0);
        assert!(out.force.y.abs() < 1e-12);
        assert!(out.torque.norm() < 1e-12);
    }

    #[test]
    fn output_bounded_for_opposite_orientation_and_far_target() {
        let mut c = PoseController::new(config()).unwrap();
        let target = PoseTarget::new(
            Vector3::new(100.0, -100.0, 50.0),
            UnitQuaternion::from_axis_angle(&Vector3::x_axis(), PI),
        );
        let out = c.tick(&target, &BodyState::default(), 0.01);
        assert!(out.force.iter().all(|f| f.abs() <= 5.0));
        assert!(out.torque.iter().all(|t| t.abs() <= 2.0));
        assert!(out.torque.iter().all(|t| t.is_finite()));
    }

    #[test]
    fn entering_tracking_resets_accumulators() {
        let mut c = PoseController::new(config()).unwrap();
        let target = PoseTarget::at(Vector3::new(0.05, 0.0, 0.0));
        for _ in 0..50 {
            c.tick(&target, &BodyState::default(), 0.01);
        }
        assert!(c.location_pid().integral().norm() > 0.0);

        c.clear_target();
        assert_eq!(c.mode(), TrackingMode::Idle);
        c.set_target(target);
        assert_eq!(c.location_pid().integral(), Vector3::zeros());
    }

    #[test]
    fn target_jump_resets_but_small_moves_do_not() {
        let mut c = PoseController::new(config()).unwrap();
        let state = BodyState::default();
        c.tick(&PoseTarget::at(Vector3::new(0.01, 0.0, 0.0)), &state, 0.01);
        c.tick(&PoseTarget::at(Vector3::new(0.02, 0.0, 0.0)), &state, 0.01);
        assert!(c.location_pid().integral().norm() > 0.0);

        c.set_target(PoseTarget::at(Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(c.location_pid().integral(), Vector3::zeros());
    }

    #[test]
    fn offset_shifts_tracked_point() {
        let mut c = PoseController::new(config())
            .unwrap()
            .with_offset(Isometry3::translation(0.0, 0.0, 0.2));
        c.set_target(PoseTarget::at(Vector3::new(1.0, 0.0, 0.0)));
        let t = c.target().unwrap();
        assert!((t.position - Vector3::new(1.0, 0.0, 0.2)).norm() < 1e-12);
    }

    #[test]
    fn non_finite_state_degrades_to_zero() {
        let mut c = PoseController::new(config()).unwrap();
        let mut state = BodyState::default();
        state.position.x = f64::NAN;
        let out = c.tick(&PoseTarget::default(), &state, 0.01);
        assert!(out.is_zero());
    }

    #[test]
    fn invalid_config_rejected() {
        let mut cfg = config();
        cfg.rotation.kp = 0.0;
        assert!(PoseController::new(cfg).is_err());
    }
}
