use nalgebra::{Unit, Vector3};

use super::pose::PoseController;
use crate::config::GripperConfig;
use crate::dynamics::state::{BodyState, ControlOutput, PoseTarget};
use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Per-tick data
// ---------------------------------------------------------------------------

/// What the physics world reports about both fingers this tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct FingerFeedback {
    pub left: BodyState,
    pub right: BodyState,
    pub left_contact: bool,
    pub right_contact: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GripperOutput {
    pub left: ControlOutput,
    pub right: ControlOutput,
}

impl Default for GripperOutput {
    fn default() -> Self {
        Self { left: ControlOutput::default(), right: ControlOutput::default() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GripperState {
    pub separation: f64,     // m, measured along the closing axis
    pub target_width: f64,   // m, width the fingers are driven to this tick
    pub applied_force: f64,  // N, squeeze of the fingers in contact
    pub contact: bool,
    pub holding: bool,       // target frozen by the force limit
}

// ---------------------------------------------------------------------------
// Parallel gripper
// ---------------------------------------------------------------------------

/// Two opposing finger pose controllers sharing one symmetric width target.
///
/// The left finger sits on `+axis`, the right on `-axis`, both centred on the
/// base pose. When the squeeze force of the fingers in contact reaches
/// `max_grip_force` the width target freezes at the measured separation.
/// While frozen, every finger in contact presses with exactly
/// `max_grip_force`, so the hold only ends when the transmitted force falls
/// below the release force (contact lost) or a wider width is requested. The
/// closing component of each finger force is never allowed above
/// `max_grip_force`.
#[derive(Debug, Clone)]
pub struct GripperController {
    config: GripperConfig,
    axis: Unit<Vector3<f64>>,
    left: PoseController,
    right: PoseController,
    base: PoseTarget,
    requested_width: f64,
    frozen_width: Option<f64>,
    state: GripperState,
    last_output: GripperOutput,
}

impl GripperController {
    pub fn new(config: GripperConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let width = config.max_width;
        Ok(Self {
            axis: config.axis(),
            left: PoseController::new(config.finger)?,
            right: PoseController::new(config.finger)?,
            base: PoseTarget::default(),
            requested_width: width,
            frozen_width: None,
            state: GripperState { separation: width, target_width: width, ..GripperState::default() },
            last_output: GripperOutput::default(),
            config,
        })
    }

    pub fn config(&self) -> &GripperConfig {
        &self.config
    }

    /// Request a symmetric finger separation (m), clamped to `[0, max_width]`.
    pub fn set_grasp_width(&mut self, width: f64) {
        if !width.is_finite() {
            tracing::warn!(width, "ignoring non-finite grasp width");
            return;
        }
        let width = width.clamp(0.0, self.config.max_width);
        if let Some(frozen) = self.frozen_width {
            if width > frozen {
                tracing::debug!(frozen, width, "grasp opened, releasing frozen width");
                self.frozen_width = None;
                // integral still holds the grip load
                self.left.reset();
                self.right.reset();
            }
        }
        self.requested_width = width;
    }

    /// Trigger-style input: 0 is fully open, 1 fully closed.
    pub fn set_grasp_input(&mut self, value: f64) {
        if !value.is_finite() {
            tracing::warn!(value, "ignoring non-finite grasp input");
            return;
        }
        self.set_grasp_width((1.0 - value.clamp(0.0, 1.0)) * self.config.max_width);
    }

    pub fn set_base_pose(&mut self, base: PoseTarget) {
        self.base = base;
    }

    pub fn base_pose(&self) -> &PoseTarget {
        &self.base
    }

    pub fn requested_width(&self) -> f64 {
        self.requested_width
    }

    /// World-frame closing axis.
    pub fn world_axis(&self) -> Unit<Vector3<f64>> {
        self.base.orientation * self.axis
    }

    /// Finger targets for a given width, (left, right).
    pub fn finger_targets(&self, width: f64) -> (PoseTarget, PoseTarget) {
        let half = self.world_axis().into_inner() * (0.5 * width);
        let q = self.base.orientation;
        (
            PoseTarget::new(self.base.position + half, q),
            PoseTarget::new(self.base.position - half, q),
        )
    }

    pub fn tick(&mut self, feedback: &FingerFeedback, dt: f64) -> GripperOutput {
        if !(dt > 0.0) {
            tracing::warn!(dt, "gripper rejected non-positive timestep, holding previous output");
            return self.last_output;
        }

        let axis = self.world_axis().into_inner();
        let separation = (feedback.left.position - feedback.right.position).dot(&axis);
        let width = self.frozen_width.unwrap_or(self.requested_width);
        let (left_target, right_target) = self.finger_targets(width);

        let mut left = self.left.tick(&left_target, &feedback.left, dt);
        let mut right = self.right.tick(&right_target, &feedback.right, dt);

        // Closing is -axis for the left finger and +axis for the right one
        let max = self.config.max_grip_force;
        let holding = self.frozen_width.is_some();
        let left_squeeze = squeeze(&mut left, -axis, max, holding && feedback.left_contact);
        let right_squeeze = squeeze(&mut right, axis, max, holding && feedback.right_contact);

        let (pressing, total) = [
            (feedback.left_contact, left_squeeze),
            (feedback.right_contact, right_squeeze),
        ]
        .into_iter()
        .filter(|(contact, _)| *contact)
        .fold((0_u32, 0.0), |(n, sum), (_, f)| (n + 1, sum + f.max(0.0)));
        let contact = pressing > 0;
        let applied_force = if contact { total / f64::from(pressing) } else { 0.0 };

        match self.frozen_width {
            None if contact && applied_force >= max => {
                tracing::info!(separation, applied_force, "grip force limit reached, holding width");
                self.frozen_width = Some(separation.clamp(0.0, self.config.max_width));
                // the target steps to the measured width: no derivative kick
                self.left.reset_derivative();
                self.right.reset_derivative();
            }
            Some(frozen) if applied_force < self.config.release_force() => {
                tracing::info!(frozen, applied_force, "grip force lost, releasing width");
                self.frozen_width = None;
            }
            _ => {}
        }

        self.state = GripperState {
            separation,
            target_width: width,
            applied_force,
            contact,
            holding: self.frozen_width.is_some(),
        };
        self.last_output = GripperOutput { left, right };
        self.last_output
    }

    pub fn state(&self) -> GripperState {
        self.state
    }

    pub fn last_output(&self) -> GripperOutput {
        self.last_output
    }

    pub fn is_grasping(&self) -> bool {
        self.state.contact && self.state.applied_force >= self.config.grasp_force_threshold
    }

    /// True while the width target is frozen by the force limit.
    pub fn is_holding(&self) -> bool {
        self.frozen_width.is_some()
    }

    pub fn fingers(&self) -> (&PoseController, &PoseController) {
        (&self.left, &self.right)
    }

    pub fn reset(&mut self) {
        self.left.clear_target();
        self.right.clear_target();
        self.frozen_width = None;
        self.requested_width = self.config.max_width;
        self.last_output = GripperOutput::default();
    }
}

/// Cap the force component along `closing` at `max`, or pin it there when
/// `press` is set. Returns the resulting squeeze.
fn squeeze(out: &mut ControlOutput, closing: Vector3<f64>, max: f64, press: bool) -> f64 {
    let squeeze = out.force.dot(&closing);
    if press || squeeze > max {
        out.force += closing * (max - squeeze);
        max
    } else {
        squeeze
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DiscontinuityPolicy, PidGains, PoseControllerConfig};
    use crate::dynamics::state::Actuation;

    fn config() -> GripperConfig {
        GripperConfig {
            finger: PoseControllerConfig {
                actuation: Actuation::Force,
                location: PidGains::new(10.0, 50.0, 1.0).with_output_limit(20.0),
                rotation: PidGains::new(0.1, 0.0, 0.0).with_output_limit(1.0),
                reset: DiscontinuityPolicy::never(),
            },
            max_grip_force: 5.0,
            grasp_force_threshold: 1.0,
            release_force: Some(2.0),
            max_width: 0.1,
            axis: [0.0, 1.0, 0.0],
            fixation: None,
        }
    }

    fn feedback(width: f64, contact: bool) -> FingerFeedback {
        FingerFeedback {
            left: BodyState::at_rest(Vector3::new(0.0, 0.5 * width, 0.0)),
            right: BodyState::at_rest(Vector3::new(0.0, -0.5 * width, 0.0)),
            left_contact: contact,
            right_contact: contact,
        }
    }

    #[test]
    fn closing_pushes_fingers_inward() {
        let mut g = GripperController::new(config()).unwrap();
        g.set_grasp_width(0.0);
        let out = g.tick(&feedback(0.1, false), 0.005);
        assert!(out.left.force.y < 0.0);
        assert!(out.right.force.y > 0.0);
        assert!(!g.is_grasping());
        assert!((g.state().separation - 0.1).abs() < 1e-12);
    }

    #[test]
    fn squeeze_never_exceeds_max_grip_force() {
        let mut g = GripperController::new(config()).unwrap();
        g.set_grasp_width(0.0);
        for _ in 0..200 {
            let out = g.tick(&feedback(0.05, true), 0.005);
            assert!(-out.left.force.y <= 5.0 + 1e-9);
            assert!(out.right.force.y <= 5.0 + 1e-9);
        }
    }

    #[test]
    fn force_limit_freezes_width_until_release() {
        let mut g = GripperController::new(config()).unwrap();
        g.set_grasp_width(0.0);
        for _ in 0..2000 {
            g.tick(&feedback(0.05, true), 0.005);
            if g.is_holding() {
                break;
            }
        }
        assert!(g.is_holding());
        assert!(g.is_grasping());

        // A narrower request does not move the frozen target
        g.set_grasp_width(0.0);
        g.tick(&feedback(0.05, true), 0.005);
        assert!((g.state().target_width - 0.05).abs() < 1e-9);

        // Opening releases immediately
        g.set_grasp_width(0.08);
        assert!(!g.is_holding());
    }

    #[test]
    fn hold_keeps_pressing_without_integral_action() {
        let cfg = GripperConfig { max_grip_force: 5.0, ..GripperConfig::default() };
        assert_eq!(cfg.finger.location.ki, 0.0);
        let mut g = GripperController::new(cfg).unwrap();
        g.set_grasp_width(0.0);

        g.tick(&feedback(0.05, true), 0.005);
        assert!(g.is_holding());
        for _ in 0..200 {
            let out = g.tick(&feedback(0.05, true), 0.005);
            assert!(g.is_holding() && g.is_grasping());
            assert_eq!(g.state().applied_force, 5.0);
            assert!((out.left.force.y + 5.0).abs() < 1e-9);
            assert!((out.right.force.y - 5.0).abs() < 1e-9);
        }
    }

    #[test]
    fn losing_contact_releases_hold() {
        let cfg = GripperConfig { max_grip_force: 5.0, ..GripperConfig::default() };
        let mut g = GripperController::new(cfg).unwrap();
        g.set_grasp_width(0.0);
        g.tick(&feedback(0.05, true), 0.005);
        assert!(g.is_holding());

        g.tick(&feedback(0.05, false), 0.005);
        assert!(!g.is_holding());
        assert!(!g.is_grasping());
        assert_eq!(g.state().target_width, 0.05);
        g.tick(&feedback(0.05, false), 0.005);
        assert_eq!(g.state().target_width, 0.0);
    }

    #[test]
    fn no_freeze_without_contact() {
        let mut g = GripperController::new(config()).unwrap();
        g.set_grasp_width(0.0);
        for _ in 0..400 {
            g.tick(&feedback(0.1, false), 0.005);
        }
        assert!(!g.is_holding());
        assert_eq!(g.state().applied_force, 0.0);
    }

    #[test]
    fn grasp_input_maps_to_width() {
        let mut g = GripperController::new(config()).unwrap();
        g.set_grasp_input(1.0);
        assert_eq!(g.requested_width(), 0.0);
        g.set_grasp_input(0.25);
        assert!((g.requested_width() - 0.075).abs() < 1e-12);
        g.set_grasp_input(-3.0);
        assert!((g.requested_width() - 0.1).abs() < 1e-12);
        g.set_grasp_width(f64::NAN);
        assert!((g.requested_width() - 0.1).abs() < 1e-12);
    }

    #[test]
    fn zero_dt_holds_previous_output() {
        let mut g = GripperController::new(config()).unwrap();
        g.set_grasp_width(0.0);
        let out = g.tick(&feedback(0.1, false), 0.005);
        assert_eq!(g.tick(&feedback(0.1, false), 0.0), out);
    }
}
