//! Property tests for the PID, pose and gripper controllers.

use nalgebra::{Unit, UnitQuaternion, Vector3};
use proptest::prelude::*;

use physics_mc::control::gripper::FingerFeedback;
use physics_mc::control::{GripperController, Pid, PoseController, ScalarPid};
use physics_mc::{Actuation, BodyState, GripperConfig, PidGains, PoseControllerConfig, PoseTarget};

fn gains() -> impl Strategy<Value = PidGains> {
    (0.01..50.0f64, 0.0..20.0f64, 0.0..5.0f64, 0.5..100.0f64)
        .prop_map(|(kp, ki, kd, limit)| PidGains::new(kp, ki, kd).with_output_limit(limit))
}

fn vector(range: f64) -> impl Strategy<Value = Vector3<f64>> {
    (-range..range, -range..range, -range..range).prop_map(|(x, y, z)| Vector3::new(x, y, z))
}

fn orientation() -> impl Strategy<Value = UnitQuaternion<f64>> {
    vector(1.0).prop_map(|v| UnitQuaternion::from_scaled_axis(v * std::f64::consts::PI))
}

fn axis() -> impl Strategy<Value = Unit<Vector3<f64>>> {
    vector(1.0).prop_filter("non-zero axis", |v| v.norm() > 1e-3).prop_map(Unit::new_normalize)
}

proptest! {
    /// Constant error: output stays inside the clamp and the integral drives it onto the bound
    #[test]
    fn constant_error_saturates_at_bound(
        kp in 0.01..5.0f64,
        ki in 1.0..10.0f64,
        kd in 0.0..1.0f64,
        limit in 1.0..10.0f64,
        error in prop_oneof![-1.0..-0.1f64, 0.1..1.0f64],
    ) {
        let mut pid: ScalarPid = Pid::new(PidGains::new(kp, ki, kd).with_output_limit(limit)).unwrap();
        let mut out = 0.0;
        for _ in 0..20_000 {
            out = pid.update(error, 0.01);
            prop_assert!(out.abs() <= limit);
        }
        prop_assert_eq!(out, limit.copysign(error));
    }

    /// reset() then update() matches a fresh controller
    #[test]
    fn reset_matches_fresh(
        g in gains(),
        history in prop::collection::vec((-5.0..5.0f64, 0.001..0.1f64), 0..50),
        e in -5.0..5.0f64,
        dt in 0.001..0.1f64,
    ) {
        let mut used: ScalarPid = Pid::new(g).unwrap();
        for (err, step) in history {
            used.update(err, step);
        }
        used.reset();
        let mut fresh: ScalarPid = Pid::new(g).unwrap();
        prop_assert_eq!(used.update(e, dt), fresh.update(e, dt));
    }

    /// dt <= 0 leaves the accumulator and previous error alone
    #[test]
    fn non_positive_dt_is_inert(
        g in gains(),
        warmup in -5.0..5.0f64,
        e in -5.0..5.0f64,
        dt in -1.0..=0.0f64,
    ) {
        let mut pid: ScalarPid = Pid::new(g).unwrap();
        let prior = pid.update(warmup, 0.01);
        let (integral, prev) = (pid.integral(), pid.previous_error());

        prop_assert_eq!(pid.update(e, dt), prior);
        prop_assert_eq!(pid.integral(), integral);
        prop_assert_eq!(pid.previous_error(), prev);
    }

    /// Pose output is bounded for any pose pair
    #[test]
    fn pose_output_bounded(
        loc in gains(),
        rot in gains(),
        target_pos in vector(100.0),
        target_rot in orientation(),
        current_pos in vector(100.0),
        current_rot in orientation(),
        velocity in vector(10.0),
        ticks in 1usize..20,
    ) {
        let config = PoseControllerConfig { location: loc, rotation: rot, ..PoseControllerConfig::preset(Actuation::Force) };
        let mut c = PoseController::new(config).unwrap();
        let target = PoseTarget::new(target_pos, target_rot);
        let state = BodyState {
            position: current_pos,
            orientation: current_rot,
            linear_velocity: velocity,
            angular_velocity: velocity,
        };
        for _ in 0..ticks {
            let out = c.tick(&target, &state, 0.005);
            prop_assert!(out.force.iter().all(|f| f.abs() <= loc.output_max));
            prop_assert!(out.torque.iter().all(|t| t.abs() <= rot.output_max));
        }
    }

    /// Degenerate inputs: same pose, and exactly opposite orientation
    #[test]
    fn pose_output_bounded_for_degenerate_pairs(
        loc in gains(),
        rot in gains(),
        pos in vector(10.0),
        q in orientation(),
        flip_axis in axis(),
    ) {
        let config = PoseControllerConfig { location: loc, rotation: rot, ..PoseControllerConfig::default() };
        let mut c = PoseController::new(config).unwrap();

        let here = BodyState { orientation: q, ..BodyState::at_rest(pos) };
        let out = c.tick(&PoseTarget::new(pos, q), &here, 0.005);
        prop_assert!(out.force.norm() < 1e-9);
        prop_assert!(out.torque.norm() < 1e-6);

        let flipped = UnitQuaternion::from_axis_angle(&flip_axis, std::f64::consts::PI) * q;
        let out = c.tick(&PoseTarget::new(pos, flipped), &here, 0.005);
        prop_assert!(out.torque.iter().all(|t| t.is_finite() && t.abs() <= rot.output_max));
        prop_assert!((c.rotation_error().norm() - std::f64::consts::PI).abs() < 1e-6);
    }

    /// The closing force of either finger never exceeds the grip limit
    #[test]
    fn squeeze_never_exceeds_grip_limit(
        max_force in 0.5..20.0f64,
        request in 0.0..0.1f64,
        width in 0.0..0.1f64,
        contact in any::<bool>(),
        ticks in 1usize..50,
    ) {
        let config = GripperConfig { max_grip_force: max_force, release_force: None, ..GripperConfig::default() };
        let mut g = GripperController::new(config).unwrap();
        g.set_grasp_width(request);
        let feedback = FingerFeedback {
            left: BodyState::at_rest(Vector3::new(0.0, 0.5 * width, 0.0)),
            right: BodyState::at_rest(Vector3::new(0.0, -0.5 * width, 0.0)),
            left_contact: contact,
            right_contact: contact,
        };
        for _ in 0..ticks {
            let out = g.tick(&feedback, 0.005);
            prop_assert!(-out.left.force.y <= max_force + 1e-9);
            prop_assert!(out.right.force.y <= max_force + 1e-9);
            prop_assert!(g.state().applied_force <= max_force + 1e-9);
        }
    }
}
