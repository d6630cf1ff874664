use nalgebra::{Quaternion, Vector3};

use crate::body::BodyProperties;
use crate::dynamics::state::BodyState;

// ---------------------------------------------------------------------------
// Rigid-body equations of motion
// ---------------------------------------------------------------------------

/// Net force and torque on a body, world frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wrench {
    pub force: Vector3<f64>,   // N
    pub torque: Vector3<f64>,  // N·m, about the centre of mass
}

impl Wrench {
    pub fn zero() -> Self {
        Self { force: Vector3::zeros(), torque: Vector3::zeros() }
    }
}

impl Default for Wrench {
    fn default() -> Self {
        Self::zero()
    }
}

/// Time derivative of a [`BodyState`].
#[derive(Debug, Clone, Copy)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
    pub dquat: Quaternion<f64>,
    pub domega: Vector3<f64>,  // world frame
}

/// Compute state derivatives for a free rigid body.
///
/// Forces & moments:
///   1. External wrench (controller output, gravity), world frame
///   2. Linear and angular damping proportional to velocity
///
/// Rotation uses Euler's equation in the body frame with a diagonal inertia
/// tensor; the result is rotated back so angular velocity stays world frame.
pub fn derivatives(state: &BodyState, body: &BodyProperties, wrench: &Wrench) -> Deriv {
    // --- Translation ---
    let f_total = wrench.force - state.linear_velocity * (body.linear_damping * body.mass);
    let accel = f_total / body.mass;

    // --- Rotation (body frame) ---
    let q = state.orientation;
    let omega_body = q.inverse_transform_vector(&state.angular_velocity);
    let torque_body = q.inverse_transform_vector(&wrench.torque)
        - body.inertia.component_mul(&omega_body) * body.angular_damping;

    // --- Euler's equation: I * domega = torque - omega × (I * omega) ---
    let i_omega = body.inertia.component_mul(&omega_body);
    let domega_body = (torque_body - omega_body.cross(&i_omega)).component_div(&body.inertia);

    // --- Quaternion kinematics (world-frame omega): dq/dt = 0.5 * omega_quat * q ---
    let w = state.angular_velocity;
    let omega_quat = Quaternion::new(0.0, w.x, w.y, w.z);
    let dquat = omega_quat * q.quaternion() * 0.5;

    Deriv {
        dpos: state.linear_velocity,
        dvel: accel,
        dquat,
        domega: q.transform_vector(&domega_body),
    }
}
