use nalgebra::UnitQuaternion;

use crate::body::BodyProperties;
use crate::dynamics::rigid_body::{derivatives, Deriv, Wrench};
use crate::dynamics::state::BodyState;

// ---------------------------------------------------------------------------
// RK4 integrator with constant wrench over the step
// ---------------------------------------------------------------------------

fn offset(state: &BodyState, d: &Deriv, h: f64) -> BodyState {
    BodyState {
        position: state.position + d.dpos * h,
        orientation: UnitQuaternion::new_normalize(state.orientation.quaternion() + d.dquat * h),
        linear_velocity: state.linear_velocity + d.dvel * h,
        angular_velocity: state.angular_velocity + d.domega * h,
    }
}

/// Single RK4 step with the wrench held constant over the step.
pub fn rk4_step(state: &BodyState, body: &BodyProperties, wrench: &Wrench, dt: f64) -> BodyState {
    let k1 = derivatives(state, body, wrench);
    let k2 = derivatives(&offset(state, &k1, dt * 0.5), body, wrench);
    let k3 = derivatives(&offset(state, &k2, dt * 0.5), body, wrench);
    let k4 = derivatives(&offset(state, &k3, dt), body, wrench);

    let new_quat_raw = state.orientation.quaternion()
        + (k1.dquat + k2.dquat * 2.0 + k3.dquat * 2.0 + k4.dquat) * (dt / 6.0);

    BodyState {
        position: state.position + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        orientation: UnitQuaternion::new_normalize(new_quat_raw),
        linear_velocity: state.linear_velocity
            + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
        angular_velocity: state.angular_velocity
            + (k1.domega + 2.0 * k2.domega + 2.0 * k3.domega + k4.domega) * (dt / 6.0),
    }
}
