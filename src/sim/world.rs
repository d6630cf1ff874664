use nalgebra::{Unit, Vector3};

use super::integrator::rk4_step;
use crate::body::{BodyProperties, GripperRig};
use crate::config::FixationConfig;
use crate::control::controller::{BodyHandle, ForceSink, PoseSource};
use crate::dynamics::rigid_body::Wrench;
use crate::dynamics::state::{Actuation, BodyState, ControlOutput, SimConfig};
use crate::error::ConfigError;

/// Distance (m) from an object face still reported as contact.
pub const CONTACT_TOLERANCE: f64 = 1e-4;

// ---------------------------------------------------------------------------
// Grasp object: rigid slab between the fingers
// ---------------------------------------------------------------------------

/// Slab of `width` centred on `center`, measured along `axis`.
/// Bodies starting outside it cannot enter it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GraspObject {
    pub center: Vector3<f64>,
    pub axis: Unit<Vector3<f64>>,
    pub width: f64,
    pub mass: f64,
}

impl GraspObject {
    fn offset(&self, p: &Vector3<f64>) -> f64 {
        (p - self.center).dot(&self.axis)
    }
}

/// How the grasp object moves.
#[derive(Debug, Clone, Copy, PartialEq)]
enum Carry {
    /// Supported in place until something picks it up.
    Resting,
    /// Welded to the midpoint of two fingers.
    Fixated { fingers: (BodyHandle, BodyHandle), offset: Vector3<f64> },
    /// Let go: flies with its release velocity under gravity.
    Free { velocity: Vector3<f64> },
}

struct SimBody {
    props: BodyProperties,
    state: BodyState,
    pending: Option<ControlOutput>,
    side: Option<f64>,  // which face of the object the body rests against
    contact: bool,
}

// ---------------------------------------------------------------------------
// Reference physics world
// ---------------------------------------------------------------------------

/// Free rigid bodies plus at most one grasp object, advanced with RK4.
pub struct SimWorld {
    bodies: Vec<SimBody>,
    gravity: Vector3<f64>,
    object: Option<GraspObject>,
    carry: Carry,
    time: f64,
}

impl SimWorld {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            bodies: Vec::new(),
            gravity: config.gravity(),
            object: None,
            carry: Carry::Resting,
            time: 0.0,
        }
    }

    pub fn add_body(&mut self, props: BodyProperties, state: BodyState) -> Result<BodyHandle, ConfigError> {
        props.validate()?;
        let side = self.object.and_then(|o| side_of(&o, &state.position));
        self.bodies.push(SimBody { props, state, pending: None, side, contact: false });
        Ok(BodyHandle(self.bodies.len() - 1))
    }

    /// Place both fingers of a rig, plus its object if it carries one.
    pub fn spawn_gripper(&mut self, rig: &GripperRig) -> Result<(BodyHandle, BodyHandle), ConfigError> {
        let (l, r) = rig.finger_positions(rig.initial_width);
        let q = rig.base.orientation;
        let finger = |p: Vector3<f64>| BodyState { orientation: q, ..BodyState::at_rest(p) };
        let left = self.add_body(rig.finger.clone(), finger(l))?;
        let right = self.add_body(rig.finger.clone(), finger(r))?;
        if let Some(width) = rig.object_width {
            self.set_grasp_object(GraspObject {
                center: rig.base.position,
                axis: rig.world_axis(),
                width,
                mass: rig.object_mass,
            });
        }
        tracing::debug!(rig = %rig.name, width = rig.initial_width, "spawned gripper");
        Ok((left, right))
    }

    /// Place a resting object, replacing any previous one.
    pub fn set_grasp_object(&mut self, object: GraspObject) {
        for body in &mut self.bodies {
            body.side = side_of(&object, &body.state.position);
        }
        self.object = Some(object);
        self.carry = Carry::Resting;
        self.update_contacts();
    }

    pub fn clear_grasp_object(&mut self) {
        self.object = None;
        self.carry = Carry::Resting;
        for body in &mut self.bodies {
            body.side = None;
            body.contact = false;
        }
    }

    pub fn grasp_object(&self) -> Option<&GraspObject> {
        self.object.as_ref()
    }

    /// Velocity of the grasp object; zero while resting.
    pub fn object_velocity(&self) -> Vector3<f64> {
        match self.carry {
            Carry::Resting => Vector3::zeros(),
            Carry::Fixated { fingers: (l, r), .. } => self.mean_velocity(l, r),
            Carry::Free { velocity } => velocity,
        }
    }

    pub fn is_fixated(&self) -> bool {
        matches!(self.carry, Carry::Fixated { .. })
    }

    /// Weld the object to `left` and `right` if both touch it and it is
    /// light and narrow enough. Returns whether it is now fixated.
    pub fn fixate_object(&mut self, (left, right): (BodyHandle, BodyHandle), limits: &FixationConfig) -> bool {
        let Some(object) = self.object else {
            return false;
        };
        if self.is_fixated() || !(self.in_contact(left) && self.in_contact(right)) {
            return false;
        }
        if object.mass > limits.max_mass || object.width > limits.max_length {
            tracing::debug!(mass = object.mass, width = object.width, "object too big to fixate");
            return false;
        }
        let (Some(a), Some(b)) = (self.state(left), self.state(right)) else {
            return false;
        };
        let offset = object.center - 0.5 * (a.position + b.position);
        self.carry = Carry::Fixated { fingers: (left, right), offset };
        true
    }

    /// Release a fixated object with the fingers' current velocity.
    pub fn detach_object(&mut self) -> Option<Vector3<f64>> {
        let Carry::Fixated { fingers: (l, r), .. } = self.carry else {
            return None;
        };
        let velocity = self.mean_velocity(l, r);
        self.carry = Carry::Free { velocity };
        Some(velocity)
    }

    fn mean_velocity(&self, a: BodyHandle, b: BodyHandle) -> Vector3<f64> {
        match (self.state(a), self.state(b)) {
            (Some(a), Some(b)) => 0.5 * (a.linear_velocity + b.linear_velocity),
            _ => Vector3::zeros(),
        }
    }

    pub fn state(&self, body: BodyHandle) -> Option<&BodyState> {
        self.bodies.get(body.0).map(|b| &b.state)
    }

    pub fn properties(&self, body: BodyHandle) -> Option<&BodyProperties> {
        self.bodies.get(body.0).map(|b| &b.props)
    }

    pub fn set_state(&mut self, body: BodyHandle, state: BodyState) {
        if let Some(b) = self.bodies.get_mut(body.0) {
            b.state = state;
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Advance every body by `dt`. Pending outputs are consumed by this step.
    pub fn step(&mut self, dt: f64) {
        for body in &mut self.bodies {
            let mut wrench = match body.pending.take() {
                Some(out) => actuate(body, &out),
                None => Wrench::zero(),
            };
            wrench.force += self.gravity * body.props.mass;
            body.state = rk4_step(&body.state, &body.props, &wrench, dt);
        }
        self.carry_object(dt);
        self.resolve_object();
        self.time += dt;
    }

    fn carry_object(&mut self, dt: f64) {
        let Some(object) = self.object.as_mut() else {
            return;
        };
        match &mut self.carry {
            Carry::Resting => {}
            Carry::Fixated { fingers: (l, r), offset } => {
                if let (Some(a), Some(b)) = (self.bodies.get(l.0), self.bodies.get(r.0)) {
                    object.center = 0.5 * (a.state.position + b.state.position) + *offset;
                }
            }
            Carry::Free { velocity } => {
                *velocity += self.gravity * dt;
                object.center += *velocity * dt;
            }
        }
    }

    fn resolve_object(&mut self) {
        let Some(object) = self.object else {
            return;
        };
        let half = 0.5 * object.width;
        let axis = object.axis.into_inner();
        for body in &mut self.bodies {
            let Some(side) = body.side else {
                continue;
            };
            let depth = side * object.offset(&body.state.position);
            if depth < half {
                body.state.position += axis * (side * (half - depth));
                let inward = side * body.state.linear_velocity.dot(&axis);
                if inward < 0.0 {
                    body.state.linear_velocity -= axis * (side * inward);
                }
            }
        }
        self.update_contacts();
    }

    fn update_contacts(&mut self) {
        let Some(object) = self.object else {
            return;
        };
        let half = 0.5 * object.width;
        for body in &mut self.bodies {
            body.contact = body
                .side
                .is_some_and(|side| side * object.offset(&body.state.position) <= half + CONTACT_TOLERANCE);
        }
    }
}

/// Which face a body outside the object sits against; `None` if inside.
fn side_of(object: &GraspObject, p: &Vector3<f64>) -> Option<f64> {
    let d = object.offset(p);
    (d.abs() >= 0.5 * object.width).then(|| d.signum())
}

/// Turn a controller output into a wrench, applying velocity and impulse
/// commands directly to the body state.
fn actuate(body: &mut SimBody, out: &ControlOutput) -> Wrench {
    let props = &body.props;
    let q = body.state.orientation;
    match out.actuation {
        Actuation::Force => Wrench { force: out.force, torque: out.torque },
        Actuation::Acceleration => {
            let alpha_body = q.inverse_transform_vector(&out.torque);
            Wrench {
                force: out.force * props.mass,
                torque: q.transform_vector(&props.inertia.component_mul(&alpha_body)),
            }
        }
        Actuation::Velocity => {
            body.state.linear_velocity = out.force;
            body.state.angular_velocity = out.torque;
            Wrench::zero()
        }
        Actuation::Impulse => {
            let l_body = q.inverse_transform_vector(&out.torque);
            body.state.linear_velocity += out.force / props.mass;
            body.state.angular_velocity += q.transform_vector(&l_body.component_div(&props.inertia));
            Wrench::zero()
        }
    }
}

impl PoseSource for SimWorld {
    fn body_state(&self, body: BodyHandle) -> Option<BodyState> {
        self.state(body).copied()
    }

    fn in_contact(&self, body: BodyHandle) -> bool {
        self.bodies.get(body.0).is_some_and(|b| b.contact)
    }
}

impl ForceSink for SimWorld {
    fn apply(&mut self, body: BodyHandle, output: &ControlOutput) {
        match self.bodies.get_mut(body.0) {
            Some(b) => b.pending = Some(*output),
            None => tracing::warn!(?body, "output for unknown body dropped"),
        }
    }

    fn fixate(&mut self, fingers: (BodyHandle, BodyHandle), limits: &FixationConfig) -> bool {
        self.fixate_object(fingers, limits)
    }

    fn detach(&mut self) -> Option<Vector3<f64>> {
        self.detach_object()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{presets, BodyBuilder};

    fn world() -> SimWorld {
        SimWorld::new(&SimConfig::default())
    }

    #[test]
    fn output_applies_for_one_step_only() {
        let mut w = world();
        let b = w.add_body(BodyBuilder::new("b").mass(1.0).build(), BodyState::default()).unwrap();
        w.apply(b, &ControlOutput { actuation: Actuation::Force, force: Vector3::x(), torque: Vector3::zeros() });
        w.step(0.1);
        let v = w.state(b).unwrap().linear_velocity.x;
        assert!((v - 0.1).abs() < 1e-12);
        w.step(0.1);
        assert!((w.state(b).unwrap().linear_velocity.x - v).abs() < 1e-12);
    }

    #[test]
    fn acceleration_mode_is_mass_independent() {
        let mut w = world();
        let light = w.add_body(BodyBuilder::new("light").mass(0.1).build(), BodyState::default()).unwrap();
        let heavy = w.add_body(BodyBuilder::new("heavy").mass(50.0).build(), BodyState::default()).unwrap();
        let out = ControlOutput { actuation: Actuation::Acceleration, force: Vector3::z(), torque: Vector3::zeros() };
        w.apply(light, &out);
        w.apply(heavy, &out);
        w.step(0.01);
        let (vl, vh) = (w.state(light).unwrap().linear_velocity.z, w.state(heavy).unwrap().linear_velocity.z);
        assert!((vl - vh).abs() < 1e-12);
    }

    #[test]
    fn velocity_and_impulse_modes() {
        let mut w = world();
        let b = w.add_body(BodyBuilder::new("b").mass(2.0).build(), BodyState::default()).unwrap();
        w.apply(b, &ControlOutput { actuation: Actuation::Velocity, force: Vector3::y(), torque: Vector3::zeros() });
        w.step(0.5);
        assert!((w.state(b).unwrap().position.y - 0.5).abs() < 1e-12);

        w.apply(b, &ControlOutput { actuation: Actuation::Impulse, force: Vector3::y() * 2.0, torque: Vector3::zeros() });
        w.step(0.5);
        assert!((w.state(b).unwrap().linear_velocity.y - 2.0).abs() < 1e-12);
    }

    #[test]
    fn gravity_comes_from_config() {
        let cfg = SimConfig { gravity: [0.0, 0.0, -9.81], ..SimConfig::default() };
        let mut w = SimWorld::new(&cfg);
        let b = w.add_body(BodyBuilder::new("b").build(), BodyState::default()).unwrap();
        w.step(1.0);
        assert!((w.state(b).unwrap().linear_velocity.z + 9.81).abs() < 1e-9);
    }

    #[test]
    fn fingers_cannot_enter_object() {
        let mut w = world();
        let (l, r) = w.spawn_gripper(&presets::block_grasp()).unwrap();
        assert!(!w.in_contact(l));

        let squeeze = |dir: f64| ControlOutput {
            actuation: Actuation::Force,
            force: Vector3::y() * dir,
            torque: Vector3::zeros(),
        };
        for _ in 0..400 {
            w.apply(l, &squeeze(-2.0));
            w.apply(r, &squeeze(2.0));
            w.step(0.005);
        }
        let (pl, pr) = (w.state(l).unwrap().position, w.state(r).unwrap().position);
        assert!(((pl.y - pr.y) - 0.05).abs() < 1e-9);
        assert!(w.in_contact(l) && w.in_contact(r));
        assert!(w.state(l).unwrap().linear_velocity.y.abs() < 1e-9);
    }

    #[test]
    fn massless_body_is_rejected() {
        let mut w = world();
        let props = BodyBuilder::new("ghost").mass(0.0).build();
        assert!(matches!(w.add_body(props, BodyState::default()), Err(ConfigError::InvalidMass(_))));
        assert!(w.is_empty());
    }

    fn close_on_block(w: &mut SimWorld, l: BodyHandle, r: BodyHandle) {
        let squeeze = |dir: f64| ControlOutput {
            actuation: Actuation::Force,
            force: Vector3::y() * dir,
            torque: Vector3::zeros(),
        };
        for _ in 0..400 {
            w.apply(l, &squeeze(-2.0));
            w.apply(r, &squeeze(2.0));
            w.step(0.005);
        }
    }

    #[test]
    fn fixated_object_follows_fingers_and_keeps_their_velocity() {
        let mut w = world();
        let (l, r) = w.spawn_gripper(&presets::block_grasp()).unwrap();
        close_on_block(&mut w, l, r);
        let start = w.grasp_object().unwrap().center;
        assert!(w.fixate_object((l, r), &FixationConfig::default()));
        assert!(!w.fixate_object((l, r), &FixationConfig::default()));

        let lift = ControlOutput { actuation: Actuation::Velocity, force: Vector3::z(), torque: Vector3::zeros() };
        w.apply(l, &lift);
        w.apply(r, &lift);
        w.step(0.1);
        let carried = w.grasp_object().unwrap().center;
        assert!((carried.z - start.z - 0.1).abs() < 1e-9);
        assert!((w.object_velocity().z - 1.0).abs() < 1e-9);

        let v = w.detach_object().unwrap();
        assert!((v.z - 1.0).abs() < 1e-9);
        assert!(!w.is_fixated());
        w.step(0.1);
        assert!((w.grasp_object().unwrap().center.z - carried.z - 0.1).abs() < 1e-9);
        assert!(w.detach_object().is_none());
    }

    #[test]
    fn fixation_needs_contact_and_a_small_object() {
        let mut w = world();
        let (l, r) = w.spawn_gripper(&presets::block_grasp()).unwrap();
        assert!(!w.fixate_object((l, r), &FixationConfig::default()));

        close_on_block(&mut w, l, r);
        let tight = FixationConfig { max_mass: 0.1, ..FixationConfig::default() };
        assert!(!w.fixate_object((l, r), &tight));
        let narrow = FixationConfig { max_length: 0.01, ..FixationConfig::default() };
        assert!(!w.fixate_object((l, r), &narrow));
        assert!(w.fixate_object((l, r), &FixationConfig::default()));
    }
}
