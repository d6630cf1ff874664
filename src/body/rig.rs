use nalgebra::{Unit, Vector3};

use super::properties::{BodyBuilder, BodyProperties};
use crate::dynamics::state::PoseTarget;

// ---------------------------------------------------------------------------
// Parallel gripper rig: a base frame with two opposing fingers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct GripperRig {
    pub name: String,
    pub base: PoseTarget,
    pub axis: Unit<Vector3<f64>>,   // closing axis in the base frame, left finger on +axis
    pub initial_width: f64,         // m, finger separation at spawn
    pub finger: BodyProperties,
    pub object_width: Option<f64>,  // m, rigid object centred between the fingers
    pub object_mass: f64,           // kg
}

impl GripperRig {
    /// World-frame closing axis.
    pub fn world_axis(&self) -> Unit<Vector3<f64>> {
        self.base.orientation * self.axis
    }

    /// World positions of the (left, right) fingers at the given separation.
    pub fn finger_positions(&self, width: f64) -> (Vector3<f64>, Vector3<f64>) {
        let half = self.world_axis().into_inner() * (0.5 * width);
        (self.base.position + half, self.base.position - half)
    }
}

// ---------------------------------------------------------------------------
// Rig builder
// ---------------------------------------------------------------------------

pub struct RigBuilder {
    name: String,
    base: PoseTarget,
    axis: Unit<Vector3<f64>>,
    initial_width: f64,
    finger: BodyProperties,
    object_width: Option<f64>,
    object_mass: f64,
}

impl RigBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            base: PoseTarget::default(),
            axis: Vector3::y_axis(),
            initial_width: 0.1,
            finger: BodyBuilder::new("finger").mass(0.1).inertia(Vector3::new(1e-4, 1e-4, 1e-4)).build(),
            object_width: None,
            object_mass: 0.2,
        }
    }

    pub fn base(mut self, v: PoseTarget) -> Self { self.base = v; self }
    pub fn axis(mut self, v: Unit<Vector3<f64>>) -> Self { self.axis = v; self }
    pub fn initial_width(mut self, v: f64) -> Self { self.initial_width = v; self }
    pub fn finger(mut self, v: BodyProperties) -> Self { self.finger = v; self }
    pub fn object_width(mut self, v: f64) -> Self { self.object_width = Some(v); self }
    pub fn object_mass(mut self, v: f64) -> Self { self.object_mass = v; self }

    pub fn build(self) -> GripperRig {
        GripperRig {
            name: self.name,
            base: self.base,
            axis: self.axis,
            initial_width: self.initial_width,
            finger: self.finger,
            object_width: self.object_width,
            object_mass: self.object_mass,
        }
    }
}

// ---------------------------------------------------------------------------
// Preset rigs
// ---------------------------------------------------------------------------

pub mod presets {
    use super::*;

    /// Open gripper, nothing between the fingers.
    pub fn open_gripper() -> GripperRig {
        RigBuilder::new("Open").initial_width(0.1).build()
    }

    /// Fingers 10 cm apart closing on a 5 cm block.
    pub fn block_grasp() -> GripperRig {
        RigBuilder::new("Block")
            .initial_width(0.1)
            .object_width(0.05)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::UnitQuaternion;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn fingers_straddle_base() {
        let rig = presets::open_gripper();
        let (l, r) = rig.finger_positions(0.1);
        assert!(((l - r).norm() - 0.1).abs() < 1e-12);
        assert!(((l + r) * 0.5 - rig.base.position).norm() < 1e-12);
        assert!(l.y > r.y, "left finger sits on +axis");
    }

    #[test]
    fn world_axis_follows_base_rotation() {
        let rig = RigBuilder::new("Rolled")
            .base(PoseTarget::new(
                Vector3::zeros(),
                UnitQuaternion::from_axis_angle(&Vector3::x_axis(), FRAC_PI_2),
            ))
            .build();
        // Local +Y rolled 90 deg about X lands on world +Z
        assert!((rig.world_axis().into_inner() - Vector3::z()).norm() < 1e-12);
    }
}
