use crate::body::{BodyProperties, GripperRig};
use crate::config::Config;
use crate::control::controller::{GripperBinding, PoseBinding};
use crate::control::gripper::GripperController;
use crate::control::pose::PoseController;
use crate::dynamics::state::{BodyState, PoseTarget};
use crate::error::ConfigError;
use super::world::SimWorld;

// ---------------------------------------------------------------------------
// Ready-made world + controller pairs
// ---------------------------------------------------------------------------

/// One free body at rest at the origin, bound to a pose controller that
/// already holds `target`.
pub fn pose_rig(
    config: &Config,
    body: BodyProperties,
    target: PoseTarget,
) -> Result<(SimWorld, PoseBinding), ConfigError> {
    config.sim.validate()?;
    let mut world = SimWorld::new(&config.sim);
    let name = body.name.clone();
    let handle = world.add_body(body, BodyState::default())?;
    let mut controller = PoseController::new(config.pose)?;
    controller.set_target(target);
    Ok((world, PoseBinding::new(name, handle, controller)))
}

/// Spawn `rig` and bind its fingers to a gripper controller centred on the
/// rig base, starting at the rig's initial width.
pub fn gripper_rig(config: &Config, rig: &GripperRig) -> Result<(SimWorld, GripperBinding), ConfigError> {
    config.sim.validate()?;
    let mut world = SimWorld::new(&config.sim);
    let fingers = world.spawn_gripper(rig)?;
    let mut gripper = GripperController::new(config.gripper)?;
    gripper.set_base_pose(rig.base);
    gripper.set_grasp_width(rig.initial_width);
    Ok((world, GripperBinding::new(rig.name.clone(), fingers, gripper)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{presets, BodyBuilder};
    use crate::control::controller::Controller;
    use nalgebra::Vector3;

    #[test]
    fn gripper_rig_places_fingers_at_initial_width() {
        let (world, binding) = gripper_rig(&Config::default(), &presets::block_grasp()).unwrap();
        let (l, r) = binding.fingers();
        let sep = world.state(l).unwrap().position.y - world.state(r).unwrap().position.y;
        assert!((sep - 0.1).abs() < 1e-12);
        assert!(world.grasp_object().is_some());
        assert_eq!(binding.name(), "Block");
    }

    #[test]
    fn pose_rig_rejects_massless_body() {
        let body = BodyBuilder::new("ghost").mass(0.0).build();
        assert!(pose_rig(&Config::default(), body, PoseTarget::at(Vector3::z())).is_err());
    }
}
