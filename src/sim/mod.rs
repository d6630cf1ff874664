pub mod event;
pub mod integrator;
pub mod runner;
pub mod scenario;
pub mod world;

pub use event::{EventDetector, EventKind, SimEvent};
pub use integrator::rk4_step;
pub use runner::{simulate, simulate_with};
pub use scenario::{gripper_rig, pose_rig};
pub use world::{GraspObject, SimWorld};
