pub mod properties;
pub mod rig;

pub use properties::{BodyBuilder, BodyProperties};
pub use rig::{GripperRig, RigBuilder, presets};
