pub mod rigid_body;
pub mod state;

pub use rigid_body::{derivatives, Deriv, Wrench};
pub use state::{Actuation, BodyState, ControlOutput, PoseTarget, SimConfig};
