pub mod body;
pub mod config;
pub mod control;
pub mod dynamics;
pub mod error;
pub mod input;
pub mod io;
pub mod sim;

pub use config::{Config, FixationConfig, GripperConfig, PidGains, PoseControllerConfig};
pub use control::{Controller, GripperController, Pid, PoseController};
pub use dynamics::state::{Actuation, BodyState, ControlOutput, PoseTarget, SimConfig};
pub use error::{ConfigError, ControlError, Error, Result};
