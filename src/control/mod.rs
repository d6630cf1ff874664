pub mod controller;
pub mod gripper;
pub mod observer;
pub mod pid;
pub mod pose;

pub use controller::{BodyHandle, Controller, ForceSink, GripperBinding, PhysicsWorld, PoseBinding, PoseSource};
pub use gripper::{FingerFeedback, GripperController, GripperOutput, GripperState};
pub use observer::{ControlObserver, Recorder, TickSample, TracingObserver};
pub use pid::{Pid, ScalarPid, VectorPid};
pub use pose::{PoseController, TrackingMode};
