use super::gripper::{FingerFeedback, GripperController};
use super::observer::{GripperSample, PoseSample, Telemetry, TickSample};
use super::pose::{PoseController, TrackingMode};
use crate::config::FixationConfig;
use crate::dynamics::state::{BodyState, ControlOutput};
use crate::input::{Command, Inbox};
use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Physics world boundary
// ---------------------------------------------------------------------------

/// Opaque reference to a body owned by the physics world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BodyHandle(pub usize);

/// Read side of the physics world.
pub trait PoseSource {
    fn body_state(&self, body: BodyHandle) -> Option<BodyState>;

    /// Whether the body is touching something it cannot pass through.
    fn in_contact(&self, _body: BodyHandle) -> bool {
        false
    }
}

/// Write side of the physics world. An output applies for exactly one step.
pub trait ForceSink {
    fn apply(&mut self, body: BodyHandle, output: &ControlOutput);

    /// Weld the object between two fingers to them. Worlds without
    /// fixation refuse.
    fn fixate(&mut self, _fingers: (BodyHandle, BodyHandle), _limits: &FixationConfig) -> bool {
        false
    }

    /// Let go of a fixated object, returning the velocity it leaves with.
    fn detach(&mut self) -> Option<Vector3<f64>> {
        None
    }
}

pub trait PhysicsWorld: PoseSource + ForceSink {}

impl<W: PoseSource + ForceSink + ?Sized> PhysicsWorld for W {}

// ---------------------------------------------------------------------------
// Controller trait
// ---------------------------------------------------------------------------

/// Trait for body controllers.
///
/// Implement this to plug a custom controller into the simulation loop.
pub trait Controller {
    /// Buffer an input command; it takes effect at the start of the next tick.
    fn handle(&mut self, command: Command);

    /// Read body state, compute and apply one tick of output.
    fn control(&mut self, world: &mut dyn PhysicsWorld, dt: f64);

    /// Telemetry for the tick that just ran.
    fn sample(&self, time: f64) -> TickSample;

    /// Reset controller internal state (e.g., PID integrators).
    fn reset(&mut self) {}

    /// Human-readable name for logging/display.
    fn name(&self) -> &str {
        "unnamed"
    }
}

// ---------------------------------------------------------------------------
// Single body bound to a pose controller
// ---------------------------------------------------------------------------

pub struct PoseBinding {
    name: String,
    body: BodyHandle,
    controller: PoseController,
    inbox: Inbox,
}

impl PoseBinding {
    pub fn new(name: impl Into<String>, body: BodyHandle, controller: PoseController) -> Self {
        Self { name: name.into(), body, controller, inbox: Inbox::new() }
    }

    /// Writer handle for another thread; shares the binding's inbox.
    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    pub fn controller(&self) -> &PoseController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut PoseController {
        &mut self.controller
    }

    pub fn body(&self) -> BodyHandle {
        self.body
    }
}

impl Controller for PoseBinding {
    fn handle(&mut self, command: Command) {
        self.inbox.post(command);
    }

    fn control(&mut self, world: &mut dyn PhysicsWorld, dt: f64) {
        for command in self.inbox.drain() {
            match command {
                Command::SetPose(target) => self.controller.set_target(target),
                Command::ClearPose => self.controller.clear_target(),
                other => tracing::debug!(?other, name = %self.name, "pose binding ignores grasp command"),
            }
        }

        let Some(state) = world.body_state(self.body) else {
            tracing::warn!(name = %self.name, body = ?self.body, "bound body missing from world");
            return;
        };
        let output = self.controller.update(&state, dt);
        if self.controller.mode() == TrackingMode::Tracking {
            world.apply(self.body, &output);
        }
    }

    fn sample(&self, time: f64) -> TickSample {
        TickSample { time, telemetry: Telemetry::Pose(PoseSample::from_controller(&self.controller)) }
    }

    fn reset(&mut self) {
        self.inbox.drain();
        self.controller.clear_target();
    }

    fn name(&self) -> &str {
        &self.name
    }
}

// ---------------------------------------------------------------------------
// Two finger bodies bound to a gripper controller
// ---------------------------------------------------------------------------

/// Fixation progress over one grasp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fixation {
    Open,
    Fixated,
    Refused,
}

pub struct GripperBinding {
    name: String,
    left: BodyHandle,
    right: BodyHandle,
    gripper: GripperController,
    inbox: Inbox,
    fixation: Fixation,
}

impl GripperBinding {
    pub fn new(
        name: impl Into<String>,
        (left, right): (BodyHandle, BodyHandle),
        gripper: GripperController,
    ) -> Self {
        Self { name: name.into(), left, right, gripper, inbox: Inbox::new(), fixation: Fixation::Open }
    }

    pub fn inbox(&self) -> Inbox {
        self.inbox.clone()
    }

    pub fn gripper(&self) -> &GripperController {
        &self.gripper
    }

    pub fn gripper_mut(&mut self) -> &mut GripperController {
        &mut self.gripper
    }

    pub fn fingers(&self) -> (BodyHandle, BodyHandle) {
        (self.left, self.right)
    }

    /// Whether the binding holds the object welded to its fingers.
    pub fn is_fixated(&self) -> bool {
        self.fixation == Fixation::Fixated
    }

    /// With fixation configured: weld once per grasp, let go when it ends.
    fn update_fixation(&mut self, world: &mut dyn PhysicsWorld) {
        let grasping = self.gripper.is_grasping();
        match (self.fixation, grasping) {
            (Fixation::Open, true) => {
                let Some(limits) = self.gripper.config().fixation else {
                    return;
                };
                self.fixation = if world.fixate((self.left, self.right), &limits) {
                    tracing::info!(name = %self.name, "object fixated");
                    Fixation::Fixated
                } else {
                    tracing::debug!(name = %self.name, "object cannot be fixated");
                    Fixation::Refused
                };
            }
            (Fixation::Fixated, false) => {
                let velocity = world.detach();
                tracing::info!(name = %self.name, ?velocity, "object detached");
                self.fixation = Fixation::Open;
            }
            (Fixation::Refused, false) => self.fixation = Fixation::Open,
            _ => {}
        }
    }
}

impl Controller for GripperBinding {
    fn handle(&mut self, command: Command) {
        self.inbox.post(command);
    }

    fn control(&mut self, world: &mut dyn PhysicsWorld, dt: f64) {
        for command in self.inbox.drain() {
            match command {
                Command::SetPose(base) => self.gripper.set_base_pose(base),
                Command::SetGraspWidth(w) => self.gripper.set_grasp_width(w),
                Command::SetGraspInput(x) => self.gripper.set_grasp_input(x),
                Command::ClearPose => self.gripper.set_grasp_width(self.gripper.config().max_width),
            }
        }

        let (Some(left), Some(right)) = (world.body_state(self.left), world.body_state(self.right)) else {
            tracing::warn!(name = %self.name, "finger body missing from world");
            return;
        };
        let feedback = FingerFeedback {
            left,
            right,
            left_contact: world.in_contact(self.left),
            right_contact: world.in_contact(self.right),
        };
        let output = self.gripper.tick(&feedback, dt);
        world.apply(self.left, &output.left);
        world.apply(self.right, &output.right);
        self.update_fixation(world);
    }

    fn sample(&self, time: f64) -> TickSample {
        TickSample { time, telemetry: Telemetry::Gripper(GripperSample::from_controller(&self.gripper)) }
    }

    fn reset(&mut self) {
        self.inbox.drain();
        self.gripper.reset();
    }

    fn name(&self) -> &str {
        &self.name
    }
}
