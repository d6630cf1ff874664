//! Target updates coming from outside the physics tick.
//!
//! Inputs (tracked hands, a UI, a script) may arrive at any rate. They are
//! posted into an [`Inbox`] and the owning controller drains it at the start
//! of its next tick. Each slot keeps only the most recent value.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::dynamics::state::PoseTarget;

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// New pose target (for a gripper: the base pose).
    SetPose(PoseTarget),
    /// Drop the target and go idle.
    ClearPose,
    /// Symmetric finger separation in metres.
    SetGraspWidth(f64),
    /// Trigger value in `[0, 1]`, 0 open and 1 closed.
    SetGraspInput(f64),
}

// ---------------------------------------------------------------------------
// Last-write-wins slot
// ---------------------------------------------------------------------------

/// Single-value slot shared between a writer and the tick thread.
pub struct Mailbox<T> {
    slot: Arc<ArcSwapOption<T>>,
}

impl<T> Mailbox<T> {
    pub fn new() -> Self {
        Self { slot: Arc::new(ArcSwapOption::empty()) }
    }

    /// Overwrite whatever is waiting.
    pub fn post(&self, value: T) {
        self.slot.store(Some(Arc::new(value)));
    }

    pub fn take(&self) -> Option<Arc<T>> {
        self.slot.swap(None)
    }

    pub fn is_empty(&self) -> bool {
        self.slot.load().is_none()
    }
}

impl<T> Clone for Mailbox<T> {
    fn clone(&self) -> Self {
        Self { slot: Arc::clone(&self.slot) }
    }
}

impl<T> Default for Mailbox<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Per-controller inbox
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
enum PoseRequest {
    Track(PoseTarget),
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum GraspRequest {
    Width(f64),
    Input(f64),
}

/// Pose and grasp requests buffered separately so a width update never
/// overwrites a pending pose update.
#[derive(Clone, Default)]
pub struct Inbox {
    pose: Mailbox<PoseRequest>,
    grasp: Mailbox<GraspRequest>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn post(&self, command: Command) {
        match command {
            Command::SetPose(target) => self.pose.post(PoseRequest::Track(target)),
            Command::ClearPose => self.pose.post(PoseRequest::Clear),
            Command::SetGraspWidth(w) => self.grasp.post(GraspRequest::Width(w)),
            Command::SetGraspInput(x) => self.grasp.post(GraspRequest::Input(x)),
        }
    }

    /// Latest pending command per slot, pose first.
    pub fn drain(&self) -> Vec<Command> {
        let mut out = Vec::with_capacity(2);
        if let Some(req) = self.pose.take() {
            out.push(match *req {
                PoseRequest::Track(target) => Command::SetPose(target),
                PoseRequest::Clear => Command::ClearPose,
            });
        }
        if let Some(req) = self.grasp.take() {
            out.push(match *req {
                GraspRequest::Width(w) => Command::SetGraspWidth(w),
                GraspRequest::Input(x) => Command::SetGraspInput(x),
            });
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.pose.is_empty() && self.grasp.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Input adapters
// ---------------------------------------------------------------------------

/// Anything that produces commands as simulated time advances.
pub trait InputAdapter {
    fn poll(&mut self, time: f64) -> Vec<Command>;
}

/// Produces nothing; controllers keep whatever target they were given.
pub struct NoInput;

impl InputAdapter for NoInput {
    fn poll(&mut self, _time: f64) -> Vec<Command> {
        Vec::new()
    }
}

/// Commands released at fixed simulation times.
#[derive(Debug, Clone, Default)]
pub struct ScriptedInput {
    keyframes: Vec<(f64, Command)>,
    next: usize,
}

impl ScriptedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(mut self, time: f64, command: Command) -> Self {
        let idx = self.keyframes.partition_point(|(t, _)| *t <= time);
        self.keyframes.insert(idx, (time, command));
        self
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }
}

impl InputAdapter for ScriptedInput {
    fn poll(&mut self, time: f64) -> Vec<Command> {
        let start = self.next;
        while self.next < self.keyframes.len() && self.keyframes[self.next].0 <= time {
            self.next += 1;
        }
        self.keyframes[start..self.next].iter().map(|(_, c)| *c).collect()
    }
}
