use std::collections::VecDeque;

use nalgebra::Vector3;

use super::gripper::{GripperController, GripperState};
use super::pose::{PoseController, TrackingMode};

// ---------------------------------------------------------------------------
// Per-tick telemetry
// ---------------------------------------------------------------------------

/// Error and PID output of one pose loop, as charted by the debug view.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseSample {
    pub tracking: bool,
    pub position_error: Vector3<f64>,
    pub location_output: Vector3<f64>,
    pub rotation_error: Vector3<f64>,
    pub rotation_output: Vector3<f64>,
}

impl PoseSample {
    pub fn from_controller(c: &PoseController) -> Self {
        let out = c.last_output();
        Self {
            tracking: c.mode() == TrackingMode::Tracking,
            position_error: c.position_error(),
            location_output: out.force,
            rotation_error: c.rotation_error(),
            rotation_output: out.torque,
        }
    }

    pub fn error_magnitude(&self) -> f64 {
        (self.position_error.norm_squared() + self.rotation_error.norm_squared()).sqrt()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GripperSample {
    pub state: GripperState,
    pub grasping: bool,
    pub left: PoseSample,
    pub right: PoseSample,
}

impl GripperSample {
    pub fn from_controller(g: &GripperController) -> Self {
        let (left, right) = g.fingers();
        Self {
            state: g.state(),
            grasping: g.is_grasping(),
            left: PoseSample::from_controller(left),
            right: PoseSample::from_controller(right),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Telemetry {
    Pose(PoseSample),
    Gripper(GripperSample),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickSample {
    pub time: f64,
    pub telemetry: Telemetry,
}

impl TickSample {
    pub fn error_magnitude(&self) -> f64 {
        match &self.telemetry {
            Telemetry::Pose(p) => p.error_magnitude(),
            Telemetry::Gripper(g) => (g.state.separation - g.state.target_width).abs(),
        }
    }

    pub fn gripper(&self) -> Option<&GripperSample> {
        match &self.telemetry {
            Telemetry::Gripper(g) => Some(g),
            Telemetry::Pose(_) => None,
        }
    }

    pub fn pose(&self) -> Option<&PoseSample> {
        match &self.telemetry {
            Telemetry::Pose(p) => Some(p),
            Telemetry::Gripper(_) => None,
        }
    }

    pub fn is_grasping(&self) -> bool {
        self.gripper().is_some_and(|g| g.grasping)
    }
}

// ---------------------------------------------------------------------------
// Observers
// ---------------------------------------------------------------------------

/// Receives one sample per control tick. Control runs the same with none attached.
pub trait ControlObserver {
    fn on_tick(&mut self, sample: &TickSample);
}

/// Emits every tick at `trace` level.
pub struct TracingObserver;

impl ControlObserver for TracingObserver {
    fn on_tick(&mut self, sample: &TickSample) {
        match &sample.telemetry {
            Telemetry::Pose(p) => tracing::trace!(
                t = sample.time,
                tracking = p.tracking,
                error = p.error_magnitude(),
                force = p.location_output.norm(),
                torque = p.rotation_output.norm(),
                "pose tick"
            ),
            Telemetry::Gripper(g) => tracing::trace!(
                t = sample.time,
                separation = g.state.separation,
                target = g.state.target_width,
                force = g.state.applied_force,
                contact = g.state.contact,
                grasping = g.grasping,
                "gripper tick"
            ),
        }
    }
}

/// Keeps the samples it is shown, for charting after (or during) a run.
///
/// With a window only the most recent `window` ticks are kept.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    samples: VecDeque<TickSample>,
    window: Option<usize>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_window(window: usize) -> Self {
        Self { samples: VecDeque::with_capacity(window), window: Some(window) }
    }

    pub fn samples(&self) -> impl Iterator<Item = &TickSample> {
        self.samples.iter()
    }

    pub fn latest(&self) -> Option<&TickSample> {
        self.samples.back()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn into_samples(self) -> Vec<TickSample> {
        self.samples.into()
    }
}

impl ControlObserver for Recorder {
    fn on_tick(&mut self, sample: &TickSample) {
        if self.window == Some(0) {
            return;
        }
        if self.window.is_some_and(|w| self.samples.len() >= w) {
            self.samples.pop_front();
        }
        self.samples.push_back(*sample);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoseControllerConfig;
    use crate::dynamics::state::{BodyState, PoseTarget};

    #[test]
    fn pose_sample_mirrors_controller() {
        let mut c = PoseController::new(PoseControllerConfig::default()).unwrap();
        let idle = PoseSample::from_controller(&c);
        assert!(!idle.tracking);
        assert_eq!(idle.error_magnitude(), 0.0);

        c.tick(&PoseTarget::at(Vector3::new(0.0, 0.0, 0.3)), &BodyState::default(), 0.01);
        let s = PoseSample::from_controller(&c);
        assert!(s.tracking);
        assert!((s.error_magnitude() - 0.3).abs() < 1e-12);
        assert_eq!(s.location_output, c.last_output().force);
    }

    fn tick(time: f64, err: f64) -> TickSample {
        TickSample {
            time,
            telemetry: Telemetry::Pose(PoseSample {
                tracking: true,
                position_error: Vector3::new(err, 0.0, 0.0),
                location_output: Vector3::zeros(),
                rotation_error: Vector3::zeros(),
                rotation_output: Vector3::zeros(),
            }),
        }
    }

    #[test]
    fn recorder_keeps_every_tick_in_order() {
        let mut rec = Recorder::new();
        for k in 0..5 {
            rec.on_tick(&tick(k as f64 * 0.01, 0.1));
        }
        assert_eq!(rec.len(), 5);
        let times: Vec<f64> = rec.samples().map(|s| s.time).collect();
        assert_eq!(times, vec![0.0, 0.01, 0.02, 0.03, 0.04]);
        assert_eq!(rec.latest().map(|s| s.time), Some(0.04));
    }

    #[test]
    fn windowed_recorder_drops_oldest() {
        let mut rec = Recorder::with_window(3);
        for k in 0..10 {
            rec.on_tick(&tick(k as f64, k as f64));
        }
        let kept = rec.into_samples();
        assert_eq!(kept.len(), 3);
        assert_eq!(kept[0].time, 7.0);
        assert!((kept[2].error_magnitude() - 9.0).abs() < 1e-12);

        let mut none = Recorder::with_window(0);
        none.on_tick(&tick(0.0, 0.0));
        assert!(none.is_empty());
    }
}
