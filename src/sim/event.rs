use crate::control::observer::TickSample;

// ---------------------------------------------------------------------------
// Simulation events
// ---------------------------------------------------------------------------

/// Kinds of simulation events.
#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    GraspAcquired,
    GraspReleased,
    ForceLimitReached,
    ForceLimitReleased,
    TargetReached,
    Custom(String),
}

/// A discrete event that occurred during simulation.
#[derive(Debug, Clone)]
pub struct SimEvent {
    pub time: f64,
    pub kind: EventKind,
    pub sample: TickSample,
}

/// Trait for passive event detectors.
/// Implementations inspect consecutive tick samples and report events.
pub trait EventDetector {
    fn check(&mut self, prev: &TickSample, current: &TickSample) -> Option<EventKind>;
}

/// Detects `is_grasping` edges.
pub struct GraspDetector;

impl EventDetector for GraspDetector {
    fn check(&mut self, prev: &TickSample, current: &TickSample) -> Option<EventKind> {
        match (prev.is_grasping(), current.is_grasping()) {
            (false, true) => Some(EventKind::GraspAcquired),
            (true, false) => Some(EventKind::GraspReleased),
            _ => None,
        }
    }
}

/// Detects the gripper freezing or releasing its width on the force limit.
pub struct ForceLimitDetector;

impl EventDetector for ForceLimitDetector {
    fn check(&mut self, prev: &TickSample, current: &TickSample) -> Option<EventKind> {
        let holding = |s: &TickSample| s.gripper().is_some_and(|g| g.state.holding);
        match (holding(prev), holding(current)) {
            (false, true) => Some(EventKind::ForceLimitReached),
            (true, false) => Some(EventKind::ForceLimitReleased),
            _ => None,
        }
    }
}

/// Fires once when the tracking error first drops inside a tolerance.
pub struct SettleDetector {
    pub tolerance: f64,
    fired: bool,
}

impl SettleDetector {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance, fired: false }
    }
}

impl EventDetector for SettleDetector {
    fn check(&mut self, prev: &TickSample, current: &TickSample) -> Option<EventKind> {
        if self.fired {
            return None;
        }
        let tracking = current.pose().map_or(true, |p| p.tracking);
        if tracking
            && prev.error_magnitude() > self.tolerance
            && current.error_magnitude() <= self.tolerance
        {
            self.fired = true;
            Some(EventKind::TargetReached)
        } else {
            None
        }
    }
}

/// Detectors the runner installs by default.
pub fn default_detectors() -> Vec<Box<dyn EventDetector>> {
    vec![
        Box::new(GraspDetector),
        Box::new(ForceLimitDetector),
        Box::new(SettleDetector::new(1e-3)),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::gripper::GripperState;
    use crate::control::observer::{GripperSample, PoseSample, Telemetry};
    use nalgebra::Vector3;

    fn pose(err: f64) -> PoseSample {
        PoseSample {
            tracking: true,
            position_error: Vector3::new(err, 0.0, 0.0),
            location_output: Vector3::zeros(),
            rotation_error: Vector3::zeros(),
            rotation_output: Vector3::zeros(),
        }
    }

    fn gripper(grasping: bool, holding: bool) -> TickSample {
        TickSample {
            time: 0.0,
            telemetry: Telemetry::Gripper(GripperSample {
                state: GripperState { holding, contact: grasping, ..GripperState::default() },
                grasping,
                left: pose(0.0),
                right: pose(0.0),
            }),
        }
    }

    #[test]
    fn grasp_edges_detected() {
        let mut det = GraspDetector;
        let open = gripper(false, false);
        let closed = gripper(true, false);
        assert_eq!(det.check(&open, &closed), Some(EventKind::GraspAcquired));
        assert_eq!(det.check(&closed, &closed), None);
        assert_eq!(det.check(&closed, &open), Some(EventKind::GraspReleased));
    }

    #[test]
    fn force_limit_edges_detected() {
        let mut det = ForceLimitDetector;
        assert_eq!(
            det.check(&gripper(true, false), &gripper(true, true)),
            Some(EventKind::ForceLimitReached)
        );
    }

    #[test]
    fn settle_fires_once() {
        let mut det = SettleDetector::new(0.01);
        let far = TickSample { time: 0.0, telemetry: Telemetry::Pose(pose(0.5)) };
        let near = TickSample { time: 0.1, telemetry: Telemetry::Pose(pose(0.001)) };
        assert_eq!(det.check(&far, &near), Some(EventKind::TargetReached));
        // Should not fire again
        assert!(det.check(&far, &near).is_none());
    }
}
