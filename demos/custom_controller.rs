use nalgebra::Vector3;

use physics_mc::body::BodyBuilder;
use physics_mc::control::observer::{PoseSample, Telemetry};
use physics_mc::control::{BodyHandle, Controller, PhysicsWorld, TickSample};
use physics_mc::input::Command;
use physics_mc::sim::{self, SimWorld};
use physics_mc::{Actuation, BodyState, ControlOutput, SimConfig};

/// A bang-bang controller: full acceleration toward the target, full
/// braking once inside the stopping distance.
struct BangBangController {
    body: BodyHandle,
    target: Option<Vector3<f64>>,
    accel: f64,
    last: PoseSample,
}

impl Controller for BangBangController {
    fn handle(&mut self, command: Command) {
        match command {
            Command::SetPose(t) => self.target = Some(t.position),
            Command::ClearPose => self.target = None,
            _ => {}
        }
    }

    fn control(&mut self, world: &mut dyn PhysicsWorld, _dt: f64) {
        let (Some(target), Some(state)) = (self.target, world.body_state(self.body)) else {
            return;
        };
        let error = target - state.position;
        let v = state.linear_velocity;
        let stopping = v.norm_squared() / (2.0 * self.accel);
        let dir = if error.norm() > stopping && error.norm() > 1e-4 {
            error.normalize()
        } else if v.norm() > 1e-6 {
            -v.normalize()
        } else {
            Vector3::zeros()
        };
        let out = ControlOutput { actuation: Actuation::Acceleration, force: dir * self.accel, torque: Vector3::zeros() };
        world.apply(self.body, &out);
        self.last = PoseSample {
            tracking: true,
            position_error: error,
            location_output: out.force,
            rotation_error: Vector3::zeros(),
            rotation_output: Vector3::zeros(),
        };
    }

    fn sample(&self, time: f64) -> TickSample {
        TickSample { time, telemetry: Telemetry::Pose(self.last) }
    }

    fn name(&self) -> &str {
        "BangBang"
    }
}

fn main() {
    let config = SimConfig { dt: 0.005, max_time: 3.0, ..SimConfig::default() };
    let mut world = SimWorld::new(&config);
    let body = match world.add_body(BodyBuilder::new("puck").mass(0.5).build(), BodyState::default()) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("puck: {e}");
            return;
        }
    };

    let mut controller = BangBangController {
        body,
        target: None,
        accel: 2.0,
        last: PoseSample {
            tracking: false,
            position_error: Vector3::zeros(),
            location_output: Vector3::zeros(),
            rotation_error: Vector3::zeros(),
            rotation_output: Vector3::zeros(),
        },
    };
    controller.handle(Command::SetPose(physics_mc::PoseTarget::at(Vector3::new(0.5, 0.2, 0.0))));

    println!("Simulating with {} controller...", controller.name());
    let (samples, _) = sim::simulate(&mut world, &config, &mut controller);

    let final_pos = world.state(body).map_or(Vector3::zeros(), |s| s.position);
    let max_err = samples.iter().map(|s| s.error_magnitude()).fold(0.0_f64, f64::max);
    println!("Final position: [{:.3}, {:.3}, {:.3}] m", final_pos.x, final_pos.y, final_pos.z);
    println!("Final error: {:.4} m (started at {:.3} m)", samples.last().map_or(0.0, |s| s.error_magnitude()), max_err);
    println!("Ticks: {}", samples.len());
}
