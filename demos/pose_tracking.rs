use nalgebra::{UnitQuaternion, Vector3};

use physics_mc::body::BodyBuilder;
use physics_mc::control::{Controller, PoseBinding, PoseController};
use physics_mc::input::{Command, ScriptedInput};
use physics_mc::sim::{self, SimWorld};
use physics_mc::{Actuation, BodyState, PoseControllerConfig, PoseTarget, SimConfig};

/// Follow a square of waypoints with each actuation mode in turn.
fn main() {
    let config = SimConfig { dt: 0.005, max_time: 8.0, ..SimConfig::default() };
    let corners = [
        Vector3::new(0.2, 0.0, 0.0),
        Vector3::new(0.2, 0.2, 0.0),
        Vector3::new(0.0, 0.2, 0.0),
        Vector3::new(0.0, 0.0, 0.0),
    ];

    println!("  {:<14} {:>12} {:>12} {:>8}", "actuation", "final err", "max force", "events");
    println!("  {}", "─".repeat(50));

    for actuation in [Actuation::Force, Actuation::Acceleration, Actuation::Velocity, Actuation::Impulse] {
        let mut world = SimWorld::new(&config);
        let body = match world.add_body(BodyBuilder::new("hand").mass(1.0).build(), BodyState::default()) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("hand: {e}");
                return;
            }
        };
        let controller = match PoseController::new(PoseControllerConfig::preset(actuation)) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("{actuation:?}: {e}");
                continue;
            }
        };
        let mut binding = PoseBinding::new(format!("{actuation:?}"), body, controller);

        let mut input = ScriptedInput::new();
        for (i, p) in corners.iter().enumerate() {
            let yaw = UnitQuaternion::from_axis_angle(&Vector3::z_axis(), 0.5 * i as f64);
            input = input.at(2.0 * i as f64, Command::SetPose(PoseTarget::new(*p, yaw)));
        }

        let (samples, events) = sim::simulate_with(&mut world, &config, &mut binding, &mut input, &mut []);
        let max_force = samples
            .iter()
            .filter_map(|s| s.pose())
            .map(|p| p.location_output.norm())
            .fold(0.0_f64, f64::max);
        println!(
            "  {:<14} {:>12.5} {:>12.3} {:>8}",
            binding.name(),
            samples.last().map_or(0.0, |s| s.error_magnitude()),
            max_force,
            events.len()
        );
    }
}
