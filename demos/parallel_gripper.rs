use nalgebra::Vector3;

use physics_mc::body::presets;
use physics_mc::control::{Controller, TracingObserver};
use physics_mc::input::{Command, ScriptedInput};
use physics_mc::sim;
use physics_mc::{Config, FixationConfig, GripperConfig, PidGains, PoseTarget};

/// Squeeze a block, lift it, then let go.
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = Config {
        gripper: GripperConfig {
            max_grip_force: 5.0,
            release_force: Some(2.0),
            fixation: Some(FixationConfig::default()),
            ..GripperConfig::default()
        },
        ..Config::default()
    };
    config.gripper.finger.location = PidGains::new(10.0, 50.0, 1.0).with_output_limit(20.0);
    config.sim.max_time = 9.0;

    let rig = presets::block_grasp();
    let (mut world, mut binding) = match sim::gripper_rig(&config, &rig) {
        Ok(pair) => pair,
        Err(e) => {
            eprintln!("bad gripper config: {e}");
            return;
        }
    };

    // Trigger pulled fully at t=0.5 s, base raised 5 cm at t=3 s, released at t=6 s
    let lifted = PoseTarget::new(rig.base.position + Vector3::z() * 0.05, rig.base.orientation);
    let mut input = ScriptedInput::new()
        .at(0.5, Command::SetGraspInput(1.0))
        .at(3.0, Command::SetPose(lifted))
        .at(6.0, Command::SetGraspInput(0.0));
    let (samples, events) = sim::simulate_with(
        &mut world,
        &config.sim,
        &mut binding,
        &mut input,
        &mut [&mut TracingObserver],
    );

    println!("Simulating {} gripper...", binding.name());
    for e in &events {
        let g = e.sample.gripper();
        println!(
            "  t={:>6.3}s  {:<20}  separation={:.4} m  force={:.2} N",
            e.time,
            format!("{:?}", e.kind),
            g.map_or(0.0, |g| g.state.separation),
            g.map_or(0.0, |g| g.state.applied_force),
        );
    }
    if let Some(last) = samples.last().and_then(|s| s.gripper()) {
        println!("Final separation: {:.4} m, grasping: {}", last.state.separation, last.grasping);
    }
    if let Some(object) = world.grasp_object() {
        println!("Block left at z={:.4} m", object.center.z);
    }
}
