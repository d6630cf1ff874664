use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use nalgebra::{UnitQuaternion, Vector3};

use physics_mc::body::{presets, BodyBuilder, RigBuilder};
use physics_mc::control::{Controller, TracingObserver};
use physics_mc::input::{Command, ScriptedInput};
use physics_mc::io::{self, RunSummary};
use physics_mc::sim::{self, SimEvent};
use physics_mc::{Config, PoseTarget, Result};

/// Physics-based 6DOF pose and parallel gripper control
#[derive(Parser, Debug)]
#[command(name = "physics-mc")]
#[command(about = "Closed-loop PID pose and gripper control against a rigid-body world", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Mode,

    /// TOML controller configuration (defaults are used when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Write per-tick telemetry to this CSV file
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Write the run summary to this JSON file
    #[arg(long, global = true)]
    json: Option<PathBuf>,

    /// Simulated time in seconds (overrides the config)
    #[arg(long, global = true)]
    duration: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum Mode {
    /// Drive a 1 kg body to a target pose
    Pose {
        /// Target position x,y,z in metres
        #[arg(long, value_delimiter = ',', num_args = 3, default_values_t = [0.1, -0.05, 0.2], allow_negative_numbers = true)]
        target: Vec<f64>,

        /// Target yaw in degrees
        #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
        yaw: f64,
    },

    /// Close a parallel gripper on a block
    Grasp {
        /// Block width in metres (0 for an empty grasp)
        #[arg(long, default_value_t = 0.05)]
        object: f64,

        /// Trigger value applied at t = 0.1 s (0 open, 1 closed)
        #[arg(long, default_value_t = 1.0)]
        input: f64,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(duration) = cli.duration {
        config.sim.max_time = duration;
    }
    config.validate()?;

    let mut observer = TracingObserver;
    let (summary, samples) = match cli.command {
        Mode::Pose { target, yaw } => {
            let target = PoseTarget::new(
                Vector3::new(target[0], target[1], target[2]),
                UnitQuaternion::from_axis_angle(&Vector3::z_axis(), yaw.to_radians()),
            );
            let body = BodyBuilder::new("hand").mass(1.0).build();
            let (mut world, mut binding) = sim::pose_rig(&config, body, target)?;
            let (samples, events) = sim::simulate_with(
                &mut world,
                &config.sim,
                &mut binding,
                &mut ScriptedInput::new(),
                &mut [&mut observer],
            );
            (RunSummary::from_samples(binding.name(), &samples, &events), samples)
        }
        Mode::Grasp { object, input } => {
            let rig = if object > 0.0 {
                RigBuilder::new("Block").initial_width(config.gripper.max_width).object_width(object).build()
            } else {
                presets::open_gripper()
            };
            let (mut world, mut binding) = sim::gripper_rig(&config, &rig)?;
            let mut script = ScriptedInput::new().at(0.1, Command::SetGraspInput(input));
            let (samples, events) = sim::simulate_with(
                &mut world,
                &config.sim,
                &mut binding,
                &mut script,
                &mut [&mut observer],
            );
            print_events(&events);
            (RunSummary::from_samples(binding.name(), &samples, &events), samples)
        }
    };

    print_summary(&summary);

    if let Some(path) = &cli.csv {
        io::write_samples_file(path, &samples)?;
        tracing::info!(path = %path.display(), rows = samples.len(), "wrote telemetry");
    }
    if let Some(path) = &cli.json {
        io::write_summary_file(path, &summary)?;
        tracing::info!(path = %path.display(), "wrote summary");
    }
    Ok(())
}

fn print_events(events: &[SimEvent]) {
    if events.is_empty() {
        return;
    }
    println!();
    println!("  Events");
    println!("  ──────────────────────────────────────────────────────────────────");
    for e in events {
        let force = e.sample.gripper().map_or(0.0, |g| g.state.applied_force);
        println!("  t={:>6.3}s   {:<22} force={:>6.2} N", e.time, format!("{:?}", e.kind), force);
    }
}

fn print_summary(s: &RunSummary) {
    println!();
    println!("====================================================================");
    println!("  PHYSICS MOTION CONTROL: {}", s.controller);
    println!("====================================================================");
    println!("  Ticks:         {:>8}       Duration:     {:>8.2} s", s.ticks, s.duration_s);
    println!("  Final error:   {:>8.5}       Max error:    {:>8.5}", s.final_error, s.max_error);
    if let Some(g) = &s.grasp {
        println!(
            "  Separation:    {:>8.4} m     Grip force:   {:>8.2} N (max {:.2})",
            g.final_separation_m, g.final_force_n, g.max_force_n
        );
        println!(
            "  Grasping:      {:>8}       Holding:      {:>8}",
            g.grasping, g.holding
        );
        if let Some(t) = g.first_grasp_s {
            println!("  First grasp:   {:>8.3} s", t);
        }
    }
    println!("====================================================================");
    println!();
}
