use eframe::egui;
use egui_plot::{Line, Plot, PlotPoints};

use physics_mc::body::presets;
use physics_mc::control::{Recorder, TickSample};
use physics_mc::input::{Command, ScriptedInput};
use physics_mc::sim::{self, SimEvent};
use physics_mc::{Config, GripperConfig, PidGains};

fn main() -> eframe::Result {
    let mut config = Config {
        gripper: GripperConfig { max_grip_force: 5.0, release_force: Some(2.0), ..GripperConfig::default() },
        ..Config::default()
    };
    config.gripper.finger.location = PidGains::new(10.0, 50.0, 1.0).with_output_limit(20.0);
    config.sim.max_time = 6.0;

    let rig = presets::block_grasp();
    let (samples, events) = match sim::gripper_rig(&config, &rig) {
        Ok((mut world, mut binding)) => {
            let mut input = ScriptedInput::new().at(0.0, Command::SetGraspWidth(0.0));
            let mut recorder = Recorder::new();
            let (_, events) = sim::simulate_with(&mut world, &config.sim, &mut binding, &mut input, &mut [&mut recorder]);
            (recorder.into_samples(), events)
        }
        Err(e) => {
            eprintln!("invalid gripper config: {e}");
            (Vec::new(), Vec::new())
        }
    };

    let app = GraspViz { samples, events, max_force: config.gripper.max_grip_force };
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default().with_inner_size([1200.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native("Parallel Gripper Control", options, Box::new(|_| Ok(Box::new(app))))
}

struct GraspViz {
    samples: Vec<TickSample>,
    events: Vec<SimEvent>,
    max_force: f64,
}

impl eframe::App for GraspViz {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        let step = (self.samples.len() / 2000).max(1);
        let sampled: Vec<_> = self
            .samples
            .iter()
            .step_by(step)
            .filter_map(|s| s.gripper().map(|g| (s.time, g)))
            .collect();

        egui::TopBottomPanel::top("header").show(ctx, |ui| {
            ui.heading("Parallel gripper closing on a 5 cm block");
            let last = self.samples.last().and_then(|s| s.gripper());
            ui.label(format!(
                "Separation: {:.4} m  |  Grip force: {:.2} N  |  Grasping: {}  |  Events: {}",
                last.map_or(0.0, |g| g.state.separation),
                last.map_or(0.0, |g| g.state.applied_force),
                last.is_some_and(|g| g.grasping),
                self.events.len(),
            ));
        });

        egui::CentralPanel::default().show(ctx, |ui| {
            let available = ui.available_size();
            let half_w = available.x / 2.0 - 8.0;
            let half_h = available.y / 2.0 - 8.0;

            ui.horizontal(|ui| {
                // Separation vs target
                ui.vertical(|ui| {
                    ui.label("Finger separation (m)");
                    let sep: PlotPoints = sampled.iter().map(|(t, g)| [*t, g.state.separation]).collect();
                    let target: PlotPoints = sampled.iter().map(|(t, g)| [*t, g.state.target_width]).collect();
                    Plot::new("separation")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Separation", sep));
                            plot_ui.line(Line::new("Target", target));
                        });
                });

                // Applied force vs limit
                ui.vertical(|ui| {
                    ui.label("Grip force (N)");
                    let force: PlotPoints = sampled.iter().map(|(t, g)| [*t, g.state.applied_force]).collect();
                    let limit: PlotPoints = sampled.iter().map(|(t, _)| [*t, self.max_force]).collect();
                    Plot::new("force")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("Applied", force));
                            plot_ui.line(Line::new("Limit", limit));
                        });
                });
            });

            ui.horizontal(|ui| {
                // Left finger position error
                ui.vertical(|ui| {
                    ui.label("Left finger error (m)");
                    let points: PlotPoints = sampled.iter().map(|(t, g)| [*t, g.left.position_error.norm()]).collect();
                    Plot::new("error")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("|e|", points));
                        });
                });

                // Left finger location PID output along the closing axis
                ui.vertical(|ui| {
                    ui.label("Left finger PID output (N)");
                    let points: PlotPoints = sampled.iter().map(|(t, g)| [*t, g.left.location_output.y]).collect();
                    Plot::new("output")
                        .width(half_w)
                        .height(half_h)
                        .x_axis_label("Time (s)")
                        .show(ui, |plot_ui| {
                            plot_ui.line(Line::new("F_y", points));
                        });
                });
            });
        });
    }
}
