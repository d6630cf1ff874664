use crate::control::controller::Controller;
use crate::control::observer::{ControlObserver, TickSample};
use crate::dynamics::state::SimConfig;
use crate::input::{InputAdapter, NoInput};
use super::event::{default_detectors, SimEvent};
use super::world::SimWorld;

// ---------------------------------------------------------------------------
// Fixed-timestep closed loop
// ---------------------------------------------------------------------------

/// Run `controller` against `world` for `config.max_time`.
///
/// Each tick: poll the input adapter, let the controller read state and
/// apply its output, advance the world one step, then report the tick to the
/// observers and event detectors. Returns one sample per tick and the
/// detected events.
pub fn simulate_with(
    world: &mut SimWorld,
    config: &SimConfig,
    controller: &mut dyn Controller,
    input: &mut dyn InputAdapter,
    observers: &mut [&mut dyn ControlObserver],
) -> (Vec<TickSample>, Vec<SimEvent>) {
    let steps = config.steps();
    let mut samples: Vec<TickSample> = Vec::with_capacity(steps.min(200_000));
    let mut events = Vec::new();
    let mut detectors = default_detectors();

    tracing::debug!(controller = controller.name(), steps, dt = config.dt, "starting run");

    for _ in 0..steps {
        let time = world.time();
        for command in input.poll(time) {
            controller.handle(command);
        }

        controller.control(world, config.dt);
        world.step(config.dt);

        let sample = controller.sample(time);
        for observer in observers.iter_mut() {
            observer.on_tick(&sample);
        }
        if let Some(prev) = samples.last() {
            for detector in detectors.iter_mut() {
                if let Some(kind) = detector.check(prev, &sample) {
                    tracing::info!(t = time, ?kind, "event");
                    events.push(SimEvent { time, kind, sample });
                }
            }
        }
        samples.push(sample);
    }

    (samples, events)
}

/// Run with no input and no observers (convenience wrapper).
pub fn simulate(
    world: &mut SimWorld,
    config: &SimConfig,
    controller: &mut dyn Controller,
) -> (Vec<TickSample>, Vec<SimEvent>) {
    simulate_with(world, config, controller, &mut NoInput, &mut [])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
