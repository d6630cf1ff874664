use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::control::observer::TickSample;
use crate::error::Result;
use crate::sim::event::{EventKind, SimEvent};

/// Summary statistics computed from a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub controller: String,
    pub ticks: usize,
    pub duration_s: f64,
    pub final_error: f64,
    pub max_error: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grasp: Option<GraspSummary>,
    pub events: Vec<EventRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraspSummary {
    pub final_separation_m: f64,
    pub final_force_n: f64,
    pub max_force_n: f64,
    pub grasping: bool,
    pub holding: bool,
    pub first_grasp_s: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub time_s: f64,
    pub event: String,
}

impl RunSummary {
    /// Compute summary from tick samples and detected events.
    pub fn from_samples(controller: &str, samples: &[TickSample], events: &[SimEvent]) -> Self {
        let max_error = samples
            .iter()
            .map(|s| s.error_magnitude())
            .fold(0.0_f64, f64::max);

        let grippers: Vec<_> = samples.iter().filter_map(|s| s.gripper().map(|g| (s.time, g))).collect();
        let grasp = grippers.last().map(|(_, last)| GraspSummary {
            final_separation_m: last.state.separation,
            final_force_n: last.state.applied_force,
            max_force_n: grippers.iter().map(|(_, g)| g.state.applied_force).fold(0.0_f64, f64::max),
            grasping: last.grasping,
            holding: last.state.holding,
            first_grasp_s: grippers.iter().find(|(_, g)| g.grasping).map(|(t, _)| *t),
        });

        RunSummary {
            controller: controller.to_string(),
            ticks: samples.len(),
            duration_s: samples.last().map_or(0.0, |s| s.time),
            final_error: samples.last().map_or(0.0, |s| s.error_magnitude()),
            max_error,
            grasp,
            events: events
                .iter()
                .map(|e| EventRecord { time_s: e.time, event: event_name(&e.kind) })
                .collect(),
        }
    }
}

fn event_name(kind: &EventKind) -> String {
    match kind {
        EventKind::GraspAcquired => "grasp_acquired".into(),
        EventKind::GraspReleased => "grasp_released".into(),
        EventKind::ForceLimitReached => "force_limit_reached".into(),
        EventKind::ForceLimitReleased => "force_limit_released".into(),
        EventKind::TargetReached => "target_reached".into(),
        EventKind::Custom(s) => s.clone(),
    }
}

/// Write run summary as pretty JSON to a writer.
pub fn write_summary<W: Write>(writer: &mut W, summary: &RunSummary) -> Result<()> {
    serde_json::to_writer_pretty(&mut *writer, summary)?;
    writeln!(writer)?;
    Ok(())
}

/// Write run summary JSON to a file.
pub fn write_summary_file(path: impl AsRef<Path>, summary: &RunSummary) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_summary(&mut file, summary)
}
