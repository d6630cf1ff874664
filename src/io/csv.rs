use std::io::{self, Write};
use std::path::Path;

use crate::control::observer::{PoseSample, Telemetry, TickSample};

/// Write per-tick telemetry to CSV format.
///
/// Columns: time, kind, error, pos_err_x..z, loc_out_x..z, rot_err_x..z,
///          rot_out_x..z, separation, target_width, applied_force, contact,
///          grasping
///
/// Gripper rows report the left finger in the pose columns; pose rows leave
/// the gripper columns empty.
pub fn write_samples<W: Write>(writer: &mut W, samples: &[TickSample]) -> io::Result<()> {
    writeln!(
        writer,
        "time,kind,error,\
         pos_err_x,pos_err_y,pos_err_z,loc_out_x,loc_out_y,loc_out_z,\
         rot_err_x,rot_err_y,rot_err_z,rot_out_x,rot_out_y,rot_out_z,\
         separation,target_width,applied_force,contact,grasping"
    )?;

    for s in samples {
        let (kind, pose, gripper) = match &s.telemetry {
            Telemetry::Pose(p) => ("pose", p, String::from(",,,,")),
            Telemetry::Gripper(g) => (
                "gripper",
                &g.left,
                format!(
                    "{:.6},{:.6},{:.4},{},{}",
                    g.state.separation,
                    g.state.target_width,
                    g.state.applied_force,
                    u8::from(g.state.contact),
                    u8::from(g.grasping),
                ),
            ),
        };
        writeln!(writer, "{:.4},{},{:.6},{},{}", s.time, kind, s.error_magnitude(), pose_columns(pose), gripper)?;
    }

    Ok(())
}

fn pose_columns(p: &PoseSample) -> String {
    [p.position_error, p.location_output, p.rotation_error, p.rotation_output]
        .iter()
        .flat_map(|v| v.iter().map(|c| format!("{c:.6}")))
        .collect::<Vec<_>>()
        .join(",")
}

/// Write telemetry to a CSV file at the given path.
pub fn write_samples_file(path: impl AsRef<Path>, samples: &[TickSample]) -> io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_samples(&mut file, samples)
}
