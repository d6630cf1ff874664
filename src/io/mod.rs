pub mod csv;
pub mod json;

pub use csv::{write_samples, write_samples_file};
pub use json::{write_summary, write_summary_file, RunSummary};
