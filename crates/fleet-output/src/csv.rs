//! CSV output backend.
//!
//! Creates two files in the configured output directory:
//! - `allocations.csv`
//! - `completions.csv`

use std::fs::File;
use std::path::Path;

use csv::Writer;

use crate::writer::OutputWriter;
use crate::{AllocationRow, CompletionRow, OutputResult};

pub const ALLOCATIONS_FILE: &str = "allocations.csv";
pub const COMPLETIONS_FILE: &str = "completions.csv";

/// Writes coordinator output to two CSV files.
pub struct CsvWriter {
    allocations: Writer<File>,
    completions: Writer<File>,
    finished:    bool,
}

impl CsvWriter {
    /// Create `dir` if needed, open the two CSV files and write the header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        std::fs::create_dir_all(dir)?;

        let mut allocations = Writer::from_path(dir.join(ALLOCATIONS_FILE))?;
        allocations.write_record([
            "task_id",
            "destination",
            "outcome",
            "vehicle_id",
            "estimated_time",
            "distance",
            "respondents",
            "unix_time_ms",
        ])?;

        let mut completions = Writer::from_path(dir.join(COMPLETIONS_FILE))?;
        completions.write_record([
            "task_id",
            "vehicle_id",
            "final_node",
            "success",
            "estimated_time",
            "actual_time",
            "unix_time_ms",
        ])?;

        Ok(Self { allocations, completions, finished: false })
    }
}

impl OutputWriter for CsvWriter {
    fn write_allocation(&mut self, row: &AllocationRow) -> OutputResult<()> {
        self.allocations.write_record(&[
            row.task_id.clone(),
            row.destination.clone(),
            row.outcome.as_str().to_owned(),
            row.vehicle_id.map(|v| v.to_string()).unwrap_or_default(),
            format!("{:.3}", row.estimated_time),
            format!("{:.3}", row.distance),
            row.respondents.to_string(),
            row.unix_time_ms.to_string(),
        ])?;
        Ok(())
    }

    fn write_completion(&mut self, row: &CompletionRow) -> OutputResult<()> {
        self.completions.write_record(&[
            row.task_id.clone(),
            row.vehicle_id.to_string(),
            row.final_node.clone(),
            (row.success as u8).to_string(),
            format!("{:.3}", row.estimated_time),
            format!("{:.3}", row.actual_time),
            row.unix_time_ms.to_string(),
        ])?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.allocations.flush()?;
        self.completions.flush()?;
        Ok(())
    }
}
