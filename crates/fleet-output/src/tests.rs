//! Integration tests for fleet-output.

#[cfg(test)]
mod csv_tests {
    use tempfile::TempDir;

    use crate::csv::{CsvWriter, ALLOCATIONS_FILE, COMPLETIONS_FILE};
    use crate::row::{AllocationOutcome, AllocationRow, CompletionRow};
    use crate::writer::OutputWriter;

    fn tmp() -> TempDir {
        tempfile::tempdir().expect("create temp dir")
    }

    fn headers(path: &std::path::Path) -> Vec<String> {
        let mut rdr = csv::Reader::from_path(path).unwrap();
        rdr.headers().unwrap().iter().map(str::to_owned).collect()
    }

    #[test]
    fn csv_files_created() {
        let dir = tmp();
        let _w = CsvWriter::new(dir.path()).unwrap();
        assert!(dir.path().join(ALLOCATIONS_FILE).exists());
        assert!(dir.path().join(COMPLETIONS_FILE).exists());
    }

    #[test]
    fn csv_creates_missing_directory() {
        let dir = tmp();
        let nested = dir.path().join("run").join("out");
        let _w = CsvWriter::new(&nested).unwrap();
        assert!(nested.join(ALLOCATIONS_FILE).exists());
    }

    #[test]
    fn csv_headers_correct() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        assert_eq!(headers(&dir.path().join(ALLOCATIONS_FILE)), [
            "task_id",
            "destination",
            "outcome",
            "vehicle_id",
            "estimated_time",
            "distance",
            "respondents",
            "unix_time_ms"
        ]);
        assert_eq!(headers(&dir.path().join(COMPLETIONS_FILE)), [
            "task_id",
            "vehicle_id",
            "final_node",
            "success",
            "estimated_time",
            "actual_time",
            "unix_time_ms"
        ]);
    }

    #[test]
    fn allocation_rows_written() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_allocation(&AllocationRow {
            task_id:        "t1".into(),
            destination:    "Node4".into(),
            outcome:        AllocationOutcome::Assigned,
            vehicle_id:     Some(2),
            estimated_time: 5.0,
            distance:       150.0,
            respondents:    3,
            unix_time_ms:   1_000,
        })
        .unwrap();
        w.write_allocation(&AllocationRow {
            task_id:        "t2".into(),
            destination:    "Node9".into(),
            outcome:        AllocationOutcome::NoVehicle,
            vehicle_id:     None,
            estimated_time: 0.0,
            distance:       0.0,
            respondents:    3,
            unix_time_ms:   2_000,
        })
        .unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join(ALLOCATIONS_FILE)).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(&rows[0][2], "assigned");
        assert_eq!(&rows[0][3], "2");
        assert_eq!(&rows[0][4], "5.000");
        assert_eq!(&rows[1][2], "no_vehicle");
        assert_eq!(&rows[1][3], ""); // no winner
    }

    #[test]
    fn completion_rows_written() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.write_completion(&CompletionRow {
            task_id:        "t1".into(),
            vehicle_id:     2,
            final_node:     "Node4".into(),
            success:        true,
            estimated_time: 5.0,
            actual_time:    6.25,
            unix_time_ms:   9_000,
        })
        .unwrap();
        w.finish().unwrap();

        let mut rdr = csv::Reader::from_path(dir.path().join(COMPLETIONS_FILE)).unwrap();
        let rows: Vec<_> = rdr.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][2], "Node4");
        assert_eq!(&rows[0][3], "1");
        assert_eq!(&rows[0][5], "6.250");
    }

    #[test]
    fn csv_finish_idempotent() {
        let dir = tmp();
        let mut w = CsvWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }
}

#[cfg(test)]
mod observer_tests {
    use std::io;

    use fleet_coord::{ActiveAssignment, CoordinatorObserver, Task};
    use fleet_core::VehicleId;
    use fleet_protocol::{Completion, Estimate};

    use crate::row::{AllocationOutcome, AllocationRow, CompletionRow};
    use crate::writer::OutputWriter;
    use crate::{OutputError, OutputObserver, OutputResult};

    /// Keeps rows in memory; fails every write after `fail_after` rows.
    #[derive(Default)]
    struct MemWriter {
        allocations: Vec<AllocationRow>,
        completions: Vec<CompletionRow>,
        finished:    usize,
        fail_after:  Option<usize>,
    }

    impl MemWriter {
        fn check(&self) -> OutputResult<()> {
            let written = self.allocations.len() + self.completions.len();
            match self.fail_after {
                Some(n) if written >= n => {
                    Err(OutputError::Io(io::Error::other(format!("disk full after {written} rows"))))
                }
                _ => Ok(()),
            }
        }
    }

    impl OutputWriter for MemWriter {
        fn write_allocation(&mut self, row: &AllocationRow) -> OutputResult<()> {
            self.check()?;
            self.allocations.push(row.clone());
            Ok(())
        }

        fn write_completion(&mut self, row: &CompletionRow) -> OutputResult<()> {
            self.check()?;
            self.completions.push(row.clone());
            Ok(())
        }

        fn finish(&mut self) -> OutputResult<()> {
            self.finished += 1;
            Ok(())
        }
    }

    fn estimate(eta: f64) -> Estimate {
        Estimate { estimated_time: eta, planned_path: vec!["A".into()], distance: eta, carbon: 0.0, cost: 0.0 }
    }

    fn assignment(task: &Task, vehicle: u32) -> ActiveAssignment {
        ActiveAssignment {
            task:           task.clone(),
            vehicle:        VehicleId(vehicle),
            estimated_time: 4.0,
            started_at:     fleet_core::now_millis(),
            accepted:       Some(true),
        }
    }

    #[test]
    fn rounds_and_completions_become_rows() {
        let mut obs = OutputObserver::new(MemWriter::default());
        let t1 = Task::new("Node2");
        let t2 = Task::new("Node3");
        obs.on_allocation(&t1, VehicleId(2), &estimate(4.0), &[VehicleId(1)]);
        obs.on_no_vehicle(&t2, 2);
        obs.on_completion(&assignment(&t1, 2), &Completion {
            task_id:    t1.id.clone(),
            vehicle_id: VehicleId(2),
            final_node: "Node2".into(),
            success:    true,
        });
        obs.on_drained(2, 1);
        assert!(obs.take_error().is_none());

        let w = obs.into_writer();
        assert_eq!(w.allocations.len(), 2);
        assert_eq!(w.allocations[0].vehicle_id, Some(2));
        assert_eq!(w.allocations[0].respondents, 2);
        assert_eq!(w.allocations[1].outcome, AllocationOutcome::NoVehicle);
        assert_eq!(w.completions.len(), 1);
        assert_eq!(w.completions[0].task_id, t1.id.as_str());
        assert_eq!(w.completions[0].estimated_time, 4.0);
        assert!(w.completions[0].actual_time >= 0.0);
        assert_eq!(w.finished, 1);
    }

    #[test]
    fn only_first_error_is_kept() {
        let mut obs = OutputObserver::new(MemWriter { fail_after: Some(1), ..MemWriter::default() });
        let task = Task::new("Node2");
        obs.on_allocation(&task, VehicleId(1), &estimate(1.0), &[]);
        obs.on_no_vehicle(&Task::new("Node3"), 0);
        obs.on_no_vehicle(&Task::new("Node4"), 0);

        let err = obs.take_error().expect("write error stored");
        assert!(err.to_string().contains("after 1 rows"));
        assert!(obs.take_error().is_none());
    }
}
