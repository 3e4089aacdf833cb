//! `fleet-output`: coordinator output writers for the fleet_dt framework.
//!
//! | Backend | Files created                             |
//! |---------|-------------------------------------------|
//! | CSV     | `allocations.csv`, `completions.csv`      |
//!
//! Backends implement [`OutputWriter`] and are driven by [`OutputObserver`],
//! which implements `fleet_coord::CoordinatorObserver`.
//!
//! # Usage
//!
//! ```rust,ignore
//! use fleet_output::{CsvWriter, OutputObserver};
//!
//! let writer = CsvWriter::new(Path::new("./output"))?;
//! let coordinator = CoordinatorBuilder::new(config, directory)
//!     .observer(OutputObserver::new(writer))
//!     .build(mailbox)?;
//! let mut obs = coordinator.run(shutdown).await.into_observer();
//! obs.finish();
//! obs.take_error().map(|e| eprintln!("output error: {e}"));
//! ```

pub mod csv;
pub mod error;
pub mod observer;
pub mod row;
pub mod writer;

#[cfg(test)]
mod tests;

pub use csv::CsvWriter;
pub use error::{OutputError, OutputResult};
pub use observer::OutputObserver;
pub use row::{AllocationOutcome, AllocationRow, CompletionRow};
pub use writer::OutputWriter;
