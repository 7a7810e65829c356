//! Database access for the importer

pub mod categories;
pub mod exercises;
pub mod report;

pub use report::{coverage_report, CoverageReport, SampleExercise};
