//! Data models

pub mod exercise;

pub use exercise::{ExerciseDetail, ExerciseRecord, ExerciseRow, ResolvedCategory};
