//! # FitTrack Common Library
//!
//! Shared code for the FitTrack reference-data tooling:
//! - Error type shared by every crate
//! - Configuration loading and root folder resolution
//! - Database initialization and declarative schema synchronization

pub mod config;
pub mod db;
pub mod error;

pub use error::{Error, Result};
