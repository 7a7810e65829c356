//! fittrack-import library interface
//!
//! Exercise reference data importer: category resolution, record
//! normalization, batched upserts and the workflows built on them.

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod workflow;

pub use crate::error::{BatchFlushError, ImportError, ImportResult};
