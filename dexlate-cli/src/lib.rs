//! CLI library for testing purposes

pub mod config;
pub mod summary;

pub use config::{ApplyOverrides, RunConfig};
pub use dexlate::{BatchOptions, BatchReport};
