//! Core data types and run configuration.
//!
//! - [`types`]: source files, entries and the records derived from them
//! - [`config`]: [`config::IndexConfig`] and the enums that select run modes

pub mod config;
pub mod types;
