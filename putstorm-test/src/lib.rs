//! Test utilities for putstorm.
//!
//! This crate provides an in-process storage endpoint and a logger for integration tests. See the
//! modules for all available utilities.

pub mod server;
pub mod tracing;
