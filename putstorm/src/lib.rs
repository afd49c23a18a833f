//! Command line frontend of the putstorm load generator.
//!
//! Loads layered [configuration](config), sets up logging and runs a
//! [`LoadGenerator`](putstorm_engine::LoadGenerator) until it completes or the process is
//! interrupted.
#![warn(missing_debug_implementations)]

pub mod cli;
pub mod config;
pub mod observability;
