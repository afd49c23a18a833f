//! Rate-paced, open-loop write load generation.
//!
//! A [`LoadGenerator`] issues writes of one shared random [`Payload`] against a [`WriteBackend`]
//! at a fixed rate. Issuance is paced by a [`RateScheduler`](scheduler::RateScheduler) and never
//! waits for earlier writes to complete, so a slow backend accumulates in-flight operations
//! instead of throttling the offered load.
//!
//! Every issued operation produces exactly one [`OperationRecord`], and the throughput of
//! successful writes is reported periodically through a [`Report`].
#![warn(missing_debug_implementations)]

pub mod backend;
pub mod dispatcher;
pub mod error;
pub mod executor;
pub mod generator;
pub mod metrics;
pub mod payload;
pub mod record;
pub mod report;
pub mod scheduler;
pub mod spec;

#[cfg(test)]
mod testing;

pub use crate::backend::{BackendConfig, SharedBackend, WriteBackend};
pub use crate::generator::{LoadGenerator, RunSummary};
pub use crate::payload::Payload;
pub use crate::record::{OperationRecord, Outcome};
pub use crate::report::Report;
pub use crate::spec::LoadSpec;
