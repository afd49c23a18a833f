//! Test doubles for the backend and report seams.

use std::sync::Mutex;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::Instant;

use crate::backend::{WriteBackend, WriteRequest, WriteResponse};
use crate::error::{Stage, WriteError};
use crate::metrics::Snapshot;
use crate::record::OperationRecord;
use crate::report::Report;

/// Collects everything reported in memory.
#[derive(Debug, Default)]
pub struct RecordingReport {
    records: Mutex<Vec<OperationRecord>>,
    snapshots: Mutex<Vec<Snapshot>>,
}

impl RecordingReport {
    pub fn records(&self) -> Vec<OperationRecord> {
        self.records.lock().unwrap().clone()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl Report for RecordingReport {
    fn operation(&self, record: &OperationRecord) {
        self.records.lock().unwrap().push(record.clone());
    }

    fn throughput(&self, snapshot: &Snapshot) {
        self.snapshots.lock().unwrap().push(*snapshot);
    }
}

/// What a [`ScriptedBackend`] does on every write.
#[derive(Clone, Copy, Debug)]
pub enum Behavior {
    Succeed,
    Fail(Stage),
    /// Succeeds after sleeping.
    Delay(Duration),
    /// Never completes.
    Hang,
    Panic,
}

/// A backend that records every request and then follows its [`Behavior`].
#[derive(Debug)]
pub struct ScriptedBackend {
    behavior: Behavior,
    calls: Mutex<Vec<(Instant, WriteRequest)>>,
}

impl ScriptedBackend {
    pub fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<WriteRequest> {
        let calls = self.calls.lock().unwrap();
        calls.iter().map(|(_, request)| request.clone()).collect()
    }

    /// The instants at which writes were started, in call order.
    pub fn call_times(&self) -> Vec<Instant> {
        let calls = self.calls.lock().unwrap();
        calls.iter().map(|(at, _)| *at).collect()
    }
}

#[async_trait::async_trait]
impl WriteBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, WriteError> {
        self.calls.lock().unwrap().push((Instant::now(), request));

        let ok = WriteResponse {
            status: 200,
            body: Bytes::from_static(b"ok"),
        };
        match self.behavior {
            Behavior::Succeed => Ok(ok),
            Behavior::Fail(Stage::Build) => Err(WriteError::build("scripted failure")),
            Behavior::Fail(Stage::Send) => Err(WriteError::send("scripted failure")),
            Behavior::Fail(Stage::ReadResponse) => {
                Err(WriteError::read_response("scripted failure"))
            }
            Behavior::Delay(delay) => {
                tokio::time::sleep(delay).await;
                Ok(ok)
            }
            Behavior::Hang => std::future::pending().await,
            Behavior::Panic => panic!("scripted panic"),
        }
    }
}
