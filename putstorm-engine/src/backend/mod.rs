//! The write capability the engine issues operations against.
//!
//! The engine only ever talks to a [`WriteBackend`] trait object. Which implementation is used is
//! decided once at configuration time through [`BackendConfig`].

use std::borrow::Cow;
use std::fmt::Debug;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{SetupError, WriteError};

mod http;
mod s3_compatible;

pub use http::{HttpBackend, HttpConfig};
pub use s3_compatible::{S3Backend, S3Config};

/// Fixed client identifier sent with every write.
pub const CLIENT_ID: &str = concat!("putstorm/", env!("CARGO_PKG_VERSION"));

/// A shared, type-erased [`WriteBackend`] instance.
pub type SharedBackend = Arc<dyn WriteBackend>;

/// A single write as built by the executor.
#[derive(Clone, Debug)]
pub struct WriteRequest {
    /// Destination path relative to the backend's endpoint.
    pub path: Arc<str>,
    pub payload: Bytes,
    /// Identifies the load generator to the backend.
    pub client_id: &'static str,
    /// Identifies this operation, equal to its sequence number.
    pub request_id: u64,
    /// Overrides the host identity, if set.
    pub host: Option<Arc<str>>,
}

/// The fully consumed result of a successful write.
#[derive(Clone, Debug)]
pub struct WriteResponse {
    pub status: u16,
    pub body: Bytes,
}

impl WriteResponse {
    /// The response body as text, for logging.
    pub fn summary(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}

#[async_trait::async_trait]
pub trait WriteBackend: Debug + Send + Sync + 'static {
    /// The backend name, used for diagnostics.
    fn name(&self) -> &'static str;

    /// Performs one write and consumes its response.
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, WriteError>;
}

/// Selects and configures a [`WriteBackend`] implementation.
#[derive(Clone, Debug)]
pub enum BackendConfig {
    /// Raw HTTP `PUT` against a base URL.
    Http(HttpConfig),
    /// `PutObject` against an S3-compatible service.
    S3(S3Config),
}

impl BackendConfig {
    /// Constructs the configured backend.
    pub fn build(self) -> Result<SharedBackend, SetupError> {
        Ok(match self {
            BackendConfig::Http(config) => Arc::new(HttpBackend::new(&config)?),
            BackendConfig::S3(config) => Arc::new(S3Backend::new(&config)?),
        })
    }
}
