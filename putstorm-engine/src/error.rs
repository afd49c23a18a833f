//! Error types for the load generation engine.

use std::fmt;

use thiserror::Error;

/// A type-erased error cause.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The stage of a single write in which it failed.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Stage {
    /// Turning the write into a request for the backend's transport.
    Build,
    /// Sending the request and waiting for the response head.
    Send,
    /// Consuming the response body.
    ReadResponse,
}

impl Stage {
    /// Returns the name used in log output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Build => "build request",
            Stage::Send => "send request",
            Stage::ReadResponse => "read response",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure of a single write, tagged with the stage it failed in.
#[derive(Debug, Error)]
pub enum WriteError {
    /// The request could not be built, e.g. because of an invalid URL or header.
    #[error("failed to build request")]
    Build(#[source] BoxError),

    /// The request could not be sent, or the backend rejected it.
    #[error("failed to send request")]
    Send(#[source] BoxError),

    /// The response body could not be read.
    #[error("failed to read response")]
    ReadResponse(#[source] BoxError),
}

impl WriteError {
    pub(crate) fn build(cause: impl Into<BoxError>) -> Self {
        Self::Build(cause.into())
    }

    pub(crate) fn send(cause: impl Into<BoxError>) -> Self {
        Self::Send(cause.into())
    }

    pub(crate) fn read_response(cause: impl Into<BoxError>) -> Self {
        Self::ReadResponse(cause.into())
    }

    /// Returns the stage this write failed in.
    pub fn stage(&self) -> Stage {
        match self {
            WriteError::Build(_) => Stage::Build,
            WriteError::Send(_) => Stage::Send,
            WriteError::ReadResponse(_) => Stage::ReadResponse,
        }
    }
}

/// Errors raised while constructing a write backend.
///
/// These are fatal: no operation is issued when the backend cannot be set up.
#[derive(Debug, Error)]
pub enum SetupError {
    /// The configured endpoint is not a valid URL.
    #[error("invalid endpoint `{endpoint}`")]
    InvalidEndpoint {
        endpoint: String,
        #[source]
        cause: BoxError,
    },

    /// The HTTP client could not be built.
    #[error("failed to build http client")]
    HttpClient(#[from] reqwest::Error),

    /// The S3 client could not be set up, e.g. because credentials could not be resolved.
    #[error("s3 setup error: {context}")]
    S3 {
        context: String,
        #[source]
        cause: BoxError,
    },
}

impl SetupError {
    pub(crate) fn s3(context: impl Into<String>, cause: impl Into<BoxError>) -> Self {
        Self::S3 {
            context: context.into(),
            cause: cause.into(),
        }
    }
}
