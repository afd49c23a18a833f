use std::fmt;
use std::time::Duration;

use bytes::Bytes;
use s3::creds::Credentials;
use s3::{Bucket, Region};

use super::{WriteBackend, WriteRequest, WriteResponse};
use crate::error::{SetupError, WriteError};

/// Configuration for [`S3Backend`].
#[derive(Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint, e.g. for MinIO. Defaults to the AWS endpoint of [`region`](Self::region).
    pub endpoint: Option<String>,
    pub path_style: bool,
    /// Static credentials. When absent, they are resolved from the environment or profile.
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub timeout: Option<Duration>,
}

impl fmt::Debug for S3Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("path_style", &self.path_style)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

/// Writes with `PutObject` against an S3-compatible service.
///
/// Requests are signed by the client, so the per-operation request ID and host override are not
/// forwarded.
pub struct S3Backend {
    bucket: Box<Bucket>,
}

impl S3Backend {
    pub fn new(config: &S3Config) -> Result<Self, SetupError> {
        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|cause| SetupError::s3("failed to resolve credentials", cause))?;

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: match &config.endpoint {
                Some(endpoint) => endpoint.clone(),
                None => format!("s3-{}.amazonaws.com", config.region),
            },
        };

        let mut bucket = Bucket::new(&config.bucket, region, credentials)
            .map_err(|cause| SetupError::s3("failed to open bucket", cause))?;

        if config.path_style {
            bucket = bucket.with_path_style();
        }

        if let Some(timeout) = config.timeout {
            bucket = bucket
                .with_request_timeout(timeout)
                .map_err(|cause| SetupError::s3("failed to set request timeout", cause))?;
        }

        Ok(Self { bucket })
    }
}

impl fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket.name())
            .field("endpoint", &self.bucket.host())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl WriteBackend for S3Backend {
    fn name(&self) -> &'static str {
        "s3-compatible"
    }

    #[tracing::instrument(level = "trace", fields(request_id = request.request_id), skip_all)]
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, WriteError> {
        let response = self
            .bucket
            .put_object(&*request.path, &request.payload)
            .await
            .map_err(WriteError::send)?;

        Ok(WriteResponse {
            status: response.status_code(),
            body: Bytes::from(response.to_vec()),
        })
    }
}
