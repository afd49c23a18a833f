use std::time::Duration;

use reqwest::Url;
use reqwest::header::{HOST, HeaderName, USER_AGENT};

use super::{WriteBackend, WriteRequest, WriteResponse};
use crate::error::{SetupError, WriteError};

/// Header carrying the per-operation identifier.
pub const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Idle pooled connections are closed after this long.
const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration for [`HttpBackend`].
#[derive(Clone, Debug)]
pub struct HttpConfig {
    /// Base URL; the write path is appended after a `/`.
    pub endpoint: String,
    /// Skip TLS certificate verification.
    pub insecure: bool,
    /// Maximum idle connections kept per host.
    pub pool_size: usize,
    /// Per-request timeout. `None` lets requests run forever.
    pub timeout: Option<Duration>,
}

/// Writes with a plain HTTP `PUT` of the payload to `{endpoint}/{path}`.
#[derive(Debug)]
pub struct HttpBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBackend {
    pub fn new(config: &HttpConfig) -> Result<Self, SetupError> {
        let endpoint = config.endpoint.trim_end_matches('/').to_owned();
        if let Err(cause) = Url::parse(&endpoint) {
            return Err(SetupError::InvalidEndpoint {
                endpoint,
                cause: cause.into(),
            });
        }

        let mut builder = reqwest::Client::builder()
            .pool_max_idle_per_host(config.pool_size)
            .pool_idle_timeout(IDLE_TIMEOUT)
            .danger_accept_invalid_certs(config.insecure);
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            endpoint,
        })
    }
}

#[async_trait::async_trait]
impl WriteBackend for HttpBackend {
    fn name(&self) -> &'static str {
        "http"
    }

    #[tracing::instrument(level = "trace", fields(request_id = request.request_id), skip_all)]
    async fn write(&self, request: WriteRequest) -> Result<WriteResponse, WriteError> {
        let url = format!("{}/{}", self.endpoint, request.path);

        let mut builder = self
            .client
            .put(url)
            .header(USER_AGENT, request.client_id)
            .header(REQUEST_ID, request.request_id)
            .body(request.payload);
        if let Some(host) = &request.host {
            builder = builder.header(HOST, host.as_ref());
        }
        let http_request = builder.build().map_err(WriteError::build)?;

        let response = self
            .client
            .execute(http_request)
            .await
            .map_err(WriteError::send)?;

        let status = response.status().as_u16();
        // The timeout spans the whole exchange; a late body counts as a send timeout.
        let body = response.bytes().await.map_err(|error| match error.is_timeout() {
            true => WriteError::send(error),
            false => WriteError::read_response(error),
        })?;

        Ok(WriteResponse { status, body })
    }
}
