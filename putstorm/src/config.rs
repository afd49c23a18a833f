//! Configuration for the putstorm load generator.
//!
//! Configuration can be loaded from multiple sources with the following precedence (highest to
//! lowest):
//!
//! 1. Command line flags
//! 2. Environment variables (prefixed with `PUTSTORM__`)
//! 3. YAML configuration file (specified via `-c` or `--config` flag)
//! 4. Defaults
//!
//! See [`Config`] for a description of all configuration fields and their defaults.
//!
//! # Environment Variables
//!
//! Environment variables use `PUTSTORM__` as a prefix and double underscores (`__`) to denote
//! nested configuration structures. For example:
//!
//! - `PUTSTORM__ENDPOINT=http://localhost:9000/bucket` sets the write endpoint
//! - `PUTSTORM__RATE=100` sets the target rate
//! - `PUTSTORM__S3__BUCKET=loadtest` sets the bucket of the S3 backend
//!
//! # YAML Configuration File
//!
//! ```yaml
//! endpoint: http://localhost:9000
//! rate: 100
//! size: 4KiB
//!
//! backend: s3
//! s3:
//!   bucket: loadtest
//!   path_style: true
//! ```

use std::fmt;
use std::num::NonZeroU32;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Result;
use bytesize::ByteSize;
use figment::providers::{Env, Format, Serialized, Yaml};
use putstorm_engine::LoadSpec;
use putstorm_engine::backend::{BackendConfig, HttpConfig, S3Config};
use putstorm_engine::spec::default_path;
use secrecy::{CloneableSecret, ExposeSecret, SecretBox, SerializableSecret, zeroize::Zeroize};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::level_filters::LevelFilter;

/// Environment variable prefix for all configuration options.
const ENV_PREFIX: &str = "PUTSTORM__";

/// Newtype around `String` that may protect against accidental logging of secrets in our
/// configuration struct. Use with [`secrecy::SecretBox`].
#[derive(Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ConfigSecret(String);

impl ConfigSecret {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for ConfigSecret {
    fn from(str: &str) -> Self {
        ConfigSecret(str.to_string())
    }
}

impl fmt::Debug for ConfigSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        write!(f, "[redacted]")
    }
}

impl CloneableSecret for ConfigSecret {}
impl SerializableSecret for ConfigSecret {}
impl Zeroize for ConfigSecret {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

/// Which write backend to issue operations against.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Raw HTTP `PUT` to `{endpoint}/{path}`.
    #[default]
    Http,
    /// `PutObject` against an S3-compatible service, configured in [`Config::s3`].
    S3,
}

/// The backend kind parse error.
#[derive(Clone, Debug)]
pub struct BackendParseError(String);

impl fmt::Display for BackendParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            r#"error parsing "{}" as backend: expected one of "http", "s3""#,
            self.0
        )
    }
}

impl std::error::Error for BackendParseError {}

impl std::str::FromStr for BackendKind {
    type Err = BackendParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            s if s.eq_ignore_ascii_case("http") => Ok(BackendKind::Http),
            s if s.eq_ignore_ascii_case("s3") => Ok(BackendKind::S3),
            s => Err(BackendParseError(s.into())),
        }
    }
}

/// S3-compatible backend configuration.
///
/// Only used when [`Config::backend`] is `s3`. The service endpoint is taken from
/// [`Config::endpoint`] and defaults to AWS.
///
/// Used in: [`Config::s3`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct S3 {
    /// Name of the bucket to write to. Required for the S3 backend.
    ///
    /// # Environment Variable
    ///
    /// `PUTSTORM__S3__BUCKET`
    pub bucket: Option<String>,

    /// Region of the bucket.
    ///
    /// # Default
    ///
    /// `us-east-1`
    pub region: String,

    /// Address buckets as `{endpoint}/{bucket}` instead of `{bucket}.{endpoint}`.
    ///
    /// Most self-hosted S3-compatible services, such as MinIO, need this.
    ///
    /// # Default
    ///
    /// `false`
    pub path_style: bool,

    /// Static access key. When unset, credentials are resolved from the standard AWS environment
    /// variables or profile.
    ///
    /// # Environment Variable
    ///
    /// `PUTSTORM__S3__ACCESS_KEY`
    pub access_key: Option<SecretBox<ConfigSecret>>,

    /// Static secret key, see [`access_key`](Self::access_key).
    ///
    /// # Environment Variable
    ///
    /// `PUTSTORM__S3__SECRET_KEY`
    pub secret_key: Option<SecretBox<ConfigSecret>>,
}

impl Default for S3 {
    fn default() -> Self {
        Self {
            bucket: None,
            region: "us-east-1".into(),
            path_style: false,
            access_key: None,
            secret_key: None,
        }
    }
}

/// Runtime configuration for the Tokio async runtime.
///
/// Used in: [`Config::runtime`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Runtime {
    /// Number of worker threads executing in-flight writes.
    ///
    /// # Default
    ///
    /// Defaults to the number of CPU cores on the host machine.
    ///
    /// # Environment Variable
    ///
    /// `PUTSTORM__RUNTIME__WORKER_THREADS`
    pub worker_threads: usize,
}

impl Default for Runtime {
    fn default() -> Self {
        Self {
            worker_threads: num_cpus::get(),
        }
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Auto detect the best format.
    ///
    /// This chooses [`LogFormat::Pretty`] for TTY, otherwise [`LogFormat::Simplified`].
    Auto,

    /// Compact output with colors.
    ///
    /// ```text
    /// 2020-12-04T12:10:32.123456Z  INFO putstorm_engine::executor: 201 :: stored 512 bytes
    /// ```
    Pretty,

    /// Plain text output without colors.
    Simplified,

    /// Dump out JSON lines.
    Json,
}

mod display_fromstr {
    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
        T: std::fmt::Display,
    {
        serializer.collect_str(&value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        D: serde::Deserializer<'de>,
        T: std::str::FromStr,
        <T as std::str::FromStr>::Err: std::fmt::Display,
    {
        use serde::Deserialize;
        let s = <std::borrow::Cow<'de, str>>::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Logging configuration.
///
/// Logs are always written to stderr, so that stdout only carries the `METRICS` and throughput
/// lines.
///
/// Used in: [`Config::logging`]
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Logging {
    /// Minimum log level to output.
    ///
    /// Per-operation results are logged at `INFO` and failures at `ERROR`. Set to `WARN` to only
    /// see failures. The `RUST_LOG` environment variable provides more granular control.
    ///
    /// # Default
    ///
    /// `INFO`
    ///
    /// # Environment Variable
    ///
    /// `PUTSTORM__LOGGING__LEVEL`
    #[serde(with = "display_fromstr")]
    pub level: LevelFilter,

    /// Log output format, see [`LogFormat`].
    ///
    /// # Default
    ///
    /// `auto`
    ///
    /// # Environment Variable
    ///
    /// `PUTSTORM__LOGGING__FORMAT`
    pub format: LogFormat,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            format: LogFormat::Auto,
        }
    }
}

/// Main configuration struct for the load generator.
#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// The write backend.
    ///
    /// # Default
    ///
    /// `http`
    ///
    /// # Environment Variable
    ///
    /// `PUTSTORM__BACKEND`
    pub backend: BackendKind,

    /// Base address writes are sent to.
    ///
    /// Required for the `http` backend, where every write is a `PUT` to `{endpoint}/{path}`. For
    /// the `s3` backend this is an optional custom service endpoint.
    ///
    /// # Environment Variable
    ///
    /// `PUTSTORM__ENDPOINT`
    pub endpoint: Option<String>,

    /// `Host` header to send, if different from the endpoint.
    pub host: Option<String>,

    /// Skip TLS certificate verification.
    ///
    /// # Default
    ///
    /// `false`
    pub insecure: bool,

    /// Destination path of every write.
    ///
    /// # Default
    ///
    /// `putstorm/<current UTC time>`, with `:` replaced by `-`.
    pub path: Option<String>,

    /// Target write operations per second. Must be greater than zero.
    ///
    /// # Default
    ///
    /// `1`
    pub rate: u32,

    /// Size of the random payload.
    ///
    /// # Default
    ///
    /// `512 B`
    pub size: ByteSize,

    /// Number of writes to issue. `0` issues writes until interrupted.
    ///
    /// # Default
    ///
    /// `0`
    pub count: u64,

    /// Maximum idle connections kept per host.
    ///
    /// This is the only limit on concurrency: writes are issued at the target rate regardless of
    /// how many are still in flight.
    ///
    /// # Default
    ///
    /// `2`
    pub pool_size: usize,

    /// Timeout for each write, e.g. `10s`.
    ///
    /// # Default
    ///
    /// `None`: writes that never complete stay in flight until the process exits.
    #[serde(with = "humantime_serde")]
    pub timeout: Option<Duration>,

    /// S3 backend configuration.
    pub s3: S3,

    /// Configuration of the internal task runtime.
    pub runtime: Runtime,

    /// Logging configuration.
    pub logging: Logging,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            endpoint: None,
            host: None,
            insecure: false,
            path: None,
            rate: 1,
            size: ByteSize::b(512),
            count: 0,
            pool_size: 2,
            timeout: None,
            s3: S3::default(),
            runtime: Runtime::default(),
            logging: Logging::default(),
        }
    }
}

/// Validation errors that prevent a run from starting.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// The HTTP backend has nowhere to write to.
    #[error("non-empty endpoint is required")]
    MissingEndpoint,

    /// The S3 backend has no bucket to write to.
    #[error("non-empty s3 bucket is required for the s3 backend")]
    MissingBucket,

    #[error("rate must be greater than zero")]
    ZeroRate,

    #[error("payload size {0} exceeds addressable memory")]
    SizeTooLarge(ByteSize),
}

impl Config {
    /// Loads configuration from the provided arguments.
    ///
    /// `overrides` take precedence over all other sources. Fields it serializes as absent keep the
    /// value from lower-precedence sources.
    pub fn load(path: Option<&Path>, overrides: impl Serialize) -> Result<Self> {
        let mut figment = figment::Figment::from(Serialized::defaults(Config::default()));
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .merge(Serialized::defaults(overrides))
            .extract()?;

        Ok(config)
    }

    /// Validates the configuration and splits it into the run and backend parameters.
    ///
    /// `now` is used to derive the default write path.
    pub fn resolve(&self, now: SystemTime) -> Result<(LoadSpec, BackendConfig), ConfigError> {
        let rate = NonZeroU32::new(self.rate).ok_or(ConfigError::ZeroRate)?;
        let payload_size =
            usize::try_from(self.size.as_u64()).map_err(|_| ConfigError::SizeTooLarge(self.size))?;
        let endpoint = self.endpoint.as_deref().filter(|e| !e.is_empty());

        let backend = match self.backend {
            BackendKind::Http => BackendConfig::Http(HttpConfig {
                endpoint: endpoint.ok_or(ConfigError::MissingEndpoint)?.to_owned(),
                insecure: self.insecure,
                pool_size: self.pool_size,
                timeout: self.timeout,
            }),
            BackendKind::S3 => {
                let bucket = self.s3.bucket.as_deref().filter(|b| !b.is_empty());
                BackendConfig::S3(S3Config {
                    bucket: bucket.ok_or(ConfigError::MissingBucket)?.to_owned(),
                    region: self.s3.region.clone(),
                    endpoint: endpoint.map(ToOwned::to_owned),
                    path_style: self.s3.path_style,
                    access_key: expose(&self.s3.access_key),
                    secret_key: expose(&self.s3.secret_key),
                    timeout: self.timeout,
                })
            }
        };

        let target = match &backend {
            BackendConfig::Http(http) => http.endpoint.clone(),
            BackendConfig::S3(s3) => format!("s3://{}", s3.bucket),
        };

        let spec = LoadSpec {
            target,
            host: self.host.clone().filter(|h| !h.is_empty()),
            path: self.path.clone().unwrap_or_else(|| default_path(now)),
            payload_size,
            rate,
            count: self.count,
            pool_size: self.pool_size,
        };

        Ok((spec, backend))
    }
}

fn expose(secret: &Option<SecretBox<ConfigSecret>>) -> Option<String> {
    secret
        .as_ref()
        .map(|secret| secret.expose_secret().as_str().to_owned())
}
