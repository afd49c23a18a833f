use std::path::PathBuf;
use std::time::{Duration, SystemTime};

use anyhow::{Context, Result};
use argh::FromArgs;
use putstorm_engine::{LoadGenerator, LoadSpec, SharedBackend};
use serde::Serialize;

use crate::config::{BackendKind, Config};
use crate::observability;

/// Issue rate-paced PUT requests of a random payload against a storage endpoint.
///
/// Writes are issued at the target rate whether or not earlier writes have completed. Every
/// write prints a METRICS line to stdout, and the throughput of successful writes is printed
/// every 5 seconds.
#[derive(Debug, FromArgs)]
struct Args {
    /// path to the YAML configuration file
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// base URL to write to, e.g. http://localhost:9000/bucket
    #[argh(option)]
    endpoint: Option<String>,

    /// host header to send, if different from the endpoint
    #[argh(option)]
    host: Option<String>,

    /// skip TLS certificate verification
    #[argh(switch)]
    insecure: bool,

    /// destination path of every write [default: putstorm/<now>]
    #[argh(option)]
    path: Option<String>,

    /// target writes per second [default: 1]
    #[argh(option)]
    rate: Option<u32>,

    /// payload size, e.g. 512 or 4KiB [default: 512]
    #[argh(option)]
    size: Option<bytesize::ByteSize>,

    /// number of writes to issue, 0 for unbounded [default: 0]
    #[argh(option, short = 'n')]
    count: Option<u64>,

    /// maximum idle connections per host [default: 2]
    #[argh(option)]
    pool_size: Option<usize>,

    /// per-write timeout, e.g. 10s [default: none]
    #[argh(option)]
    timeout: Option<humantime::Duration>,

    /// write backend, one of "http" or "s3" [default: http]
    #[argh(option)]
    backend: Option<BackendKind>,
}

/// Command line values, merged over all other configuration sources.
#[derive(Debug, Default, Serialize)]
struct Overrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    insecure: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    rate: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pool_size: Option<usize>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        with = "humantime_serde"
    )]
    timeout: Option<Duration>,
    #[serde(skip_serializing_if = "Option::is_none")]
    backend: Option<BackendKind>,
}

impl From<&Args> for Overrides {
    fn from(args: &Args) -> Self {
        Self {
            endpoint: args.endpoint.clone(),
            host: args.host.clone(),
            // A switch cannot be turned off from the command line.
            insecure: args.insecure.then_some(true),
            path: args.path.clone(),
            rate: args.rate,
            size: args.size.map(|size| size.as_u64()),
            count: args.count,
            pool_size: args.pool_size,
            timeout: args.timeout.map(Into::into),
            backend: args.backend,
        }
    }
}

/// Renders the `--help` text for `command`.
fn usage(command: &str) -> String {
    match Args::from_args(&[command], &["--help"]) {
        Err(early_exit) => early_exit.output,
        Ok(_) => String::new(),
    }
}

/// A validated run, ready to start.
#[derive(Debug)]
struct Setup {
    config: Config,
    spec: LoadSpec,
    backend: SharedBackend,
}

impl Setup {
    /// Loads and validates the configuration and constructs the backend.
    ///
    /// Every error returned here is fatal before any write is issued.
    fn prepare(args: &Args, now: SystemTime) -> Result<Self> {
        let config = Config::load(args.config.as_deref(), Overrides::from(args))
            .context("failed to load configuration")?;
        let (spec, backend) = config.resolve(now).context("invalid configuration")?;
        let backend = backend
            .build()
            .context("failed to set up write backend")?;

        Ok(Self {
            config,
            spec,
            backend,
        })
    }
}

/// Bootstrap the runtime and execute the load run.
pub fn execute() -> Result<()> {
    let args: Args = argh::from_env();

    let Setup {
        config,
        spec,
        backend,
    } = Setup::prepare(&args, SystemTime::now()).inspect_err(|_| {
        let command = std::env::args().next().unwrap_or_else(|| "putstorm".into());
        eprintln!("{}", usage(&command));
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("putstorm-rt")
        .enable_all()
        .worker_threads(config.runtime.worker_threads.max(1))
        .build()?;
    let _runtime_guard = runtime.enter();

    observability::init_tracing(&config.logging);
    tracing::debug!(?config);

    runtime.block_on(async move {
        let shutdown = elegant_departure::tokio::depart()
            .on_termination()
            .on_sigint();

        let summary = LoadGenerator::new(spec, backend).run_until(shutdown).await;
        if summary.interrupted {
            tracing::info!("shutting down");
        }
    });

    Ok(())
}
