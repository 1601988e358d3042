use anyhow::{Context, Result};
use clap::Parser;
use hashsweep::prelude::*;
use hashsweep::{ChannelBackend, PartitionStrategy, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "hashsweep",
    version,
    about = "Recover a fixed-length password from its digest by parallel brute force",
    long_about = None,
    allow_negative_numbers = true
)]
struct Cli {
    /// Number of characters in the password
    length: i64,

    /// Hex digest of the password (e.g. `echo -n 'hi' | sha1sum`)
    hash: String,

    /// Character set: numeric, alpha, alphanumeric (default: alphanumeric)
    charset: Option<String>,

    /// Number of workers (default: number of CPUs)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Digest algorithm of the target (sha1, sha256)
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Leaf evaluations between progress lines per worker (0 disables)
    #[arg(long)]
    progress_every: Option<u64>,

    /// How to split the alphabet across workers (tail, spread)
    #[arg(long)]
    partition: Option<PartitionStrategy>,

    /// Channel implementation (flume, crossbeam)
    #[arg(long)]
    channel_backend: Option<ChannelBackend>,

    /// Pin worker threads to CPU cores
    #[arg(long)]
    pin_cores: bool,

    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Log format (text, json)
    #[arg(long, default_value = "text")]
    log_format: String,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    setup_tracing(&cli.log_format, cli.verbose)?;

    let settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    let algorithm = cli.algorithm.or(settings.algorithm).unwrap_or_default();
    let charset = match cli.charset.as_deref() {
        Some(selector) => Charset::from_selector(Some(selector)),
        None => settings.charset.unwrap_or_default(),
    };
    let oracle = algorithm.oracle();

    let spec = match SearchSpec::new(charset.alphabet(), cli.length, &cli.hash, oracle.as_ref()) {
        Ok(spec) => spec,
        Err(e) if e.is_configuration() => {
            println!("{e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let mut config = settings.apply(GroupConfig::new());
    if let Some(workers) = cli.workers {
        config.num_workers = workers;
    }
    if let Some(interval) = cli.progress_every {
        config.progress_interval = interval;
    }
    if let Some(partition) = cli.partition {
        config.partition = partition;
    }
    if let Some(backend) = cli.channel_backend {
        config.channel_backend = backend;
    }
    if cli.pin_cores {
        config.enable_cpu_affinity = true;
    }

    let group = WorkerGroup::new(config, oracle)?;
    tracing::debug!(%charset, ?algorithm, workers = group.num_workers(), "configuration resolved");

    println!("Starting parallel computing hash cracker.");
    let report = group.run(&spec).context("sweep did not complete")?;
    println!("{report}");

    Ok(ExitCode::SUCCESS)
}

fn setup_tracing(format: &str, verbose: bool) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("hashsweep=debug,warn")
        } else {
            EnvFilter::new("hashsweep=info,warn")
        }
    });

    match format {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    Ok(())
}
