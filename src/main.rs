use anyhow::{Context, Result};
use clap::Parser;
use logspout::{ConfigFile, GeneratorBuilder, RunOutcome, ShutdownToken};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{
    fmt, layer::SubscriberExt, reload, util::SubscriberInitExt, EnvFilter, Registry,
};

/// Swaps the diagnostic filter once the configuration is known.
type FilterHandle = reload::Handle<EnvFilter, Registry>;

/// logspout: synthetic log traffic at controllable rates
///
/// Reads a YAML configuration and writes generated log lines to stdout or
/// to a file, alternating normal and peak traffic until the configured run
/// time passes or the process is interrupted.
///
/// Any CONFIG key can be overridden with an environment variable:
///   LOG_GEN_RATE_PEAK=2.5 logspout -c config.yaml
#[derive(Parser, Debug)]
#[command(name = "logspout")]
#[command(version, about = "Generate realistic log entries with configurable rates and formats", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Enable debug output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let filter = init_tracing(cli.verbose);

    match run(&cli, filter) {
        Ok(RunOutcome::Completed) => {
            info!("Log generation finished");
            ExitCode::SUCCESS
        }
        Ok(RunOutcome::Interrupted) => {
            info!("Interrupted by user");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, filter: Option<FilterHandle>) -> Result<RunOutcome> {
    let config = ConfigFile::load(&cli.config).with_context(|| {
        format!(
            "failed to load configuration from {}",
            cli.config.display()
        )
    })?;
    apply_config_level(filter, &config);

    let token = ShutdownToken::new();
    spawn_signal_listener(token.clone())?;

    info!("Starting log generator...");
    let mut generator = GeneratorBuilder::new(config)
        .shutdown(token)
        .build()
        .context("failed to initialise generator")?;

    let summary = generator.run().context("log generation failed")?;
    info!(
        "Run ended after {} iterations\n{}",
        summary.iterations,
        summary.metrics.summary()
    );
    Ok(summary.outcome)
}

/// Filter in force while the configuration loads.
///
/// `--verbose` wins, then `RUST_LOG`. Otherwise `info` is used and the second
/// value is true: the filter should follow `logging_level` once it is known.
fn startup_filter(verbose: bool, rust_log: Option<&str>) -> (EnvFilter, bool) {
    if verbose {
        return (EnvFilter::new("debug"), false);
    }
    match rust_log.map(EnvFilter::try_new) {
        Some(Ok(filter)) => (filter, false),
        _ => (EnvFilter::new("info"), true),
    }
}

/// Installs the subscriber before anything else logs. Diagnostics go to
/// stderr so they never mix with generated lines on stdout.
fn init_tracing(verbose: bool) -> Option<FilterHandle> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let (filter, follow_config) = startup_filter(verbose, rust_log.as_deref());
    let (filter, handle) = reload::Layer::new(filter);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .init();

    follow_config.then_some(handle)
}

fn apply_config_level(filter: Option<FilterHandle>, config: &ConfigFile) {
    let Some(handle) = filter else { return };
    let level = config.settings.tracing_level();
    match handle.reload(EnvFilter::new(level)) {
        Ok(()) => debug!("Logging level set to {}", level),
        Err(e) => warn!("Failed to apply logging level {}: {}", level, e),
    }
}

/// Triggers `token` on SIGINT or SIGTERM.
///
/// Runs on its own thread with a single-threaded runtime; the generator
/// itself stays synchronous.
fn spawn_signal_listener(token: ShutdownToken) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build signal runtime")?;

    std::thread::Builder::new()
        .name("signal-listener".into())
        .spawn(move || {
            runtime.block_on(async move {
                wait_for_signal().await;
                info!("Interrupt received, shutting down...");
                token.trigger();
            })
        })
        .context("failed to spawn signal listener")?;

    Ok(())
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut terminate) => {
            tokio::select! {
                result = tokio::signal::ctrl_c() => {
                    if let Err(e) = result {
                        warn!("Failed to listen for Ctrl+C: {}", e);
                        std::future::pending::<()>().await;
                    }
                }
                _ = terminate.recv() => {}
            }
        }
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            ctrl_c_or_never().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    ctrl_c_or_never().await;
}

async fn ctrl_c_or_never() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl+C: {}", e);
        std::future::pending::<()>().await;
    }
}
