//! runwatch binary: streams GitHub Actions transitions for one repository.
//!
//! Loads configuration, sets up structured logging on stderr, and drives the
//! reconciliation loop until SIGINT/SIGTERM.

use std::process::ExitCode;

use clap::Parser;
use runwatch::config::{self, Config};
use runwatch::terminal::{self, TerminalSink};
use runwatch_engine::{Reconciler, SystemClock};
use runwatch_github::GithubClient;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

/// Watch a repository's GitHub Actions runs, jobs, and steps.
#[derive(Debug, Parser)]
#[command(name = "runwatch", version, about)]
struct Cli {
    /// Repository to monitor, as `owner/repo`.
    repo: String,

    /// GitHub token used for API requests.
    token: String,

    /// Path to the TOML configuration file.
    #[arg(long, short)]
    config: Option<String>,
}

fn resolve_config_path(cli: &Cli) -> (String, &'static str) {
    if let Some(path) = cli.config.as_ref().filter(|p| !p.trim().is_empty()) {
        return (path.clone(), "cli-arg");
    }

    if let Ok(path) = std::env::var("RUNWATCH_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (path, "env-var");
        }
    }

    ("runwatch.toml".to_string(), "default")
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let (config_path, config_source) = resolve_config_path(&cli);

    let (config, origin) = match config::load_config(Some(&config_path)) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("runwatch: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_tracing(&config);

    tracing::info!(
        source = config_source,
        path = %config_path,
        origin = origin.as_str(),
        "resolved startup configuration path"
    );

    let provider = match GithubClient::new(&cli.token, config.github.settings()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("runwatch: cannot build GitHub client: {e}");
            return ExitCode::FAILURE;
        }
    };

    let store = runwatch::open_checkpoint_store(&config.checkpoint);

    let reconciler = Reconciler::new(
        cli.repo.clone(),
        provider,
        store,
        TerminalSink::stdout(),
        SystemClock,
        config.poll.settings(),
    );

    let mut stdout = std::io::stdout();
    if let Err(e) = terminal::write_banner(&mut stdout, reconciler.resource(), reconciler.watermark())
    {
        tracing::warn!(error = %e, "failed to write banner");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let watermark = reconciler.run(shutdown_rx).await;

    if let Err(e) = terminal::write_farewell(&mut stdout) {
        tracing::warn!(error = %e, "failed to write farewell");
    }
    tracing::info!(resource = %cli.repo, %watermark, "runwatch stopped");

    ExitCode::SUCCESS
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM.
///
/// If a handler cannot be installed, that signal is never observed.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, stopping"); }
        () = terminate => { tracing::info!("received SIGTERM, stopping"); }
    }
}
