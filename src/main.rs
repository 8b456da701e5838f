//! Pupero Sweeper
//!
//! Run modes:
//!   sweeper                  - Sweep forever on SWEEP_INTERVAL_SECONDS
//!   sweeper --once           - Run a single cycle and exit (non-zero if it aborts)
//!   sweeper --check-config   - Print the resolved configuration and exit

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use pupero_sweeper::common::{init_from_config, log_event, EventCategory, LogLevel};
use pupero_sweeper::{CycleRunner, HttpConnector, Scheduler, SweeperConfig, SweeperError};

#[derive(Parser)]
#[command(name = "sweeper")]
#[command(about = "Sweeps Monero deposit addresses into one target and credits users")]
struct Cli {
    /// Run one cycle and exit
    #[arg(long)]
    once: bool,

    /// Print the resolved configuration and exit
    #[arg(long)]
    check_config: bool,

    /// Override SWEEP_INTERVAL_SECONDS
    #[arg(short, long)]
    interval: Option<u64>,
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[{}] {}", e.error_code(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), SweeperError> {
    let mut config = SweeperConfig::from_env()?;
    if let Some(secs) = cli.interval.filter(|s| *s > 0) {
        config.sweep_interval_secs = secs;
    }

    if cli.check_config {
        config.print_summary();
        return Ok(());
    }

    init_from_config(&config)?;

    let config = Arc::new(config);
    let connector = Arc::new(HttpConnector::from_config(&config));
    let runner = Arc::new(CycleRunner::new(connector, Arc::clone(&config)));

    if cli.once {
        let summary = runner.run_once().await?;
        if summary.has_activity() {
            println!("[once] {}", summary);
        } else {
            println!("[once] nothing to sweep ({} checked)", summary.checked);
        }
        return Ok(());
    }

    let scheduler = Scheduler::new(runner, config.sweep_interval());

    tokio::select! {
        _ = scheduler.run() => {}
        signal = shutdown_signal() => {
            scheduler.stop().await;
            log_event(
                LogLevel::Info,
                EventCategory::System,
                "sweeper_stop",
                None,
                serde_json::json!({ "reason": signal }),
            );
        }
    }

    Ok(())
}

/// Wait for Ctrl+C or SIGTERM, returning the signal name
async fn shutdown_signal() -> &'static str {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => "SIGINT",
        _ = terminate => "SIGTERM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_interval_flag_only_from_argv() {
        let cli = Cli::try_parse_from(["sweeper", "--once", "-i", "60"]).unwrap();
        assert!(cli.once);
        assert_eq!(cli.interval, Some(60));

        let cli = Cli::try_parse_from(["sweeper", "--check-config"]).unwrap();
        assert!(cli.check_config);
        assert_eq!(cli.interval, None);
    }
}
