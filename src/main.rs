use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{bail, ensure, Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use sinkwatch::config::{Settings, DEFAULT_CONFIG};
use sinkwatch::types::{Interval, Monitor};
use sinkwatch::{SweepReport, SystemClock, Watchdog};

#[derive(Parser, Debug)]
#[command(name = "sinkwatch")]
#[command(about = "Raise alerts when watched data sinks stop receiving records")]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate every enabled monitor once
    Check,

    /// Evaluate every enabled monitor repeatedly
    Watch {
        /// Time between sweeps (e.g. "30s", "5m")
        #[arg(short, long, default_value = "1m")]
        every: Interval,
    },

    /// Show stored monitors without evaluating them
    Status,

    /// Print the newest record seen by a monitor
    LastDoc {
        /// Monitor name
        monitor: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let settings = Settings::load(&args.config)
        .with_context(|| format!("Failed to load {}", args.config.display()))?;
    init_tracing(&settings.log.filter)?;

    let watchdog = settings.watchdog(Arc::new(SystemClock)).await?;

    match args.command {
        Command::Check => {
            settings.reconcile(&watchdog).await?;
            let report = watchdog.sweep().await?;
            print_report(&report);
            Ok(if report.has_failures() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            })
        }
        Command::Watch { every } => {
            settings.reconcile(&watchdog).await?;
            watch(&watchdog, every).await?;
            Ok(ExitCode::SUCCESS)
        }
        Command::Status => {
            for monitor in watchdog.monitors().all().await? {
                print_monitor(&monitor);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::LastDoc { monitor: name } => {
            let Some(monitor) = watchdog.monitors().find_by_name(&name).await? else {
                bail!("No monitor named {:?}", name);
            };
            match watchdog.last_document(&monitor).await? {
                Some(doc) => println!("{}", doc),
                None => println!("No document recorded for {}", monitor),
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// `RUST_LOG` wins over the configured filter.
fn init_tracing(configured: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(configured)
            .with_context(|| format!("Invalid log filter {:?}", configured))?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
    Ok(())
}

fn sweep_period(every: Interval) -> Result<std::time::Duration> {
    ensure!(every.as_seconds() > 0, "Sweep period must be positive");
    every
        .as_duration()
        .to_std()
        .context("Sweep period must be positive")
}

/// Sweep on a fixed period until interrupted.
async fn watch(watchdog: &Watchdog, every: Interval) -> Result<()> {
    let period = sweep_period(every)?;
    let mut ticker = tokio::time::interval(period);
    info!(every = %every, "Watching monitors");

    loop {
        tokio::select! {
            _ = ticker.tick() => match watchdog.sweep().await {
                Ok(report) => print_report(&report),
                Err(e) => error!(error = %e, "Sweep failed"),
            },
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                return Ok(());
            }
        }
    }
}

fn print_report(report: &SweepReport) {
    for outcome in &report.outcomes {
        let name = &outcome.monitor.name;
        match &outcome.result {
            Ok(update) => match &update.alert {
                Some(alert) => println!(
                    "{:<24} {:<4} alert #{} [{}] {}",
                    name,
                    update.status.symbol(),
                    alert.id,
                    alert.level,
                    alert.title
                ),
                None => println!("{:<24} {}", name, update.status.symbol()),
            },
            Err(e) => println!("{:<24} FAIL {}", name, e),
        }
    }
    println!(
        "{} monitors, {} down, {} alerts, {} failed",
        report.len(),
        report.unhealthy(),
        report.alerts().count(),
        report.failures().count()
    );
}

fn print_monitor(monitor: &Monitor) {
    let last_seen = match (&monitor.last_healthy_at, &monitor.last_active_sink) {
        (Some(at), Some(sink)) => format!("last record {} in {}", at.to_rfc3339(), sink),
        (Some(at), None) => format!("last record {}", at.to_rfc3339()),
        _ => "no records seen".to_string(),
    };
    println!(
        "{:<24} {:<4} every {:<4} {}{}",
        monitor.name,
        monitor.status.symbol(),
        monitor.interval_label(),
        last_seen,
        if monitor.enabled { "" } else { " (disabled)" }
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sweep_period_is_rejected() {
        let every: Interval = "0s".parse().unwrap();
        assert!(sweep_period(every).is_err());

        let every: Interval = "5m".parse().unwrap();
        assert_eq!(
            sweep_period(every).unwrap(),
            std::time::Duration::from_secs(300)
        );
    }

    #[test]
    fn watch_rejects_zero_period_from_cli() {
        let args = Args::try_parse_from(["sinkwatch", "watch", "--every", "0s"]).unwrap();
        let Command::Watch { every } = args.command else {
            panic!("expected watch, got {:?}", args.command);
        };
        assert!(sweep_period(every).is_err());
    }
}
