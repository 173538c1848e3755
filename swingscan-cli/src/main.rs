//! swingscan CLI: one-off scans, backtests and the live monitor.
//!
//! Commands:
//! - `scan`: run one detection pass for the most recent check slot
//! - `backtest`: simulate a date range and write artifacts
//! - `monitor`: run the Continuous Monitor until Ctrl-C

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use swingscan_core::data::{BarSource, CircuitBreaker, SyntheticSource, YahooSource};
use swingscan_runner::{
    export, run_backtest, CheckReport, Detection, LogSink, Monitor, MonitorSettings,
    ProviderKind, ScanConfig, SystemClock,
};
use tracing::info;

#[derive(Parser)]
#[command(
    name = "swingscan",
    about = "swingscan: swing breakout and chart pattern scanner"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use deterministic synthetic bars instead of the configured provider.
    #[arg(long, global = true, default_value_t = false)]
    synthetic: bool,

    /// Symbols to use instead of the configured universe.
    #[arg(long, global = true, value_delimiter = ',')]
    symbols: Vec<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one live detection pass for the latest check slot and print it.
    Scan {
        /// Print the check report as JSON.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Backtest a date range and write CSV/JSON/Markdown artifacts.
    Backtest {
        /// First day (YYYY-MM-DD).
        #[arg(long)]
        from: NaiveDate,

        /// Last day, inclusive (YYYY-MM-DD).
        #[arg(long)]
        to: NaiveDate,

        /// Output directory for artifacts.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,
    },
    /// Run the Continuous Monitor until Ctrl-C.
    Monitor,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref(), &cli.symbols)?;
    let source = build_source(&config, cli.synthetic)?;

    match cli.command {
        Commands::Scan { json } => run_scan(&config, source, json).await,
        Commands::Backtest {
            from,
            to,
            output_dir,
        } => run_backtest_cmd(&config, source.as_ref(), from, to, &output_dir).await,
        Commands::Monitor => run_monitor(&config, source).await,
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::filter::EnvFilter::builder()
                .with_default_directive(tracing_subscriber::filter::LevelFilter::INFO.into())
                .from_env_lossy(),
        )
        .with_ansi(cfg!(debug_assertions))
        .init()
}

fn load_config(path: Option<&Path>, symbols: &[String]) -> Result<ScanConfig> {
    let mut config = match path {
        Some(path) => ScanConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => ScanConfig::default(),
    };
    if !symbols.is_empty() {
        config.universe.symbols = symbols.to_vec();
        config.validate().context("invalid symbol override")?;
    }
    if config.universe.symbols.is_empty() {
        bail!("no symbols: set [universe] symbols in the config or pass --symbols");
    }
    Ok(config)
}

fn build_source(config: &ScanConfig, synthetic: bool) -> Result<Arc<dyn BarSource>> {
    if synthetic || config.data.provider == ProviderKind::Synthetic {
        return Ok(Arc::new(SyntheticSource::new(config.monitor.session)));
    }
    let breaker = Arc::new(CircuitBreaker::default_provider());
    let yahoo = YahooSource::new(
        breaker,
        config.data.symbol_suffix.clone(),
        config.monitor.timezone,
    )
    .context("failed to build Yahoo provider")?;
    Ok(Arc::new(yahoo))
}

async fn run_scan(config: &ScanConfig, source: Arc<dyn BarSource>, json: bool) -> Result<()> {
    let calendar = config.calendar();
    let now = calendar.to_local(Utc::now());
    let slot = calendar
        .latest_slot(now)
        .context("no completed check slot in the past year")?;

    let monitor = Monitor::new(
        MonitorSettings::from_config(config),
        source,
        Arc::new(LogSink),
        Arc::new(SystemClock),
    );
    let report = monitor.run_check(slot).await;

    if json {
        let out = serde_json::to_string_pretty(&report).context("failed to serialize report")?;
        println!("{out}");
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &CheckReport) {
    println!(
        "Check {} (bars {} to {}): {} symbols, {} failed, {} detections",
        report.slot.at,
        report.slot.window_start,
        report.slot.boundary,
        report.symbols_processed,
        report.failures.len(),
        report.detections.len()
    );
    if let Some(err) = &report.delivery_error {
        println!("  delivery failed, retrying next check: {err}");
    }
    for detection in &report.detections {
        match detection {
            Detection::Signal(s) => println!(
                "  {:<12} {:<18} {}  price {:.2}  vol x{:.2}  level {:.2}",
                s.symbol,
                s.kind.name(),
                s.timestamp,
                s.price,
                s.volume_ratio,
                s.level
            ),
            Detection::Pattern(p) => println!(
                "  {:<12} {:<18} {}  entry {:.2}  stop {:.2}  target {:.2}",
                p.symbol,
                p.kind.name(),
                p.confirm_timestamp,
                p.entry,
                p.stop,
                p.target
            ),
        }
    }
    for (symbol, reason) in &report.failures {
        eprintln!("  {symbol}: {reason}");
    }
}

async fn run_backtest_cmd(
    config: &ScanConfig,
    source: &dyn BarSource,
    from: NaiveDate,
    to: NaiveDate,
    output_dir: &Path,
) -> Result<()> {
    if from > to {
        bail!("--from {from} is after --to {to}");
    }
    let report = run_backtest(
        source,
        &config.universe.symbols,
        config.data.interval,
        from,
        to,
        &config.detection,
        config.backtest.outcome_horizon,
        config.monitor.max_in_flight,
    )
    .await
    .context("backtest failed")?;

    let dir = export::save_artifacts(&report, output_dir)?;
    let agg = &report.aggregate;
    println!(
        "Backtest {from} to {to}: {} symbols ({} excluded), {} trades, win rate {:.1}%, net {:.2}%, profit factor {}",
        report.symbols.len(),
        report.excluded.len(),
        agg.trade_count,
        agg.win_rate * 100.0,
        agg.total_pnl_pct,
        agg.profit_factor
            .map(|pf| format!("{pf:.2}"))
            .unwrap_or_else(|| "n/a".into())
    );
    println!("Artifacts: {}", dir.display());
    Ok(())
}

async fn run_monitor(config: &ScanConfig, source: Arc<dyn BarSource>) -> Result<()> {
    let monitor = Monitor::new(
        MonitorSettings::from_config(config),
        source,
        Arc::new(LogSink),
        Arc::new(SystemClock),
    );
    let handle = monitor.start()?;
    let calendar = config.calendar();
    let next = calendar.next_slot(calendar.to_local(Utc::now()));
    info!(
        symbols = config.universe.symbols.len(),
        next_check = ?next.map(|slot| slot.at),
        "monitoring, Ctrl-C to stop"
    );

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;
    info!("stop requested");
    handle.stop()?;
    handle.join().await?;
    Ok(())
}
