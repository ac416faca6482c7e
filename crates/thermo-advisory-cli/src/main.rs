use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thermo_advisory_client::{
    AdvisoryMetrics, AdvisoryTransport, AdvisoryView, HttpSensorFeed, HttpTransport,
    SharedSnapshot,
};
use thermo_advisory_core::{
    format_timestamp, AdvisoryConfig, LiveAdviceParams, ScenarioField, UsageState,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "thermo-advisory", version, about = "ThermoSense battery/thermal advisory client")]
struct Cli {
    /// JSON config file; individual flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long)]
    base_url: Option<String>,

    /// Request timeout in seconds. Unset leaves the transport default.
    #[arg(long)]
    timeout_secs: Option<u64>,

    #[arg(long)]
    history_limit: Option<usize>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Submit a what-if scenario, then print the refreshed history.
    Analyze(ScenarioArgs),
    /// Ask for advice on the live sensor readings.
    Live(LiveArgs),
    /// Print the stored advisory history.
    History,
    /// Print the live sensor snapshot.
    Sensors,
    /// Print advisory statistics from the service.
    Stats,
}

#[derive(Args, Debug)]
struct ScenarioArgs {
    #[arg(long)]
    device_temp: String,
    #[arg(long)]
    ambient_temp: String,
    #[arg(long)]
    battery_level: String,
    /// idle | discharging | charging
    #[arg(long)]
    usage: UsageState,
    /// Print Prometheus metrics after the run.
    #[arg(long)]
    metrics: bool,
}

#[derive(Args, Debug)]
struct LiveArgs {
    #[arg(long)]
    ambient_temp: f64,
    #[arg(long)]
    device_state: String,
    #[arg(long)]
    battery_temp: Option<f64>,
    #[arg(long)]
    battery_level: Option<i64>,
    #[arg(long)]
    cpu_temp: Option<f64>,
}

#[derive(Serialize)]
struct HistoryRow {
    when: String,
    alert_level: String,
    battery_temp: f64,
    ambient_temp: f64,
    device_state: String,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn load_config(cli: &Cli) -> Result<AdvisoryConfig> {
    let mut cfg = match &cli.config {
        Some(path) => AdvisoryConfig::from_path(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => AdvisoryConfig::default_local(),
    };
    if let Some(url) = &cli.base_url {
        cfg.base_url = url.clone();
    }
    if let Some(secs) = cli.timeout_secs {
        cfg.request_timeout_secs = Some(secs);
    }
    if let Some(limit) = cli.history_limit {
        cfg.history_limit = limit;
    }
    cfg.validate()?;
    Ok(cfg)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    let cfg = load_config(&cli)?;
    tracing::info!(base_url = %cfg.base_url, "thermo-advisory starting");

    let transport: Arc<dyn AdvisoryTransport> = Arc::new(HttpTransport::new(&cfg)?);
    let snapshot = SharedSnapshot::default();
    let feed = HttpSensorFeed::new(Arc::clone(&transport), snapshot.clone());
    let metrics = Arc::new(AdvisoryMetrics::new()?);

    match cli.command {
        Command::Sensors => {
            let live = feed.pull().await?;
            print_json(&live)?;
        }
        Command::Stats => {
            let stats = transport.fetch_statistics().await?;
            print_json(&stats)?;
        }
        Command::History => {
            let view = AdvisoryView::new(cfg, transport, Arc::new(snapshot), metrics);
            view.history().refresh().await?;
            let rows: Vec<HistoryRow> = view
                .history()
                .entries()
                .into_iter()
                .map(|e| HistoryRow {
                    when: format_timestamp(&e.timestamp),
                    alert_level: e.alert_level,
                    battery_temp: e.battery_temp,
                    ambient_temp: e.ambient_temp,
                    device_state: e.device_state,
                })
                .collect();
            print_json(&rows)?;
            view.shutdown().await;
        }
        Command::Live(args) => {
            if let Err(err) = feed.pull().await {
                tracing::warn!(error = %err, "live sensors unavailable, using last snapshot");
            }
            let view = AdvisoryView::new(cfg, transport, Arc::new(snapshot), metrics);
            let result = view
                .request_live_advice(LiveAdviceParams {
                    battery_temp: args.battery_temp,
                    ambient_temp: args.ambient_temp,
                    device_state: args.device_state,
                    battery_level: args.battery_level,
                    cpu_temp: args.cpu_temp,
                })
                .await?;
            print_json(&result)?;
            view.shutdown().await;
        }
        Command::Analyze(args) => {
            if let Err(err) = feed.pull().await {
                tracing::warn!(error = %err, "live sensors unavailable, summary shows defaults");
            }
            let mut view =
                AdvisoryView::new(cfg, transport, Arc::new(snapshot), Arc::clone(&metrics));
            view.edit(ScenarioField::DeviceTemp, args.device_temp);
            view.edit(ScenarioField::AmbientTemp, args.ambient_temp);
            view.edit(ScenarioField::BatteryLevel, args.battery_level);
            view.set_usage(args.usage);
            if !view.state().can_submit {
                anyhow::bail!("all scenario fields must be filled");
            }

            view.submit().await;
            view.toggle_history();
            let history = view.history().clone();
            let mut state = view.state();
            view.shutdown().await;
            state.history = history.entries();
            state.history_loading = history.loading();
            print_json(&state)?;
            if args.metrics {
                print!("{}", metrics.render()?);
            }
        }
    }

    Ok(())
}
