use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use hydrowatch::{session, AuthGate, SensorContext, SessionConfig, StateStore};

#[derive(Parser, Debug)]
#[command(name = "hydrowatch")]
#[command(about = "Headless monitoring core for hydroponic sensor telemetry")]
struct Args {
    /// WebSocket endpoint of the reading producer (omit for synthetic mode)
    #[arg(short, long)]
    endpoint: Option<String>,

    /// Reading cadence in seconds for the synthetic producer
    #[arg(short, long, default_value = "5")]
    interval: u64,

    /// Directory for persisted state (thresholds, identity)
    #[arg(long, default_value = ".hydrowatch")]
    state_dir: PathBuf,

    /// Retained samples per sensor
    #[arg(long, default_value = "100")]
    history_cap: usize,

    /// Establish an identity under this name if none is saved
    #[arg(long)]
    operator: Option<String>,

    /// Clear the saved identity and exit
    #[arg(long, conflicts_with_all = ["endpoint", "operator"])]
    sign_out: bool,

    /// Write a JSON state snapshot to this file on shutdown
    #[arg(short = 'x', long)]
    export: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let store = StateStore::open(&args.state_dir)?;
    let mut gate = AuthGate::restore(&store);

    if args.sign_out {
        gate.sign_out();
        return Ok(());
    }

    // The monitoring session only runs behind the identity gate
    if gate.identity().is_none() {
        match args.operator.as_deref() {
            Some(name) => {
                gate.sign_in(name)?;
            }
            None => anyhow::bail!("no saved identity; pass --operator <name> to sign in"),
        }
    }

    let mut ctx = SensorContext::with_history_cap(store, args.history_cap);
    let config = SessionConfig {
        endpoint: args.endpoint,
        cadence: Duration::from_secs(args.interval.max(1)),
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("shutting down");
            signal_cancel.cancel();
        }
    });

    session::run_session(&mut ctx, &config, cancel).await;

    if let Some(path) = args.export {
        ctx.export_state(&path)?;
        println!("Exported state to: {}", path.display());
    }

    Ok(())
}
