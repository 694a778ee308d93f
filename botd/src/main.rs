//! Banking of Things device daemon.
//!
//! Runs the device core against one data directory holding
//! `configuration.json` and the device keys.
//!
//! Usage:
//!   botd --data-dir /var/lib/bot pair
//!   botd --data-dir /var/lib/bot trigger light_on --value 1.5
//!   botd --data-dir /var/lib/bot serve --port 3001

use anyhow::{Context, Result, bail};
use bot_service::{CoreDeps, DeliveryOutcome, DeviceCore, ServiceConfig, SystemClock};
use bot_storage::{DataLayout, KeyMaterial, KeyMaterialStore};
use bot_transport::{BackendConfig, DEFAULT_HOST, HttpsTransport, TcpProbe};
use botd::build_router;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, info, warn};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(name = "botd")]
#[command(about = "Banking of Things device daemon")]
struct Args {
    /// Directory holding configuration.json and the key files
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// Backend host
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Check actions against the backend action list before triggering
    #[arg(long)]
    validate_actions: bool,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Provision the device state and print the enrollment payload
    Init,
    /// Run the enrollment step the current state calls for
    Configure,
    /// Pair and activate, reinitializing after a pairing mode switch
    Pair,
    /// Trigger an action
    Trigger {
        action_id: String,
        #[arg(long)]
        value: Option<f64>,
        /// Identity to trigger for (multipair devices)
        #[arg(long)]
        alternate_id: Option<String>,
    },
    /// Replay queued offline actions
    Flush,
    /// List the actions this device may trigger
    Actions,
    /// Fetch backend messages and trigger their actions
    Messages,
    /// Show device state and delivery statistics
    Status,
    /// Forget the device state
    Reset,
    /// Serve the local control API
    Serve {
        #[arg(short, long, default_value = "3001")]
        port: u16,
        /// Seconds between background offline replays, 0 to disable
        #[arg(long, default_value = "60")]
        flush_interval: u64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .init();

    let core = Arc::new(assemble(&args).await?);
    run(&core, args.command).await
}

async fn assemble(args: &Args) -> Result<DeviceCore> {
    let layout = DataLayout::new(&args.data_dir);
    let keys = Arc::new(
        KeyMaterial::load(&layout)
            .await
            .with_context(|| format!("Failed to load device keys from {:?}", layout.root()))?,
    );
    info!(
        device_id = keys.device_id(),
        maker_id = keys.maker_id(),
        "Device identity loaded"
    );

    let backend = BackendConfig {
        host: args.host.clone(),
        timeout: Duration::from_secs(args.timeout),
        ..Default::default()
    };
    let transport = HttpsTransport::new(backend.clone(), keys.clone())
        .context("Failed to create backend transport")?;
    let probe = TcpProbe::for_backend(&backend, transport.is_secure());

    let config = ServiceConfig {
        validate_actions: args.validate_actions,
        ..Default::default()
    };
    Ok(DeviceCore::assemble(
        &layout,
        CoreDeps {
            keys,
            transport: Arc::new(transport),
            probe: Arc::new(probe),
            clock: Arc::new(SystemClock),
        },
        config,
    ))
}

async fn run(core: &Arc<DeviceCore>, command: Command) -> Result<()> {
    match command {
        Command::Init => {
            let info = core
                .orchestrator
                .initialize()
                .await
                .context("Initialization failed")?;
            println!("{}", serde_json::to_string_pretty(&info)?);
        }
        Command::Configure => {
            let outcome = core
                .orchestrator
                .configure_device()
                .await
                .context("Configuration failed")?;
            println!("{outcome:?}");
        }
        Command::Pair => {
            let enrolled = core
                .orchestrator
                .pair_and_activate()
                .await
                .context("Pairing failed")?;
            if !enrolled {
                bail!("Device enrollment incomplete, try again");
            }
            println!("Device enrolled");
        }
        Command::Trigger {
            action_id,
            value,
            alternate_id,
        } => {
            let outcome = core
                .engine
                .trigger_action_as(&action_id, value, alternate_id.as_deref())
                .await;
            println!("{}", serde_json::to_string(&outcome)?);
            if let DeliveryOutcome::Rejected(reason) = outcome {
                bail!("{reason}");
            }
        }
        Command::Flush => {
            let report = core.engine.flush().await.context("Offline replay failed")?;
            println!("{}", serde_json::to_string(&report)?);
        }
        Command::Actions => {
            let actions = core
                .catalog
                .fetch_actions()
                .await
                .context("Unable to retrieve actions")?;
            println!("{}", serde_json::to_string_pretty(&actions)?);
        }
        Command::Messages => {
            let results = core
                .messages
                .fetch_and_dispatch()
                .await
                .context("Unable to retrieve messages")?;
            for (message, outcome) in results {
                println!(
                    "{} {}: {}",
                    message.action_id,
                    message.customer_id,
                    outcome.message()
                );
            }
        }
        Command::Status => {
            let state = core.state.get().await.context("Failed to read device state")?;
            let stats = core.engine.stats().await;
            println!("State:   {state} ({})", state.status_message());
            println!("Device:  {}", core.keys.device_id());
            println!(
                "Actions: {} delivered, {} replayed, {} pending",
                stats.total_actions, stats.total_offline_actions, stats.pending_offline
            );
        }
        Command::Reset => {
            core.state.reset().await.context("Failed to reset device state")?;
            println!("Device state reset");
        }
        Command::Serve {
            port,
            flush_interval,
        } => serve(Arc::clone(core), port, flush_interval).await?,
    }
    Ok(())
}

async fn serve(core: Arc<DeviceCore>, port: u16, flush_interval: u64) -> Result<()> {
    if flush_interval > 0 {
        let engine = Arc::clone(&core.engine);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(flush_interval));
            loop {
                ticker.tick().await;
                engine.request_flush();
            }
        });
    }

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .with_context(|| format!("Failed to bind control API port {port}"))?;
    info!("Control API listening on port {port}");

    axum::serve(listener, build_router(core))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {e}");
            }
            info!("Shutting down");
        })
        .await
        .context("Control API server failed")
}
