//! Instance discovery daemon.
//!
//! ```text
//!   config.toml ──▶ loader ──▶ DiscoveryScheduler ──▶ Prober (TCP connect)
//!        │                        │        ▲
//!        ▼                        ▼        │ register / unregister
//!     watcher ──reload──▶   DeadInstanceFilter ──▶ discoveries_dead_instances
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::sync::mpsc;

use instance_discovery::config::{load_config, watcher::ConfigWatcher, DiscoveryConfig};
use instance_discovery::lifecycle::{signals, startup};
use instance_discovery::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "instance-discovery")]
#[command(about = "Polls instances and backs off from the ones that stop answering", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DiscoveryConfig::default(),
    };

    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    logging::init_logging(log_level);

    tracing::info!("instance-discovery v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        instances = config.polling.instances.len(),
        poll_secs = config.polling.instance_poll_secs,
        multiply_factor = config.dead_instances.poll_secs_multiply_factor,
        max_delay_secs = config.dead_instances.poll_secs_max,
        dead_pool = config.dead_instances.discovery_max_concurrency,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // The watcher must stay alive for reloads to keep flowing.
    let (_watcher, config_updates) = match &cli.config {
        Some(path) => {
            let (watcher, updates) = ConfigWatcher::new(path, config.clone());
            (Some(watcher.run()?), updates)
        }
        None => {
            let (_, updates) = mpsc::unbounded_channel();
            (None, updates)
        }
    };

    let scheduler = startup::build_scheduler(config);
    startup::run_until(scheduler, config_updates, signals::shutdown_signal()).await;

    tracing::info!("Shutdown complete");
    Ok(())
}
