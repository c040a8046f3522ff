//! Service balancer agent.
//!
//! Runs one managed balancer per configured service over static discovery,
//! logs their statistics periodically and stops cleanly on SIGINT/SIGTERM.
//!
//! ```text
//!   config.toml ──▶ loader ──▶ BalancerConfig
//!        │                         │
//!        │ (notify)                ├──▶ StaticDiscovery ◀── hot reload
//!        ▼                         │
//!   ConfigWatcher ─────────────────┘
//!                                  │
//!                                  ▼
//!                           BalancerFactory
//!                                  │
//!                 ┌────────────────┼────────────────┐
//!                 ▼                ▼                ▼
//!          ServiceBalancer  ServiceBalancer  ServiceBalancer
//!           (refresh task,   (...)            (...)
//!            probe task)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use service_balancer::config::{load_config, watcher::ConfigWatcher, BalancerConfig};
use service_balancer::discovery::StaticDiscovery;
use service_balancer::lifecycle::signals::wait_for_termination;
use service_balancer::observability::{logging, metrics, StatsTicker};
use service_balancer::{BalancerFactory, ServiceBalancer};

#[derive(Parser)]
#[command(name = "service-balancer")]
#[command(about = "Client-side load balancer agent", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => BalancerConfig::default(),
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "service-balancer starting");

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let discovery = Arc::new(StaticDiscovery::from_config(&config.discovery));
    let factory = BalancerFactory::from_config(&config, discovery.clone());

    let mut balancers: Vec<ServiceBalancer> = Vec::new();
    for service in config.service_names() {
        let balancer = factory.create(&service)?;
        balancer.start().await?;
        balancers.push(balancer);
    }
    tracing::info!(services = balancers.len(), "All balancers started");

    // The watcher handle must outlive the loop below.
    let (_watcher, mut updates) = match &cli.config {
        Some(path) => {
            let (watcher, rx) = ConfigWatcher::new(path);
            (Some(watcher.run()?), Some(rx))
        }
        None => (None, None),
    };

    let mut stats_tick = StatsTicker::from_secs(config.observability.stats_interval_secs);
    if !stats_tick.is_enabled() {
        tracing::info!("Periodic stats logging disabled");
    }

    let termination = wait_for_termination();
    tokio::pin!(termination);

    loop {
        tokio::select! {
            signal = &mut termination => {
                tracing::info!(signal, "Termination signal received");
                break;
            }
            _ = stats_tick.tick() => {
                for balancer in &balancers {
                    match serde_json::to_string(&balancer.stats()) {
                        Ok(json) => tracing::info!(service = balancer.service(), stats = %json, "Balancer stats"),
                        Err(e) => tracing::warn!(error = %e, "Failed to serialize stats"),
                    }
                }
            }
            update = recv_update(&mut updates) => {
                match update {
                    Some(new_config) => apply_update(&discovery, &balancers, &new_config).await,
                    None => {
                        tracing::warn!("Config watcher closed, hot reload disabled");
                        updates = None;
                    }
                }
            }
        }
    }

    for balancer in &balancers {
        if let Err(e) = balancer.stop().await {
            tracing::warn!(service = balancer.service(), error = %e, "Stop failed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

/// Next config update, or pending forever when hot reload is off.
async fn recv_update(
    updates: &mut Option<tokio::sync::mpsc::UnboundedReceiver<BalancerConfig>>,
) -> Option<BalancerConfig> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn apply_update(discovery: &StaticDiscovery, balancers: &[ServiceBalancer], config: &BalancerConfig) {
    discovery.replace_all(&config.discovery);

    for balancer in balancers {
        if let Some(lb) = balancer.as_managed() {
            if let Err(e) = lb.refresh().await {
                tracing::warn!(service = lb.service(), error = %e, "Refresh after reload failed");
            }
        }
    }

    let running: Vec<&str> = balancers.iter().map(|b| b.service()).collect();
    for name in config.service_names() {
        if !running.contains(&name.as_str()) {
            tracing::warn!(service = %name, "New service in reloaded config ignored until restart");
        }
    }

    tracing::info!("Static discovery reloaded");
}
