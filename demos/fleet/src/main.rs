//! fleet: single-process fleet allocation demo for the fleet_dt framework.
//!
//! One coordinator, and per roster vehicle: an in-memory bus, a digital twin
//! serving its control session on `127.0.0.1:base_port+i`, a simulated
//! vehicle on the bus side, and a vehicle agent on the session side.  The
//! run ends when the coordinator drains its task limit or on Ctrl-C; the
//! allocation CSVs and `metrics.json` are written to `--output`.

mod config;
mod sim;


use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing_subscriber::{fmt, EnvFilter};

use fleet_agent::VehicleAgent;
use fleet_bridge::{BridgeClient, Bus, DigitalTwin, InMemoryBus};
use fleet_coord::{AllocationMetrics, CoordinatorBuilder, MetricsSummary};
use fleet_output::{CsvWriter, OutputObserver};
use fleet_protocol::{Address, DirectoryBuilder, Mailbox};
use fleet_routing::{load_network, load_roster, RoutingEngine};

use crate::config::Cli;
use crate::sim::SimulatedVehicle;

const METRICS_FILE: &str = "metrics.json";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);
    let config = cli.fleet_config()?;
    tracing::info!(config = ?config, "fleet starting");

    // ── Inputs ────────────────────────────────────────────────────────────────

    let network = Arc::new(
        load_network(&cli.map, config.weight_salt).with_context(|| format!("loading map {}", cli.map.display()))?,
    );
    let roster = Arc::new(
        load_roster(&cli.roster, &network).with_context(|| format!("loading roster {}", cli.roster.display()))?,
    );
    tracing::info!(nodes = network.node_count(), vehicles = roster.len(), "inputs loaded");
    let engine = Arc::new(RoutingEngine::dijkstra(network.clone(), roster.clone()));

    // ── Directory ─────────────────────────────────────────────────────────────

    let mut dir = DirectoryBuilder::new();
    let coordinator_mailbox = dir.register(Address::Coordinator);
    let mailboxes: Vec<Mailbox> = roster.ids().map(|id| dir.register(Address::Vehicle(id))).collect();
    let directory = dir.build();

    // ── Per-vehicle stack ─────────────────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut tasks = JoinSet::new();

    for (index, (spec, mailbox)) in roster.iter().zip(mailboxes).enumerate() {
        let id = spec.id;
        let bus: Arc<dyn Bus> = Arc::new(InMemoryBus::new());

        let twin = DigitalTwin::bind(id, cli.bridge_addr(index)?, bus.clone(), config.bridge.clone())
            .await
            .with_context(|| format!("starting bridge for vehicle {}", id.0))?;
        let addr = twin.local_addr()?;
        tasks.spawn(twin.run(shutdown_rx.clone()));

        let vehicle = SimulatedVehicle::new(spec, network.clone(), bus, cli.step());
        tasks.spawn(vehicle.run(shutdown_rx.clone()));

        let (client, events) = BridgeClient::connect(addr, id, config.agent.hop_ack_timeout())
            .await
            .with_context(|| format!("connecting agent {} to its bridge", id.0))?;
        let agent = VehicleAgent::new(id, engine.clone(), directory.clone(), Arc::new(client), config.agent.clone())?;
        tasks.spawn(agent.run(mailbox, events, shutdown_rx.clone()));

        tracing::info!(vehicle = %id, %addr, node = %spec.start_node, speed = spec.speed, "vehicle online");
    }

    // ── Coordinator ───────────────────────────────────────────────────────────

    let writer = CsvWriter::new(&cli.output).with_context(|| format!("creating {}", cli.output.display()))?;
    let coordinator = CoordinatorBuilder::new(config.coordinator.clone(), directory)
        .network(&network, &roster)
        .observer((AllocationMetrics::new(roster.ids()), OutputObserver::new(writer)))
        .build(coordinator_mailbox)?;

    let mut run = tokio::spawn(coordinator.run(shutdown_rx.clone()));
    let core = tokio::select! {
        core = &mut run => core.context("coordinator task failed")?,
        () = shutdown_signal() => {
            tracing::info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
            run.await.context("coordinator task failed")?
        }
    };

    let _ = shutdown_tx.send(true);
    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::warn!(error = %e, "actor task failed");
        }
    }

    // ── Outputs ───────────────────────────────────────────────────────────────

    let (metrics, mut output) = core.into_observer();
    output.finish();
    if let Some(e) = output.take_error() {
        tracing::error!(error = %e, "allocation output incomplete");
    }

    let summary = metrics.summary();
    write_summary(&cli.output.join(METRICS_FILE), &summary)?;
    tracing::info!(
        issued = summary.tasks_issued,
        completed = summary.tasks_completed,
        rejected = summary.tasks_rejected,
        gini = summary.gini,
        output = %cli.output.display(),
        "fleet finished"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if json {
        fmt().with_env_filter(filter).json().init();
    } else {
        fmt().with_env_filter(filter).init();
    }
}

fn write_summary(path: &Path, summary: &MetricsSummary) -> Result<()> {
    let json = serde_json::to_vec_pretty(summary)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
