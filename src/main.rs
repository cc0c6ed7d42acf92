//! StorageCluster Operator
//!
//! Watches StorageCluster resources and converges the storage engine's
//! resources for each of them. Serves liveness, readiness and metrics on
//! the health address.

use anyhow::Context as _;
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use storage_cluster_operator::controlplane::config::{EngineDefaults, DEFAULT_ENGINE_IMAGE};
use storage_cluster_operator::controlplane::controller::{self, Context};
use storage_cluster_operator::server::{self, ServerState};
use storage_cluster_operator::{
    KubeStore, Platform, Readiness, ReconcileMetrics, Reconciler, ReconcilerConfig, TcpProber,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// StorageCluster Operator - converges storage clusters into engine resources
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Watch a single namespace instead of the whole cluster
    #[arg(long, env = "WATCH_NAMESPACE")]
    namespace: Option<String>,

    /// Storage engine image
    #[arg(long, env = "ENGINE_IMAGE", default_value = DEFAULT_ENGINE_IMAGE)]
    engine_image: String,

    /// Platform the cluster runs on
    #[arg(long, env = "PLATFORM", value_enum, default_value_t = Platform::None)]
    platform: Platform,

    /// Number of engine monitors
    #[arg(long, env = "MON_COUNT", default_value = "3")]
    mon_count: u32,

    /// Timeout of each external endpoint probe in seconds
    #[arg(long, env = "PROBE_TIMEOUT_SECS", default_value = "5")]
    probe_timeout_secs: u64,

    /// Namespace the engine installs alerting rules into
    #[arg(long, env = "MONITORING_RULES_NAMESPACE")]
    monitoring_rules_namespace: Option<String>,

    /// Health server bind address
    #[arg(long, env = "HEALTH_ADDR", default_value = "0.0.0.0:8081")]
    health_addr: SocketAddr,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,
}

impl Args {
    fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            engine: EngineDefaults {
                image: self.engine_image.clone(),
                mon_count: self.mon_count,
                ..Default::default()
            },
            platform: self.platform,
            probe_timeout: Duration::from_secs(self.probe_timeout_secs),
            monitoring_rules_namespace: self.monitoring_rules_namespace.clone(),
            ..Default::default()
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args)?;

    info!("Starting StorageCluster Operator");
    info!("  Version: {}", storage_cluster_operator::VERSION);
    info!("  Platform: {}", args.platform);
    info!("  Engine image: {}", args.engine_image);
    info!("  Namespace: {}", args.namespace.as_deref().unwrap_or("*"));

    let readiness = Readiness::new();
    let metrics = ReconcileMetrics::new().context("registering metrics")?;

    // Start health server
    let state = ServerState {
        readiness: readiness.clone(),
        metrics: metrics.clone(),
    };
    let health_addr = args.health_addr;
    tokio::spawn(async move {
        if let Err(e) = server::serve(health_addr, state).await {
            error!("Health server error: {}", e);
        }
    });

    let client = kube::Client::try_default()
        .await
        .context("creating Kubernetes client")?;

    let reconciler = Reconciler::new(
        Arc::new(KubeStore::new(client.clone())),
        args.reconciler_config(),
        Arc::new(TcpProber),
        readiness,
        metrics,
    );

    controller::run(client, args.namespace.clone(), Arc::new(Context::new(reconciler))).await;

    info!("Operator shutdown complete");
    Ok(())
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("kube=info".parse()?)
        .add_directive("tower=warn".parse()?)
        .add_directive("axum=info".parse()?);

    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
    Ok(())
}
