// # navexd - Navex reconciliation daemon
//
// Thin integration layer over `navex-core`:
// 1. Reading configuration from environment variables
// 2. Opening the host store
// 3. Building the sync engine with the HTTP carrier client
// 4. Running `reconcile_held_orders` on a fixed interval until SIGTERM/SIGINT
//
// ## Configuration
//
// ### Carrier
// - `NAVEX_API_ENDPOINT`: Base URL of the Navex API
// - `NAVEX_API_USERNAME`: Account username
// - `NAVEX_API_KEY`: API key
// - `NAVEX_DESIGNATION`: Default shipment designation (optional)
//
// ### Host Store
// - `NAVEX_STORE_TYPE`: Type of host store (file, memory)
// - `NAVEX_STORE_PATH`: Path to the snapshot file (for file store)
//
// ### Scheduling
// - `NAVEX_RECONCILE_INTERVAL_SECS`: Seconds between passes (60-86400, default 3600)
// - `NAVEX_RUN_ONCE`: Run a single pass and exit (true/false)
// - `NAVEX_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export NAVEX_API_ENDPOINT=https://api.navex.tn
// export NAVEX_API_USERNAME=myshop
// export NAVEX_API_KEY=your_key
// export NAVEX_STORE_TYPE=file
// export NAVEX_STORE_PATH=/var/lib/navex/orders.json
//
// navexd
// ```

use anyhow::Result;
use navex_carrier_http::NavexClientFactory;
use navex_core::traits::{MetaStore, OrderRepository};
use navex_core::{
    CarrierCredentials, EngineConfig, FileHostStore, HostStoreConfig, MemoryHostStore, SyncConfig,
    SyncEngine, SyncEvent,
};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum NavexExitCode {
    CleanShutdown = 0,
    ConfigError = 1,
    RuntimeError = 2,
}

impl From<NavexExitCode> for ExitCode {
    fn from(code: NavexExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

const DEFAULT_RECONCILE_INTERVAL_SECS: u64 = 3600;

/// Application configuration
#[derive(Debug)]
struct Config {
    credentials: CarrierCredentials,
    store_type: String,
    store_path: Option<String>,
    reconcile_interval_secs: u64,
    run_once: bool,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from any variable source
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).unwrap_or_default().trim().to_string();

        let reconcile_interval_secs = match lookup("NAVEX_RECONCILE_INTERVAL_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                anyhow::anyhow!(
                    "NAVEX_RECONCILE_INTERVAL_SECS must be a number of seconds. Got: {}",
                    raw
                )
            })?,
            None => DEFAULT_RECONCILE_INTERVAL_SECS,
        };

        let run_once = match var("NAVEX_RUN_ONCE").to_lowercase().as_str() {
            "" | "0" | "false" | "no" => false,
            "1" | "true" | "yes" => true,
            other => anyhow::bail!("NAVEX_RUN_ONCE must be true or false. Got: {}", other),
        };

        let store_type = match var("NAVEX_STORE_TYPE") {
            s if s.is_empty() => "memory".to_string(),
            s => s.to_lowercase(),
        };

        Ok(Self {
            credentials: CarrierCredentials::new(
                var("NAVEX_API_ENDPOINT"),
                var("NAVEX_API_USERNAME"),
                var("NAVEX_API_KEY"),
            )
            .with_designation(var("NAVEX_DESIGNATION")),
            store_type,
            store_path: lookup("NAVEX_STORE_PATH").map(|s| s.trim().to_string()),
            reconcile_interval_secs,
            run_once,
            log_level: match var("NAVEX_LOG_LEVEL") {
                s if s.is_empty() => "info".to_string(),
                s => s,
            },
        })
    }

    /// Validate the configuration
    ///
    /// Missing credentials are allowed: the daemon then idles, since a
    /// reconciliation pass without credentials does nothing.
    fn validate(&self) -> Result<()> {
        let endpoint = &self.credentials.endpoint;
        if !endpoint.is_empty() && !endpoint.starts_with("https://") && !endpoint.starts_with("http://") {
            anyhow::bail!(
                "NAVEX_API_ENDPOINT must use HTTP or HTTPS scheme. Got: {}",
                endpoint
            );
        }

        match self.store_type.as_str() {
            "file" | "memory" => {}
            _ => anyhow::bail!(
                "NAVEX_STORE_TYPE '{}' is not supported. \
                Supported types: file, memory",
                self.store_type
            ),
        }

        if self.store_type == "file" && self.store_path.as_ref().is_none_or(|p| p.is_empty()) {
            anyhow::bail!(
                "NAVEX_STORE_PATH is required when NAVEX_STORE_TYPE=file. \
                Set it via: export NAVEX_STORE_PATH=/var/lib/navex/orders.json"
            );
        }

        if !(60..=86400).contains(&self.reconcile_interval_secs) {
            anyhow::bail!(
                "NAVEX_RECONCILE_INTERVAL_SECS must be between 60 and 86400 seconds. Got: {}",
                self.reconcile_interval_secs
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "NAVEX_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        self.sync_config().validate()?;
        Ok(())
    }

    fn sync_config(&self) -> SyncConfig {
        let host_store = match self.store_type.as_str() {
            "file" => HostStoreConfig::File {
                path: self.store_path.clone().unwrap_or_default(),
            },
            _ => HostStoreConfig::Memory,
        };
        SyncConfig {
            credentials: self.credentials.clone(),
            host_store,
            engine: EngineConfig {
                reconcile_interval_secs: self.reconcile_interval_secs,
                ..EngineConfig::default()
            },
        }
    }
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return NavexExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return NavexExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NavexExitCode::ConfigError.into();
    }

    info!("Starting navexd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NavexExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(config.sync_config(), config.run_once).await {
            error!("Daemon error: {}", e);
            NavexExitCode::RuntimeError
        } else {
            NavexExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Open the configured host store as its two collaborator handles
async fn open_host_store(
    config: &HostStoreConfig,
) -> Result<(Arc<dyn OrderRepository>, Arc<dyn MetaStore>)> {
    match config {
        HostStoreConfig::File { path } => {
            info!("Host store: file ({})", path);
            let store = Arc::new(FileHostStore::open(path).await?);
            let orders: Arc<dyn OrderRepository> = store.clone();
            let meta: Arc<dyn MetaStore> = store;
            Ok((orders, meta))
        }
        HostStoreConfig::Memory => {
            warn!("Host store: memory (nothing persists across restarts)");
            let store = Arc::new(MemoryHostStore::new());
            let orders: Arc<dyn OrderRepository> = store.clone();
            let meta: Arc<dyn MetaStore> = store;
            Ok((orders, meta))
        }
    }
}

/// Run the daemon
async fn run_daemon(config: SyncConfig, run_once: bool) -> Result<()> {
    let (orders, meta) = open_host_store(&config.host_store).await?;
    let (engine, events) = SyncEngine::new(
        orders,
        meta,
        Arc::new(NavexClientFactory),
        &config.engine,
    )?;
    let drain = tokio::spawn(log_events(events));

    let creds = config.credentials;
    if !creds.is_complete() {
        warn!("Navex credentials incomplete; reconciliation passes will do nothing");
    }

    if run_once {
        reconcile(&engine, &creds).await;
        drop(engine);
        let _ = drain.await;
        return Ok(());
    }

    let period = Duration::from_secs(config.engine.reconcile_interval_secs);
    info!("Reconciling held orders every {:?}", period);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    let shutdown = wait_for_shutdown();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => reconcile(&engine, &creds).await,
            received = &mut shutdown => {
                info!("Received shutdown signal: {}", received?);
                break;
            }
        }
    }

    info!("Shutting down daemon");
    drop(engine);
    let _ = drain.await;
    Ok(())
}

async fn reconcile(engine: &SyncEngine, creds: &CarrierCredentials) {
    match engine.reconcile_held_orders(creds).await {
        Ok(report) => debug!(?report, "Reconciliation pass done"),
        Err(e) => error!("Reconciliation pass failed: {}", e),
    }
}

/// Log sync events until the engine is dropped
async fn log_events(events: mpsc::Receiver<SyncEvent>) {
    let mut stream = ReceiverStream::new(events);
    while let Some(event) = stream.next().await {
        match event {
            SyncEvent::OrderTransitioned { order_id, from, to } => {
                info!(order = %order_id, "Order moved {} -> {}", from, to)
            }
            SyncEvent::ShipmentFailed { order_id, error } => {
                warn!(order = %order_id, "Shipment failed: {}", error)
            }
            other => debug!(event = ?other, "Sync event"),
        }
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
