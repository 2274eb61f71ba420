// # zonesyncd - Zone Synchronization Runner
//
// Thin integration layer: reads configuration from the environment, wires
// store, locks and the Route 53 client into a `Synchronizer`, and runs one
// pass (or one pass per interval) over the selected accounts. All
// synchronization logic lives in zonesync-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Operation
// - `ZONESYNC_OPERATION`: pull, push or bidirectional (default: pull)
// - `ZONESYNC_MODE`: local_wins, remote_wins or merge (bidirectional only,
//   default: local_wins)
// - `ZONESYNC_DRY_RUN`: true/false (default: false)
//
// ### Selection
// - `ZONESYNC_ACCOUNTS`: Comma-separated account names, provider ids or
//   uuids (default: every enabled account)
// - `ZONESYNC_ZONE`: Restrict the pass to one hosted zone id
//
// ### Storage
// - `ZONESYNC_STORE_PATH`: JSON mirror file. Without it the mirror lives in
//   memory and holds one `default` account using the `AWS_*` variables.
// - `ZONESYNC_LOCK_DIR`: Lock file directory (default: in-process locks)
// - `ZONESYNC_LOCK_KEYSPACE`: per_operation or shared
// - `ZONESYNC_CLIENT_CACHE`: true/false (default: true)
//
// ### Runner
// - `ZONESYNC_INTERVAL_SECS`: Repeat the pass until SIGINT/SIGTERM
// - `ZONESYNC_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Output
//
// One JSON line per account on stdout:
// `{"account": "...", "operation": "...", "report": {...}}`
//
// ## Example
//
// ```bash
// export ZONESYNC_STORE_PATH=/var/lib/zonesync/mirror.json
// export ZONESYNC_LOCK_DIR=/run/zonesync
// export ZONESYNC_OPERATION=bidirectional
// export ZONESYNC_MODE=merge
// export ZONESYNC_DRY_RUN=true
//
// zonesyncd
// ```

use anyhow::{Context, Result};
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

use zonesync_core::model::{Account, CredentialKind, HostedZone};
use zonesync_core::sync::{SyncMode, SyncOperation};
use zonesync_core::traits::{
    AccountRepository, LockStore, RemoteClientFactory, SyncStore, ZoneRepository,
};
use zonesync_core::{
    AccountResolver, ClientCache, FileLockStore, FileStore, LockGate, LockKeyspace,
    LockStoreConfig, MemoryLockStore, MemoryStore, StoreConfig, SyncConfig, Synchronizer,
};

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ZonesyncExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ZonesyncExitCode> for ExitCode {
    fn from(code: ZonesyncExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    operation: SyncOperation,
    mode: String,
    dry_run: bool,
    accounts: Option<String>,
    zone: Option<String>,
    sync: SyncConfig,
    interval_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let operation = match var("ZONESYNC_OPERATION") {
            Some(op) => op
                .parse::<SyncOperation>()
                .with_context(|| format!("ZONESYNC_OPERATION '{}' is not valid", op))?,
            None => SyncOperation::Pull,
        };

        let mut sync = SyncConfig::new();
        if let Some(path) = var("ZONESYNC_STORE_PATH") {
            sync.store = StoreConfig::File { path };
        }
        if let Some(dir) = var("ZONESYNC_LOCK_DIR") {
            sync.lock_store = LockStoreConfig::File { dir };
        }
        if let Some(keyspace) = var("ZONESYNC_LOCK_KEYSPACE") {
            sync.locks.keyspace = keyspace
                .parse::<LockKeyspace>()
                .with_context(|| format!("ZONESYNC_LOCK_KEYSPACE '{}' is not valid", keyspace))?;
        }
        if let Some(cache) = var("ZONESYNC_CLIENT_CACHE") {
            sync.client_cache.enabled = parse_bool("ZONESYNC_CLIENT_CACHE", &cache)?;
        }

        Ok(Self {
            operation,
            mode: var("ZONESYNC_MODE").unwrap_or_else(|| "local_wins".to_string()),
            dry_run: match var("ZONESYNC_DRY_RUN") {
                Some(v) => parse_bool("ZONESYNC_DRY_RUN", &v)?,
                None => false,
            },
            accounts: var("ZONESYNC_ACCOUNTS"),
            zone: var("ZONESYNC_ZONE"),
            sync,
            interval_secs: var("ZONESYNC_INTERVAL_SECS")
                .map(|s| {
                    s.parse()
                        .with_context(|| format!("ZONESYNC_INTERVAL_SECS '{}' is not a number", s))
                })
                .transpose()?,
            log_level: var("ZONESYNC_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.sync.validate()?;

        if self.operation == SyncOperation::Bidirectional {
            self.mode
                .parse::<SyncMode>()
                .with_context(|| "ZONESYNC_MODE must be local_wins, remote_wins or merge")?;
        }

        if let StoreConfig::File { path } = &self.sync.store
            && let Some(parent) = std::path::Path::new(path).parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            anyhow::bail!(
                "ZONESYNC_STORE_PATH parent directory does not exist: {}. \
                Create it first: sudo mkdir -p {}",
                parent.display(),
                parent.display()
            );
        }

        if let Some(interval) = self.interval_secs
            && !(10..=86_400).contains(&interval)
        {
            anyhow::bail!(
                "ZONESYNC_INTERVAL_SECS must be between 10 and 86400 seconds. Got: {}",
                interval
            );
        }

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => anyhow::bail!(
                "ZONESYNC_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", name, value),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return ZonesyncExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // Logs go to stderr so stdout carries only reports
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ZonesyncExitCode::ConfigError.into();
    }

    info!(
        operation = %config.operation,
        dry_run = config.dry_run,
        "Starting zonesyncd"
    );

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ZonesyncExitCode::RuntimeError.into();
        }
    };

    rt.block_on(async {
        let runner = match Runner::build(&config).await {
            Ok(runner) => runner,
            Err(e) => {
                error!("Startup error: {:#}", e);
                return ZonesyncExitCode::ConfigError;
            }
        };

        match runner.run(&config).await {
            Ok(()) => ZonesyncExitCode::CleanShutdown,
            Err(e) => {
                error!("Runtime error: {:#}", e);
                ZonesyncExitCode::RuntimeError
            }
        }
    })
    .into()
}

/// Everything one pass needs
struct Runner {
    store: Arc<dyn SyncStore>,
    resolver: AccountResolver,
    synchronizer: Synchronizer,
}

impl Runner {
    async fn build(config: &Config) -> Result<Self> {
        let (store, accounts): (Arc<dyn SyncStore>, Arc<dyn AccountRepository>) =
            match &config.sync.store {
                StoreConfig::Memory => {
                    let store = Arc::new(MemoryStore::new());
                    store
                        .save_account(Account::new("default", CredentialKind::Env))
                        .await?;
                    warn!("ZONESYNC_STORE_PATH not set; mirror is kept in memory only");
                    (
                        store.clone() as Arc<dyn SyncStore>,
                        store as Arc<dyn AccountRepository>,
                    )
                }
                StoreConfig::File { path } => {
                    let store = Arc::new(FileStore::new(path).await?);
                    info!("Using mirror file {}", path);
                    (
                        store.clone() as Arc<dyn SyncStore>,
                        store as Arc<dyn AccountRepository>,
                    )
                }
            };

        let lock_store: Arc<dyn LockStore> = match &config.sync.lock_store {
            LockStoreConfig::Memory => Arc::new(MemoryLockStore::new()),
            LockStoreConfig::File { dir } => Arc::new(FileLockStore::new(dir).await?),
        };
        let locks = LockGate::new(lock_store, config.sync.locks.clone());

        let clients = Arc::new(ClientCache::new(
            client_factory()?,
            config.sync.client_cache.enabled,
        ));

        Ok(Self {
            synchronizer: Synchronizer::new(clients, Arc::clone(&store), locks),
            resolver: AccountResolver::new(accounts),
            store,
        })
    }

    /// Run one pass, or one pass per interval until a shutdown signal
    async fn run(&self, config: &Config) -> Result<()> {
        let Some(secs) = config.interval_secs else {
            return self.pass(config).await;
        };

        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        let shutdown = wait_for_shutdown();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                signal = &mut shutdown => {
                    info!("Received shutdown signal: {}", signal?);
                    return Ok(());
                }
                _ = ticker.tick() => {
                    // A failed pass is retried on the next tick
                    if let Err(e) = self.pass(config).await {
                        error!("Pass failed: {:#}", e);
                    }
                }
            }
        }
    }

    /// One synchronization pass over the selected accounts
    async fn pass(&self, config: &Config) -> Result<()> {
        let accounts = match &config.accounts {
            Some(filter) => self.resolver.resolve_accounts(Some(filter)).await?,
            None => self.resolver.enabled_accounts().await?,
        };

        if accounts.is_empty() {
            warn!("No accounts selected");
            return Ok(());
        }

        let mut failures = 0usize;
        for account in &accounts {
            if !account.is_enabled() {
                warn!(account = %account, "Skipping disabled account");
                continue;
            }

            match self.sync_account(config, account).await {
                Ok(report) => println!("{}", report),
                Err(e) if e.is_lock_contention() => {
                    warn!(account = %account, "Skipped: {}", e);
                }
                Err(e) => {
                    error!(account = %account, "Synchronization failed: {}", e);
                    failures += 1;
                }
            }
        }

        if failures > 0 {
            anyhow::bail!("{} of {} account(s) failed", failures, accounts.len());
        }
        Ok(())
    }

    async fn sync_account(
        &self,
        config: &Config,
        account: &Account,
    ) -> zonesync_core::Result<serde_json::Value> {
        let zone = match &config.zone {
            Some(remote_id) => Some(
                self.store
                    .find_one_by_account_and_remote_id(account.id(), remote_id)
                    .await?
                    .unwrap_or_else(|| HostedZone::new(account.id(), remote_id.as_str())),
            ),
            None => None,
        };
        let zone = zone.as_ref();

        let report = match config.operation {
            SyncOperation::Pull => serde_json::to_value(
                self.synchronizer
                    .pull_from_remote(account, zone, config.dry_run)
                    .await?,
            )?,
            SyncOperation::Push => serde_json::to_value(
                self.synchronizer
                    .push_to_remote(account, zone, config.dry_run)
                    .await?,
            )?,
            SyncOperation::Bidirectional => serde_json::to_value(
                self.synchronizer
                    .bidirectional_sync(account, zone, &config.mode, config.dry_run)
                    .await?,
            )?,
        };

        Ok(serde_json::json!({
            "account": account.name(),
            "operation": config.operation.as_str(),
            "report": report,
        }))
    }
}

#[cfg(feature = "route53")]
fn client_factory() -> Result<Arc<dyn RemoteClientFactory>> {
    Ok(Arc::new(zonesync_provider_route53::Route53ClientFactory))
}

#[cfg(not(feature = "route53"))]
fn client_factory() -> Result<Arc<dyn RemoteClientFactory>> {
    anyhow::bail!("zonesyncd was built without a remote provider; enable the `route53` feature")
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
