//! # GST Billing Server
//!
//! ## Usage
//! ```bash
//! # Write a starter config with a generated JWT secret
//! gstbill-server --init-config
//!
//! # Run with the default config path, or an explicit one
//! gstbill-server
//! gstbill-server --config ./gstbill.toml
//!
//! # Sign a development token with the configured secret
//! gstbill-server --issue-token owner@shop.in --role admin
//! ```

use std::env;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use chrono::{Duration, Utc};
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use gstbill_core::Role;
use gstbill_db::{BillingService, BillingStore, Database, MemoryStore, SqliteStore};
use gstbill_server::auth::JwtManager;
use gstbill_server::config::CONFIG_PATH_ENV;
use gstbill_server::{router, AppState, ServerConfig, StorageBackend};

/// Lifetime of tokens minted by `--issue-token`.
const DEV_TOKEN_HOURS: i64 = 12;

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    init_config: bool,
    issue_token: Option<String>,
    role: Option<Role>,
    help: bool,
}

impl CliArgs {
    fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut parsed = CliArgs::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    parsed.config = Some(PathBuf::from(args.next().context("--config needs a path")?));
                }
                "--init-config" => parsed.init_config = true,
                "--issue-token" => {
                    parsed.issue_token = Some(args.next().context("--issue-token needs an email")?);
                }
                "--role" => {
                    let role = args.next().context("--role needs admin or staff")?;
                    parsed.role = Some(role.parse()?);
                }
                "--help" | "-h" => parsed.help = true,
                other => bail!("unknown argument: {other}"),
            }
        }

        Ok(parsed)
    }
}

fn print_help() {
    println!("GST Billing Server");
    println!();
    println!("Usage: gstbill-server [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>      Config file (default: ${CONFIG_PATH_ENV} or the platform config dir)");
    println!("      --init-config        Write a starter config and exit");
    println!("      --issue-token <EMAIL> Print a signed development token and exit");
    println!("      --role <ROLE>        Role claim for --issue-token (admin|staff)");
    println!("  -h, --help               Show this help message");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse(env::args().skip(1))?;
    if args.help {
        print_help();
        return Ok(());
    }

    let config_path = args
        .config
        .or_else(|| env::var_os(CONFIG_PATH_ENV).map(PathBuf::from));

    if args.init_config {
        let mut config = ServerConfig::default();
        config.auth.jwt_secret = format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple());
        let path = config.save(config_path).context("writing config")?;
        println!("Wrote {}", path.display());
        return Ok(());
    }

    let config = ServerConfig::load(config_path).context("loading configuration")?;
    init_tracing(&config.logging.filter);

    let jwt = JwtManager::new(&config.auth.jwt_secret);

    if let Some(email) = args.issue_token {
        let token = jwt.issue(
            &Uuid::new_v4().to_string(),
            &email,
            args.role,
            Duration::hours(DEV_TOKEN_HOURS),
        )?;
        println!("{token}");
        return Ok(());
    }

    info!(
        backend = %config.storage.backend,
        stock_policy = %config.billing.stock_policy,
        utc_offset_minutes = config.billing.utc_offset_minutes,
        "Configuration loaded"
    );

    let (store, database) = open_store(&config).await?;
    let service = BillingService::new(store, config.service_options()?);
    service
        .initialize(&config.shop.initial_settings(Utc::now()))
        .await
        .context("initializing settings")?;

    let state = AppState::new(service, jwt, config.auth.allow_unapproved);
    if config.auth.allow_unapproved {
        warn!("auth.allow_unapproved is set: any verified token is accepted");
    }

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "Starting HTTP server");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving HTTP")?;

    if let Some(db) = database {
        db.close().await;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// `RUST_LOG` wins; otherwise the configured filter.
fn init_tracing(filter: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .init();
}

/// Opens the configured backend. The SQLite handle is returned too so the
/// pool can be closed on shutdown.
async fn open_store(config: &ServerConfig) -> anyhow::Result<(Arc<dyn BillingStore>, Option<Database>)> {
    match config.storage.backend {
        StorageBackend::Sqlite => {
            let db = Database::new(config.storage.db_config())
                .await
                .with_context(|| format!("opening {}", config.storage.database_path.display()))?;
            info!(path = %config.storage.database_path.display(), "Connected to SQLite");
            Ok((Arc::new(SqliteStore::new(db.clone())), Some(db)))
        }
        StorageBackend::Memory => {
            warn!("Using the memory backend: data is lost on exit");
            Ok((Arc::new(MemoryStore::new()), None))
        }
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown...");
}
