//! Timewarp Backend
//! Mission: Serve accounts, destinations and feedback for the Time Warp site

use anyhow::{Context, Result};
use clap::Parser;
use dotenv::dotenv;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use timewarp_backend::{
    auth::{SqliteUserStore, UserStore},
    build_router,
    config::AppConfig,
    db::Database,
    feedback::mailer::{DisabledMailer, Mailer, SmtpMailer},
    middleware::RateLimitLayer,
    AppState,
};

/// Command-line overrides; anything not given falls back to the environment.
#[derive(Debug, Parser)]
#[command(name = "timewarp", version, about = "Time Warp backend API server")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Interface to bind
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// SQLite database file
    #[arg(long, env = "DATABASE_PATH")]
    database_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize environment and logging
    load_env();
    init_tracing();

    let args = Args::parse();
    let mut config = AppConfig::from_env().context("load configuration")?;
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(path) = args.database_path {
        config.database_path = path;
    }
    debug!(?config, "Configuration loaded");

    info!("🚀 Timewarp backend starting");

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("install Prometheus recorder")?;

    let db = Database::open(&config.database_path)?;
    let users: Arc<dyn UserStore> = Arc::new(SqliteUserStore::new(db.clone()));

    let mailer: Arc<dyn Mailer> = match &config.mail {
        Some(mail) => Arc::new(SmtpMailer::new(mail)?),
        None => {
            warn!("⚠️  EMAIL_HOST not set - feedback submissions will fail");
            Arc::new(DisabledMailer)
        }
    };
    if config.admin_email.is_none() {
        warn!("⚠️  ADMIN_EMAIL not set - feedback has no recipient");
    }

    let limiter = RateLimitLayer::new(config.rate_limit.clone());
    tokio::spawn(rate_limit_cleanup(limiter.clone()));

    info!(
        "🔐 Auth guard mode: {:?}, rate limit: {} req / {:?}",
        config.auth_mode, config.rate_limit.max_requests, config.rate_limit.window
    );

    let state = AppState::new(&config, db, users, mailer).with_metrics(metrics);
    let app = build_router(state, &config, limiter);

    // Start server
    let addr = config.bind_addr();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("🎯 API server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("Server error")?;

    info!("👋 Server stopped");
    Ok(())
}

fn load_env() {
    // 1) Standard dotenv search (cwd + parents)
    let _ = dotenv();

    // 2) Also try the crate root .env when running from elsewhere
    let manifest_env = Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
    if manifest_env.exists() {
        let _ = dotenv::from_path(&manifest_env);
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "timewarp_backend=debug,timewarp=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Drops rate-limit entries for clients that have gone quiet.
async fn rate_limit_cleanup(limiter: RateLimitLayer) {
    let mut ticker = tokio::time::interval(limiter.config().window);
    loop {
        ticker.tick().await;
        let removed = limiter.cleanup();
        if removed > 0 {
            debug!(
                removed,
                remaining = limiter.tracked_clients(),
                "Rate limiter cleanup"
            );
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
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

    info!("🛑 Shutdown signal received");
}
