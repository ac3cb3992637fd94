use anyhow::{Context, Result};
use axum::serve;
use insights::api::textgen::{OllamaClient, TextGenerator};
use insights::core::config::{Config, StoreBackend};
use insights::core::routes::build_router;
use insights::core::startup::{connect_mysql, promote_admins, run_migrations};
use insights::core::state::AppState;
use insights::core::tracing_init::init_tracing;
use insights::session::store::SessionRegistry;
use insights::stores::memory::{MemoryContentStore, MemoryCredentialStore};
use insights::stores::mysql::MySqlStore;
use insights::stores::{ContentStore, CredentialStore};
use sqlx::mysql::MySqlPool;
use std::env;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{debug, error, info, warn, Level};

fn main() -> Result<()> {
    // A missing .env file is fine; the environment may already be set
    dotenvy::dotenv().ok();

    let args: Vec<String> = env::args().collect();

    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("config.toml")
    };

    // Load and validate configuration
    let config = Config::from_file(&config_path).context(format!(
        "Failed to load configuration from '{}'. \
        If this is your first run, copy config.example.toml to config.toml and set the DB_* and SESSION_SECRET variables.",
        config_path.display()
    ))?;

    init_tracing(&config.logging)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.server.num_threads)
        .enable_all()
        .build()
        .context("Failed to build Tokio runtime")?;

    runtime.block_on(async_main(config, config_path))
}

async fn async_main(config: Config, config_path: PathBuf) -> Result<()> {
    info!(
        config_path = %config_path.display(),
        port = config.server.port,
        num_threads = config.server.num_threads,
        backend = ?config.store.backend,
        log_level = %config.logging.level,
        log_format = %config.logging.format,
        "Insights server starting"
    );

    let mut pool: Option<MySqlPool> = None;

    let (credentials, content): (Arc<dyn CredentialStore>, Arc<dyn ContentStore>) =
        match config.store.backend {
            StoreBackend::Mysql => {
                let connected = connect_mysql(&config.database).await?;

                if config.database.run_migrations {
                    run_migrations(&connected).await?;
                }

                let store = Arc::new(MySqlStore::new(connected.clone()));
                pool = Some(connected);
                let credentials: Arc<dyn CredentialStore> = store.clone();
                let content: Arc<dyn ContentStore> = store;
                (credentials, content)
            }
            StoreBackend::Memory => {
                warn!("Using the in-memory store, data will not survive a restart");
                let credentials: Arc<dyn CredentialStore> = Arc::new(MemoryCredentialStore::new());
                let content: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());
                (credentials, content)
            }
        };

    let promoted = promote_admins(credentials.as_ref(), &config.bootstrap.admin_emails).await?;
    if promoted > 0 {
        info!(promoted = promoted, "Bootstrap admins promoted");
    }

    let generator: Option<Arc<dyn TextGenerator>> = match &config.ai {
        Some(ai) => {
            let client: Arc<dyn TextGenerator> = Arc::new(
                OllamaClient::from_config(ai).context("Failed to create text generation client")?,
            );
            info!(endpoint = %ai.endpoint, model = %ai.model, "Text generation enabled");
            Some(client)
        }
        None => {
            info!("No [ai] section, text generation disabled");
            None
        }
    };

    let state = Arc::new(AppState::new(config.clone(), credentials, content, generator));

    spawn_cleanup_task(state.sessions.clone(), config.session.cleanup_interval);

    info!(
        cleanup_interval_seconds = config.session.cleanup_interval,
        idle_timeout_seconds = config.session.idle_timeout,
        blocked_countries = state.blocked_countries.len(),
        static_dir = %config.server.static_dir.display(),
        "Session cleanup task started"
    );

    // Build the router with middleware
    let app = build_router(state).layer(
        ServiceBuilder::new().layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
        ),
    );

    let addr = format!("0.0.0.0:{}", config.server.port);
    let listener = TcpListener::bind(&addr)
        .await
        .context(format!("Failed to bind TCP listener to {}", addr))?;

    info!(address = %addr, "HTTP server started, waiting for shutdown signal");

    serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    if let Some(pool) = pool {
        pool.close().await;
        info!("Database pool closed");
    }

    info!("Shutting down gracefully");

    Ok(())
}

/// Spawn a background task that periodically drops idle sessions
fn spawn_cleanup_task(sessions: SessionRegistry, cleanup_interval: u64) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(cleanup_interval));

        loop {
            interval.tick().await;

            debug!("Running session cleanup");
            let removed = sessions.cleanup_expired(time::OffsetDateTime::now_utc());

            if removed > 0 {
                info!(
                    removed_sessions = removed,
                    active_sessions = sessions.len(),
                    "Session cleanup completed"
                );
            } else {
                debug!("Session cleanup completed, no idle sessions found");
            }
        }
    });
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }

    info!("Shutdown signal received, starting graceful shutdown");
}
