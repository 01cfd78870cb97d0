//! # TaskDesk API Server
//!
//! Multi-user task management over HTTP: accounts, tasks, assignment and
//! notifications.
//!
//! ## Usage
//!
//! ```bash
//! JWT_SECRET=$(openssl rand -hex 32) STORE_BACKEND=memory cargo run -p taskdesk-api
//! ```
//!
//! Set `LOG_FORMAT=json` for JSON log lines.

use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use taskdesk_api::{
    app::{build_router, AppState},
    config::{Config, StoreBackend},
};
use taskdesk_shared::{
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    mail::{dispatcher::MailDispatcher, smtp::SmtpMailer, LogMailer, Mailer},
    services::identity::{GoogleOAuth, IdentityProvider},
    store::{MemoryStore, PgStore, Store},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // LOG_FORMAT may come from .env, so load it before tracing
    dotenvy::dotenv().ok();
    init_tracing();

    tracing::info!(
        "TaskDesk API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let (store, pool) = build_store(&config).await?;
    tracing::info!(store = store.backend_name(), "Store ready");

    let shutdown = CancellationToken::new();
    let (mail, mail_worker) = MailDispatcher::spawn(build_mailer(&config)?, shutdown.clone());

    let identity_provider = build_identity_provider(&config);

    let bind_address = config.bind_address();
    let state = AppState::new(config, store, mail, identity_provider);
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, draining mail queue...");
    shutdown.cancel();
    if let Err(e) = mail_worker.await {
        tracing::warn!(error = %e, "Mail worker ended abnormally");
    }

    if let Some(pool) = pool {
        close_pool(pool).await;
    }

    tracing::info!("Server stopped");
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "taskdesk_api=debug,taskdesk_shared=debug,tower_http=debug".into());

    let json = std::env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}

/// Postgres (migrated) or in-memory store, plus the pool to close on exit
async fn build_store(config: &Config) -> anyhow::Result<(Arc<dyn Store>, Option<PgPool>)> {
    match config.database.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
            Ok((store, None))
        }
        StoreBackend::Postgres => {
            let url = config
                .database
                .url
                .clone()
                .context("DATABASE_URL is required for the postgres backend")?;

            let pool = create_pool(DatabaseConfig {
                url,
                max_connections: config.database.max_connections,
                ..Default::default()
            })
            .await
            .context("Failed to connect to PostgreSQL")?;

            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            let store: Arc<dyn Store> = Arc::new(PgStore::new(pool.clone()));
            Ok((store, Some(pool)))
        }
    }
}

fn build_mailer(config: &Config) -> anyhow::Result<Arc<dyn Mailer>> {
    match config.mail.credentials() {
        Some((user, pass)) => {
            let mailer = SmtpMailer::new(&config.mail.smtp_host, user, pass)
                .context("Failed to configure SMTP transport")?;
            tracing::info!(host = %config.mail.smtp_host, "SMTP mail enabled");
            Ok(Arc::new(mailer))
        }
        None => {
            tracing::warn!("MAIL_USER/MAIL_PASS not set; outbound mail will only be logged");
            Ok(Arc::new(LogMailer))
        }
    }
}

fn build_identity_provider(config: &Config) -> Option<Arc<dyn IdentityProvider>> {
    match config.oauth.credentials() {
        Some((client_id, client_secret)) => {
            let google = GoogleOAuth::new(client_id, client_secret, config.oauth.redirect_url.clone());
            Some(Arc::new(google))
        }
        None => {
            tracing::info!("Google sign-in disabled: GOOGLE_CLIENT_ID/GOOGLE_CLIENT_SECRET not set");
            None
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
