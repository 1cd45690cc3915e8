//! Offer negotiation server.

use anyhow::Context;
use clap::Parser;
use offer_negotiation::api::rest::{AppState, create_router};
use offer_negotiation::application::ports::{
    EventPublisher, IdentityProvider, ListingLookup, Notifier,
};
use offer_negotiation::application::services::{NegotiationEngine, OutboundDispatcher};
use offer_negotiation::config::{AppConfig, LoggingConfig};
use offer_negotiation::infrastructure::events::TracingEventPublisher;
use offer_negotiation::infrastructure::identity::JwtIdentityProvider;
use offer_negotiation::infrastructure::listings::{HttpListingLookup, InMemoryListingLookup};
use offer_negotiation::infrastructure::notifications::{LogNotifier, WebhookNotifier};
use offer_negotiation::infrastructure::persistence::in_memory::InMemoryNegotiationStore;
use offer_negotiation::infrastructure::persistence::postgres::PostgresNegotiationStore;
use offer_negotiation::infrastructure::persistence::{OfferRepository, TransactionRepository};
use sqlx::postgres::PgPoolOptions;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Offer negotiation REST server.
#[derive(Debug, Parser)]
#[command(name = "offer-negotiation", version, about)]
struct Args {
    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address to bind, overriding `server.bind`.
    #[arg(short, long)]
    bind: Option<String>,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn build_store(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn OfferRepository>, Arc<dyn TransactionRepository>)> {
    let Some(url) = config.database.url.as_deref() else {
        info!("no database configured, using in-memory store");
        let store = InMemoryNegotiationStore::new();
        return Ok((Arc::new(store.clone()), Arc::new(store)));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.engine.store_timeout())
        .connect(url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PostgresNegotiationStore::new(pool);
    if config.database.run_migrations {
        store.migrate().await.context("failed to run migrations")?;
    }
    info!(max_connections = config.database.max_connections, "using Postgres store");
    Ok((Arc::new(store.clone()), Arc::new(store)))
}

fn build_listings(config: &AppConfig) -> anyhow::Result<Arc<dyn ListingLookup>> {
    match config.listings.base_url.as_deref() {
        Some(url) => {
            info!(base_url = url, "using HTTP listing lookup");
            Ok(Arc::new(
                HttpListingLookup::new(url, config.listings.timeout_ms)
                    .context("failed to build listing client")?,
            ))
        }
        None => {
            tracing::warn!("no listing service configured, every property lookup will miss");
            Ok(Arc::new(InMemoryListingLookup::new()))
        }
    }
}

fn build_notifier(config: &AppConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match config.notifications.webhook_url.as_deref() {
        Some(url) => Ok(Arc::new(
            WebhookNotifier::new(
                url,
                config.notifications.webhook_token.as_deref(),
                config.notifications.timeout_ms,
            )
            .context("failed to build webhook client")?,
        )),
        None => Ok(Arc::new(LogNotifier::new())),
    }
}

#[cfg(feature = "nats")]
async fn build_publisher(config: &AppConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    use offer_negotiation::infrastructure::events::NatsEventPublisher;

    match config.events.nats_url.as_deref() {
        Some(url) => {
            let publisher = NatsEventPublisher::connect(url, config.events.subject_prefix.clone())
                .await
                .context("failed to connect to NATS")?;
            info!(url, "publishing domain events to NATS");
            Ok(Arc::new(publisher))
        }
        None => Ok(Arc::new(TracingEventPublisher::new())),
    }
}

#[cfg(not(feature = "nats"))]
#[allow(clippy::unused_async)]
async fn build_publisher(config: &AppConfig) -> anyhow::Result<Arc<dyn EventPublisher>> {
    if config.events.nats_url.is_some() {
        tracing::warn!("events.nats_url is set but the nats feature is disabled");
    }
    Ok(Arc::new(TracingEventPublisher::new()))
}

fn spawn_expiry_sweeper(engine: Arc<NegotiationEngine>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = engine.expire_stale_offers().await {
                tracing::warn!(error = %e, "expiry sweep failed");
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let mut config = AppConfig::load(args.config.as_deref()).context("invalid configuration")?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    init_tracing(&config.logging);

    if config.auth.jwt_secret.is_empty() {
        anyhow::bail!("auth.jwt_secret must be set");
    }

    let (offers, transactions) = build_store(&config).await?;
    let listings = build_listings(&config)?;
    let outbound = OutboundDispatcher::new(
        build_notifier(&config)?,
        build_publisher(&config).await?,
        config.engine.notify_timeout(),
    );
    let engine = Arc::new(NegotiationEngine::new(
        offers,
        transactions,
        listings,
        outbound,
        config.engine.clone(),
    ));

    if let Some(secs) = config.engine.expiry_sweep_interval_secs {
        info!(interval_secs = secs, "starting expiry sweeper");
        spawn_expiry_sweeper(Arc::clone(&engine), Duration::from_secs(secs));
    }

    let identity: Arc<dyn IdentityProvider> = Arc::new(JwtIdentityProvider::new(
        config.auth.jwt_secret.as_bytes(),
        config.auth.issuer.clone(),
    ));
    let app = create_router(Arc::new(AppState::new(engine, identity)));

    let listener = tokio::net::TcpListener::bind(&config.server.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.server.bind))?;
    info!(address = %config.server.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    info!("server stopped");
    Ok(())
}
