/*
 * Responsibility
 * - tracing / panic hook setup
 * - Config -> identity store -> gate + upstream -> Router
 * - HTTP-level middleware, then axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::{
    api,
    config::Config,
    middleware,
    repos::PgIdentityRepo,
    services::{gate::build_request_gate, upstream::Upstream},
    state::AppState,
};

fn init_tracing() {
    // RUST_LOG wins when set, e.g. RUST_LOG=info,api_gateway=debug,tower_http=debug
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // Development: crash loudly. Production: default hook, keep serving.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting gateway in {:?} mode on {} -> {}",
        config.app_env,
        config.addr,
        config.upstream_url
    );
    tracing::debug!(?config, "loaded configuration");

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_state(config: &Config) -> Result<AppState> {
    // Lazy pool: the gateway starts even if the store is down, and lookups
    // fail with 503 until it comes back.
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.lookup_timeout)
        .connect_lazy(&config.database_url)
        .context("invalid DATABASE_URL")?;

    let lookup = Arc::new(PgIdentityRepo::new(pool));
    let gate = build_request_gate(config, lookup);

    let upstream = Upstream::new(
        config.upstream_url.clone(),
        config.upstream_timeout,
        config.request_body_limit_bytes,
    )?;

    Ok(AppState::new(gate, Arc::new(upstream)))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes(state.clone()).with_state(state);
    middleware::http::apply(router, config)
}
