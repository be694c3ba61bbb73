/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → 依存生成 (AuthService, RoutePolicy, TokenExchangeClient) → Router 組み立て
 * - Middleware の適用 (auth gate / CORS / HTTP)
 * - axum::serve() で起動
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware;
use crate::middleware::auth::policy::default_policy;
use crate::services::auth::build_auth_service;
use crate::services::idp::TokenExchangeClient;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,idp_resource_server=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    // Keep the default hook as a fallback (prints to stderr with location/payload).
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Always surface panics via tracing so they don't get "lost"
        // (stderr can be hidden depending on how the process is launched.)
        tracing::error!(?info, "panic");

        // In development, fail fast: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    let abort_on_panic = !config.app_env.is_production();
    init_panic_hook(abort_on_panic);

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let state = build_state(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

/// Build process-level services once and inject them into the shared application state.
pub fn build_state(config: &Config) -> Result<AppState> {
    let auth = build_auth_service(config).context("failed to build access token verifier")?;

    let token_exchange = TokenExchangeClient::new(
        &config.idp,
        Duration::from_secs(config.token_exchange_timeout_seconds),
    )
    .context("failed to build token exchange client")?;

    tracing::info!(
        issuer = auth.issuer(),
        audience = auth.audience().unwrap_or("-"),
        token_endpoint = %token_exchange.endpoint(),
        "identity provider configured"
    );

    Ok(AppState::new(
        auth,
        Arc::new(default_policy()),
        Arc::new(token_exchange),
    ))
}

pub fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes();
    let router = middleware::auth::access::apply(router, state.clone()).with_state(state);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router, config)
}
