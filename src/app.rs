/*
 * Responsibility
 * - Load config, build collaborators, assemble the Router
 * - Apply middleware (gate, session, headers, http)
 * - Start serving with axum::serve()
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::{Config, HttpLimits};
use crate::middleware;
use crate::services::directory::{SecurityFile, StaticAuthenticator};
use crate::services::events::{BroadcastNotifier, spawn_audit_log};
use crate::services::roles::{RoleAuthorizer, RouteRoles};
use crate::services::session::{MemorySessionStore, SessionStore, ValkeySessionStore};
use crate::shield::{FormShield, Notifier, ShieldConfig};
use crate::state::AppState;

const EVENT_CHANNEL_CAPACITY: usize = 256;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,form_shield=debug,audit=info cargo run
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
        tracing::error!(?info, "panic");

        // Development: crash the whole process so it gets noticed.
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
    let shield_config = ShieldConfig::from_env()?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting form-shield in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let security = SecurityFile::load(&config.security_file)?;
    tracing::info!(
        users = security.users.len(),
        rules = security.rules.len(),
        file = %config.security_file.display(),
        "security file loaded"
    );

    let notifier = BroadcastNotifier::new(EVENT_CHANNEL_CAPACITY);
    // Runs until the last sender (the gate) is dropped.
    let _audit = spawn_audit_log(notifier.subscribe());

    let shield = build_shield(shield_config, &security, Arc::new(notifier))?
        .with_login_body_limit(config.http.body_limit_bytes);
    let sessions = build_session_store(&config).await?;

    let state = AppState::new(
        Arc::new(shield),
        sessions,
        config.session_ttl,
        config.app_env.is_production(),
    );
    let app = build_router(state, &config.http);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("bind {}", config.addr))?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Wire the gate to the security-file collaborators.
pub fn build_shield(
    config: ShieldConfig,
    security: &SecurityFile,
    notifier: Arc<dyn Notifier>,
) -> Result<FormShield> {
    let authenticator = StaticAuthenticator::new(security.users.clone())?;
    let roles = RouteRoles::new(&security.rules).context("invalid role rule pattern")?;
    let authorizer = RoleAuthorizer::new(security.denied_target.clone());

    Ok(FormShield::new(
        Arc::new(config),
        Arc::new(authenticator),
        Arc::new(authorizer),
        Arc::new(roles),
        notifier,
    ))
}

async fn build_session_store(config: &Config) -> Result<Arc<dyn SessionStore>> {
    let store: Arc<dyn SessionStore> = match &config.session_backend_url {
        Some(url) => Arc::new(
            ValkeySessionStore::new(url)
                .await
                .context("connect session backend")?,
        ),
        None => {
            tracing::warn!("SESSION_BACKEND_URL not set; sessions are kept in memory");
            Arc::new(MemorySessionStore::new())
        }
    };

    tracing::info!(backend = store.backend_name(), "session store ready");
    Ok(store)
}

/// Routes plus every layer, innermost first: gate, session, headers, http.
pub fn build_router(state: AppState, limits: &HttpLimits) -> Router {
    let router = api::routes(state.shield.config()).with_state(state.clone());

    let router = middleware::shield::apply(router, state.clone());
    let router = middleware::session::apply(router, state);
    let router = middleware::security_headers::apply(router);
    middleware::http::apply(router, limits)
}
