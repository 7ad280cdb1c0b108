/*
 * Responsibility
 * - Load config -> build dependencies -> assemble the Router
 * - Serve with graceful shutdown (signal or a handler's shutdown error)
 */
use std::panic;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use axum::Router;
use tokio::sync::{mpsc, oneshot};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::error::StartupError;
use crate::middleware::{self, http::TransportLimits};
use crate::services::auth::keys::{parse_algorithm, read_pem_dir};
use crate::services::auth::{
    Authenticator, AuthenticatorOptions, KeyRegistry, MemoryKeyResolver, PrivateKey,
    PublicKeyResolver, RegistryResolver, TimeoutResolver,
};
use crate::state::AppState;
use crate::web::{App, ShutdownSender};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,sales_api=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook() {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Handler panics are recovered by the panic middleware; still surface
        // every panic through tracing so none gets lost on stderr.
        tracing::error!(%info, "panic");
        default_hook(info);
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    init_panic_hook();

    let config = Config::from_env()?;

    tracing::info!(
        "starting API in {:?} mode on {} (build {})",
        config.app_env,
        config.addr,
        config.build
    );

    let state = build_state(&config)?;

    let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<String>(1);
    let app = build_router(&state, shutdown_tx, config.transport);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                stop_rx.await.ok();
            })
            .await
    });

    let app_reason = tokio::select! {
        joined = &mut server => {
            joined.context("server task")?.context("server error")?;
            return Ok(());
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
            None
        }
        reason = shutdown_rx.recv() => reason,
    };

    stop_tx.send(()).ok();

    match tokio::time::timeout(config.shutdown_timeout, &mut server).await {
        Ok(joined) => joined.context("server task")?.context("server error")?,
        Err(_) => {
            server.abort();
            bail!(
                "graceful shutdown did not complete in {:?}",
                config.shutdown_timeout
            );
        }
    }

    if let Some(reason) = app_reason {
        bail!("shutdown requested by the application: {reason}");
    }

    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Load the signing keys and build the authenticator.
///
/// Every `<kid>.pem` in the keys directory becomes a signing key. Public keys
/// come from the public keys directory when configured; otherwise they are
/// derived from the private keys and verification goes through the registry.
pub fn build_state(config: &Config) -> Result<AppState, StartupError> {
    let algorithm = parse_algorithm(&config.auth.algorithm)?;

    let dir = &config.auth.keys_dir;
    let entries = read_pem_dir(dir).map_err(|source| StartupError::ReadKeys {
        dir: dir.clone(),
        source,
    })?;
    if entries.is_empty() {
        return Err(StartupError::NoKeys(dir.clone()));
    }

    let keys = KeyRegistry::new();
    let derive_public = config.auth.public_keys_dir.is_none();

    for (kid, pem) in entries {
        let key = if derive_public {
            PrivateKey::from_pem_with_public(algorithm, &pem)
        } else {
            PrivateKey::from_pem(algorithm, &pem)
        }
        .map_err(|source| StartupError::LoadKey {
            kid: kid.clone(),
            source,
        })?;
        keys.add_key(kid, key);
    }

    let resolver: Arc<dyn PublicKeyResolver> = match &config.auth.public_keys_dir {
        // Verification follows the registry, so removing a kid revokes its tokens.
        None => Arc::new(TimeoutResolver::new(
            RegistryResolver::new(keys.clone()),
            config.auth.resolve_timeout,
        )),
        Some(dir) => {
            let public_keys = MemoryKeyResolver::new();
            let entries = read_pem_dir(dir).map_err(|source| StartupError::ReadKeys {
                dir: dir.clone(),
                source,
            })?;
            for (kid, pem) in entries {
                public_keys
                    .add_pem(kid.clone(), algorithm, &pem)
                    .map_err(|source| StartupError::LoadKey { kid, source })?;
            }
            tracing::info!(
                dir = %dir.display(),
                public_keys = public_keys.len(),
                "public keys loaded"
            );
            Arc::new(TimeoutResolver::new(
                public_keys,
                config.auth.resolve_timeout,
            ))
        }
    };

    tracing::info!(
        algorithm = %config.auth.algorithm,
        kids = ?keys.kids(),
        derive_public,
        "signing keys loaded"
    );

    let auth = Authenticator::with_options(
        &config.auth.algorithm,
        resolver,
        keys,
        AuthenticatorOptions {
            issuer: config.auth.issuer.clone(),
            audience: config.auth.audience.clone(),
            leeway_seconds: config.auth.leeway_seconds,
        },
    )?;

    Ok(AppState::new(
        Arc::new(auth),
        config.build.clone(),
        config.forbidden_log_level,
    ))
}

/// Routes wrapped in the app middleware, then the transport layers.
pub fn build_router(state: &AppState, shutdown: ShutdownSender, limits: TransportLimits) -> Router {
    let app = App::new(shutdown, middleware::app_middleware());
    let router = api::v1::routes(app, state).into_router();

    middleware::http::apply(router, limits)
}
