//! Guildpolls server entry point.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Router, middleware};
use guildpolls_api::{AppState, identity_middleware, router as api_router};
use guildpolls_common::Config;
use guildpolls_core::{
    DiscordIdentityProvider, GuildService, MembershipCache, PermissionService, PollQueryService,
    TagService,
};
use guildpolls_db::repositories::{GuildInfoRepository, PollRepository, PollTagRepository};
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
///
/// On Unix systems, this listens for both SIGINT (Ctrl+C) and SIGTERM.
/// On Windows, this only listens for Ctrl+C.
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
            Ok(mut sigterm) => {
                sigterm.recv().await;
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
        () = ctrl_c => {
            info!("Received SIGINT, initiating graceful shutdown...");
        },
        () = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown...");
        },
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "guildpolls=debug,tower_http=debug".into()),
        )
        .init();

    info!("Starting guildpolls server...");

    // Load configuration
    let config = Config::load()?;
    let base_url = Url::parse(&config.server.url)?;
    info!(guild_id = config.guild.id, "Serving guild");

    // Connect to database
    let db = guildpolls_db::init(&config).await?;
    info!("Connected to database");

    // Run migrations
    info!("Running database migrations...");
    guildpolls_db::migrate(&db).await?;
    info!("Migrations completed");

    // Initialize repositories
    let db = Arc::new(db);
    let poll_repo = Arc::new(PollRepository::new(Arc::clone(&db)));
    let tag_repo = Arc::new(PollTagRepository::new(Arc::clone(&db)));
    let guild_repo = Arc::new(GuildInfoRepository::new(Arc::clone(&db)));

    // Membership cache and its sweep
    let membership_cache = MembershipCache::new(config.membership.ttl());
    let sweeper = membership_cache.spawn_sweeper(config.membership.sweep_interval());

    // Initialize services
    let query_timeout = config.query.timeout();
    let identity = Arc::new(DiscordIdentityProvider::new(config.discord.api_base.clone()));
    let permissions = PermissionService::new(
        guild_repo.clone(),
        identity,
        membership_cache,
        config.guild.id,
        config.discord.request_timeout(),
        query_timeout,
    );

    let state = AppState {
        poll_service: PollQueryService::new(poll_repo, permissions.clone(), query_timeout),
        tag_service: TagService::new(tag_repo, permissions.clone(), query_timeout),
        guild_service: GuildService::new(guild_repo, permissions, query_timeout),
        base_url,
    };

    // Build router
    let app = Router::new()
        .nest("/api/v1", api_router())
        .layer(middleware::from_fn(identity_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state);

    // Start server with graceful shutdown
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper.cancel();
    info!("Server shutdown complete");
    Ok(())
}
