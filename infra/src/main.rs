//! Auth node: answers auth commands on the command bus and keeps the refresh
//! token store clean.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use conn_core::repositories::{InMemoryRefreshTokenStore, RefreshTokenStore};
use conn_core::services::clock::SystemClock;
use conn_core::services::messaging::{
    AuthCommandClient, AuthCommandHandler, CommandDispatcher, CommandResponder, DispatcherConfig,
};
use conn_core::services::token::{
    JwtTokenCodec, TokenCleanupConfig, TokenCleanupService, TokenLifecycleConfig,
    TokenLifecycleManager,
};
use conn_infra::{telemetry, InMemoryCommandBus};
use conn_shared::{AppConfig, Environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let environment = Environment::from_env();
    dotenvy::from_filename(environment.env_file()).ok();
    dotenvy::dotenv().ok();

    let config = AppConfig::load_for(environment).context("failed to load configuration")?;
    telemetry::init_tracing(&config.logging)?;

    info!(
        environment = %config.environment,
        service = %config.messaging.service_name,
        "Starting auth node"
    );
    if config.token.is_using_default_secret() {
        warn!("Using the default JWT secret; set CONN__TOKEN__JWT_SECRET");
    }

    #[cfg(feature = "mysql")]
    {
        if config.database.is_configured() {
            let pool = conn_infra::DatabasePool::new(config.database.clone()).await?;
            let store = Arc::new(conn_infra::MySqlRefreshTokenStore::new(pool.get_pool().clone()));
            store.ensure_schema().await?;

            run(&config, store).await?;
            pool.close().await;
            return Ok(());
        }
    }

    info!("No database configured, keeping refresh tokens in memory");
    run(&config, Arc::new(InMemoryRefreshTokenStore::new())).await
}

async fn run<S: RefreshTokenStore + 'static>(config: &AppConfig, store: Arc<S>) -> anyhow::Result<()> {
    let messaging = &config.messaging;

    let manager = Arc::new(TokenLifecycleManager::new(
        store,
        Arc::new(JwtTokenCodec::new(&config.token.jwt_secret, config.token.issuer.as_str())),
        Arc::new(SystemClock),
        TokenLifecycleConfig::from(&config.token),
    ));

    let bus = Arc::new(InMemoryCommandBus::new());

    Arc::new(AuthCommandHandler::new(manager.clone(), messaging.service_name.as_str()))
        .install(CommandResponder::new(
            bus.clone(),
            messaging.service_name.as_str(),
            messaging.command_topic.as_str(),
        ))
        .start()
        .await?;

    let dispatcher = Arc::new(CommandDispatcher::new(bus.clone(), DispatcherConfig::from(messaging)));
    let sweeper = dispatcher.start().await?;

    let cleanup = Arc::new(TokenCleanupService::new(
        manager.clone(),
        TokenCleanupConfig::from(&config.token),
    ))
    .spawn();

    let status = AuthCommandClient::new(dispatcher.clone())
        .health_check()
        .await
        .context("self health check failed")?;
    info!(status = %status.status, service = %status.service, "Auth node ready");

    tokio::signal::ctrl_c().await?;
    info!("Shutting down auth node");

    if let Some(worker) = cleanup {
        worker.stop().await?;
    }
    sweeper.stop().await?;
    bus.shutdown().await;

    Ok(())
}
