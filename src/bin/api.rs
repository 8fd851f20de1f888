use anyhow::Result;
use pingback::{
    app_state::AppState,
    config::Config,
    fetcher::{Fetch, HttpFetcher},
    handlers,
    middleware::RateLimit,
    pingback::{
        DirectoryPinger, ExternalUrlsPinger, PingDispatcher, PingWorker,
        dispatcher::DEFAULT_QUEUE_CAPACITY,
    },
    repositories::{ContentRepository, MemoryContentRepository, PgContentRepository},
    xmlrpc::XmlRpcTransport,
};
use sqlx::postgres::PgPoolOptions;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = Config::from_env()?;
    let site = Arc::new(config.site());

    let repository: Arc<dyn ContentRepository> = match config.database_url() {
        Some(database_url) => {
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(database_url)
                .await?;
            sqlx::migrate!("./migrations").run(&pool).await?;
            Arc::new(PgContentRepository::new(pool))
        }
        None => {
            warn!("DATABASE_URL not set, content is kept in memory");
            Arc::new(MemoryContentRepository::new())
        }
    };

    let http = Arc::new(HttpFetcher::new(config.fetch_timeout())?);
    let fetcher: Arc<dyn Fetch> = http.clone();
    let transport: Arc<dyn XmlRpcTransport> = http;

    let directories = config
        .ping_directories()
        .iter()
        .map(|directory| DirectoryPinger::new(directory.clone(), site.clone(), transport.clone()))
        .collect();
    let worker = PingWorker::new(
        repository.clone(),
        ExternalUrlsPinger::new(site.clone(), fetcher.clone(), transport),
        directories,
    );

    let shutdown_token = CancellationToken::new();
    let (dispatcher, dispatcher_handle) =
        PingDispatcher::spawn(worker, DEFAULT_QUEUE_CAPACITY, shutdown_token.clone());

    let state = AppState::new(
        site.clone(),
        repository,
        fetcher,
        dispatcher,
        config.excerpt_length(),
    );
    let app = handlers::router(state, RateLimit::per_minute(config.rate_limit_per_minute()));

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), site = %site.base_url(), "pingback service listening");

    let token = shutdown_token.clone();
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
        }
        info!("Received shutdown signal, initiating graceful shutdown...");
        token.cancel();
    })
    .await?;

    shutdown_token.cancel();
    dispatcher_handle.await?;
    Ok(())
}
