//! One-off outbound pings for a content item, printed as JSON.
//!
//! Usage: `ping <content-id>`; needs `DATABASE_URL` to find the item.

use anyhow::{Context, Result, bail};
use pingback::{
    config::Config,
    fetcher::{Fetch, HttpFetcher},
    pingback::{DirectoryPinger, ExternalUrlsPinger, PingWorker},
    repositories::PgContentRepository,
    xmlrpc::XmlRpcTransport,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let content_id: i64 = std::env::args()
        .nth(1)
        .context("usage: ping <content-id>")?
        .parse()
        .context("content id must be an integer")?;

    let config = Config::from_env()?;
    let Some(database_url) = config.database_url() else {
        bail!("DATABASE_URL must point at the content database");
    };
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url)
        .await?;

    let site = Arc::new(config.site());
    let http = Arc::new(HttpFetcher::new(config.fetch_timeout())?);
    let fetcher: Arc<dyn Fetch> = http.clone();
    let transport: Arc<dyn XmlRpcTransport> = http;

    let worker = PingWorker::new(
        Arc::new(PgContentRepository::new(pool)),
        ExternalUrlsPinger::new(site.clone(), fetcher, transport.clone()),
        config
            .ping_directories()
            .iter()
            .map(|directory| DirectoryPinger::new(directory.clone(), site.clone(), transport.clone()))
            .collect(),
    );

    let Some(report) = worker.process(content_id).await else {
        bail!("content {content_id} does not exist or is not published");
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
