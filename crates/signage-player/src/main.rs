mod config;
mod stubs;
mod transport_http;

use clap::Parser;
use config::PlayerConfig;
use signage_blobstore::FsBlobStore;
use signage_download::{CacheManager, CacheManagerConfig};
use signage_orchestrator::{Orchestrator, OrchestratorDeps};
use std::path::PathBuf;
use std::sync::Arc;
use stubs::{LoggingPlatformSink, NoopRenderer, UnconfiguredPushTransport};
use tracing::info;
use transport_http::HttpTransport;

#[derive(Parser)]
#[command(name = "signage-player", about = "Digital signage player core")]
struct Cli {
    /// Path to the player's configuration file.
    #[arg(short, long, env = "SIGNAGE_PLAYER_CONFIG", default_value = "signage-player.toml")]
    config: PathBuf,

    /// Directory backing the content-addressed blob store.
    #[arg(long, env = "SIGNAGE_PLAYER_CACHE_DIR", default_value = "signage-cache")]
    cache_dir: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = PlayerConfig::load_or_init(&cli.config)?;
    info!(display_name = %config.display_name, "loaded player configuration");

    let store = Arc::new(FsBlobStore::new(&cli.cache_dir).await?);
    let cache = Arc::new(CacheManager::new(
        store,
        reqwest::Client::new(),
        CacheManagerConfig::default(),
    ));

    let transport = Arc::new(HttpTransport::new(
        config.cms_url.clone(),
        config.cms_key.clone(),
        config.hardware_key.clone(),
    ));

    let orchestrator = Orchestrator::new(OrchestratorDeps {
        transport,
        renderer: Arc::new(NoopRenderer),
        cache,
        push_transport: Arc::new(UnconfiguredPushTransport),
        platform_sink: Some(Arc::new(LoggingPlatformSink)),
    });

    let mut events = orchestrator.events().await.expect("events taken exactly once");
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            info!(?event, "player event");
        }
    });

    orchestrator.collect().await;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    orchestrator.cleanup().await;

    Ok(())
}
