mod app;
mod config;
mod error;
mod extract;
mod handlers;
mod model;
mod state;

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::App;
use crate::config::{CacheBackendArg, StoreBackendArg, CLI};
use crate::state::AppState;
use hoplink_allocator::AllocatorService;
use hoplink_analytics::{ClickRecorder, WootheeClassifier};
use hoplink_cache::{MokaLinkCache, RedisLinkCache};
use hoplink_core::{LinkCache, LinkStore};
use hoplink_redirector::ResolverService;
use hoplink_storage::{InMemoryStore, MySqlStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = CLI::try_parse()?;

    info!(
        listen_addr = %config.listen_addr,
        store_backend = %config.store,
        cache_backend = %config.cache,
        "starting hoplink gateway"
    );

    match (config.store, config.cache) {
        (StoreBackendArg::InMemory, CacheBackendArg::Moka) => {
            run_server(config, InMemoryStore::new(), MokaLinkCache::new()).await
        }
        (StoreBackendArg::InMemory, CacheBackendArg::Redis) => {
            let cache = connect_redis(&config).await?;
            run_server(config, InMemoryStore::new(), cache).await
        }
        (StoreBackendArg::Mysql, CacheBackendArg::Moka) => {
            let store = connect_mysql(&config).await?;
            run_server(config, store, MokaLinkCache::new()).await
        }
        (StoreBackendArg::Mysql, CacheBackendArg::Redis) => {
            let store = connect_mysql(&config).await?;
            let cache = connect_redis(&config).await?;
            run_server(config, store, cache).await
        }
    }
}

async fn connect_mysql(config: &CLI) -> anyhow::Result<MySqlStore> {
    let dsn = config
        .mysql_dsn
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("mysql dsn is required when store backend is mysql"))?;
    Ok(MySqlStore::connect(dsn).await?)
}

async fn connect_redis(config: &CLI) -> anyhow::Result<RedisLinkCache> {
    let url = config
        .redis_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("redis url is required when cache backend is redis"))?;
    Ok(RedisLinkCache::connect(url).await?)
}

async fn run_server<S: LinkStore, C: LinkCache>(
    config: CLI,
    store: S,
    cache: C,
) -> anyhow::Result<()> {
    let store = Arc::new(store);
    let cache = Arc::new(cache);
    let cache_ttl = Duration::from_secs(config.cache_ttl_secs);

    let recorder = ClickRecorder::spawn(
        Arc::clone(&store) as Arc<dyn LinkStore>,
        Arc::new(WootheeClassifier),
    );
    let allocator = AllocatorService::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        config.allocator_config(),
    );
    let resolver = ResolverService::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        recorder,
        cache_ttl,
    );

    let state = AppState {
        allocator,
        resolver,
        store,
        cache,
        base_url: config.base_url.clone(),
    };

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    info!(listen_addr = %listener.local_addr()?, "gateway listening");

    axum::serve(
        listener,
        App::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
