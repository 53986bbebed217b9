use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;
use std::time::Duration;

use hoplink_allocator::{AllocatorConfig, Strategy};

pub const LISTEN_ADDR_ENV: &str = "HOPLINK_GATEWAY_LISTEN_ADDR";
pub const BASE_URL_ENV: &str = "HOPLINK_BASE_URL";
pub const STRATEGY_ENV: &str = "HOPLINK_STRATEGY";
pub const CODE_LENGTH_ENV: &str = "HOPLINK_CODE_LENGTH";
pub const MAX_RETRIES_ENV: &str = "HOPLINK_MAX_RETRIES";
pub const CACHE_TTL_ENV: &str = "HOPLINK_CACHE_TTL_SECS";
pub const STORE_BACKEND_ENV: &str = "HOPLINK_STORE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "HOPLINK_MYSQL_DSN";
pub const CACHE_BACKEND_ENV: &str = "HOPLINK_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "HOPLINK_REDIS_URL";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    Sequential,
    Random,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Sequential => Strategy::Sequential,
            StrategyArg::Random => Strategy::Random,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StoreBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackendArg::InMemory => write!(f, "in-memory"),
            StoreBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "hoplink-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    /// Public base URL used when rendering short links.
    #[arg(long, env = BASE_URL_ENV, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(long, env = STRATEGY_ENV, value_enum, default_value_t = StrategyArg::Sequential)]
    pub strategy: StrategyArg,

    /// Code length for the random strategy.
    #[arg(long, env = CODE_LENGTH_ENV, default_value_t = 6)]
    pub code_length: usize,

    /// Retry budget for the random strategy.
    #[arg(long, env = MAX_RETRIES_ENV, default_value_t = 10)]
    pub max_retries: u32,

    #[arg(long, env = CACHE_TTL_ENV, default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    #[arg(
        long,
        env = STORE_BACKEND_ENV,
        value_enum,
        default_value_t = StoreBackendArg::InMemory
    )]
    pub store: StoreBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("store", "mysql"))]
    pub mysql_dsn: Option<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,
}

impl CLI {
    pub fn allocator_config(&self) -> AllocatorConfig {
        AllocatorConfig::builder()
            .strategy(self.strategy.into())
            .code_length(self.code_length)
            .max_retries(self.max_retries)
            .cache_ttl(Duration::from_secs(self.cache_ttl_secs))
            .build()
    }
}
