//! [`LinkCache`][hoplink_core::LinkCache] implementations shared across
//! hoplink services.

pub mod moka;
pub mod redis;

pub use moka::MokaLinkCache;
pub use redis::RedisLinkCache;
