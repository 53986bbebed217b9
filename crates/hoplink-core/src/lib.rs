//! Core types and traits for the hoplink URL shortener.
//!
//! This crate provides the shared domain model used by the allocator,
//! redirector, and analytics services: the validated [`ShortCode`] type,
//! the base62 codec, the [`Link`] and [`ClickEvent`] records, and the
//! [`LinkStore`] / [`LinkCache`] traits that the service crates are
//! generic over.

pub mod base62;
pub mod cache;
pub mod error;
pub mod link;
pub mod shortcode;
pub mod store;

pub use cache::{CachedLink, LinkCache};
pub use error::{CacheError, CoreError, StoreError};
pub use link::{ClickEvent, Link, LinkMetaUpdate, ListQuery, SortBy, SortOrder};
pub use shortcode::ShortCode;
pub use store::LinkStore;
