//! Short-code allocation service.
//!
//! This crate owns the create path: validating the destination URL,
//! picking or validating a short code (sequential counter encoding or
//! random-with-retry, configurable per deployment), writing the link
//! record, and best-effort populating the cache.

pub mod config;
pub mod error;
pub mod service;

pub use config::{AllocatorConfig, Strategy};
pub use error::AllocationError;
pub use service::{AllocateParams, Allocation, AllocatorService, ExpirationPolicy};
