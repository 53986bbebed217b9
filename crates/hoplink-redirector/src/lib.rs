//! Redirect resolution with cache-aside reads and off-path analytics.
//!
//! [`ResolverService`] answers every incoming redirect: cache first,
//! durable store on a miss, lazy expiry reconciliation, and click
//! recording that never delays the response on the hot path.

pub mod error;
pub mod service;

pub use error::ResolveError;
pub use service::ResolverService;
