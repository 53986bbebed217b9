use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum ResolveError {
    /// The code was never allocated, or its link was soft-deleted.
    #[error("unknown short code: {0}")]
    NotFound(String),
    /// The link's expiry is in the past. The active flag is reconciled
    /// lazily when this is first observed.
    #[error("short code has expired: {0}")]
    Expired(String),
    /// The durable store failed on a path with no cache fallback.
    #[error("store unreachable: {0}")]
    Unavailable(String),
}
