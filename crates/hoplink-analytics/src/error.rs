use hoplink_core::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AnalyticsError {
    #[error("unknown short code: {0}")]
    NotFound(String),
    #[error("window must be between 1 and 365 days, got {0}")]
    InvalidWindow(i64),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
