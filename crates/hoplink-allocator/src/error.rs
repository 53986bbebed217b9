use hoplink_core::StoreError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum AllocationError {
    #[error("invalid destination url: {0}")]
    InvalidUrl(String),
    #[error("invalid alias: {0}")]
    AliasInvalid(String),
    #[error("alias already taken: {0}")]
    AliasTaken(String),
    #[error("allocation retry budget exhausted after {attempts} attempts")]
    Exhausted { attempts: u32 },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}
