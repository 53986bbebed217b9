use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use hoplink_allocator::AllocationError;
use hoplink_analytics::AnalyticsError;
use hoplink_core::StoreError;
use hoplink_redirector::ResolveError;

pub type Result<T> = std::result::Result<T, ApiError>;

/// Gateway-level error wrapper mapping the service taxonomy onto HTTP.
#[derive(Debug)]
pub enum ApiError {
    Allocation(AllocationError),
    Resolve(ResolveError),
    Analytics(AnalyticsError),
    Store(StoreError),
}

impl From<AllocationError> for ApiError {
    fn from(err: AllocationError) -> Self {
        Self::Allocation(err)
    }
}

impl From<ResolveError> for ApiError {
    fn from(err: ResolveError) -> Self {
        Self::Resolve(err)
    }
}

impl From<AnalyticsError> for ApiError {
    fn from(err: AnalyticsError) -> Self {
        Self::Analytics(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl ApiError {
    /// Status code plus stable machine-readable kind.
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Allocation(err) => match err {
                AllocationError::InvalidUrl(_) => (StatusCode::BAD_REQUEST, "invalid_url"),
                AllocationError::AliasInvalid(_) => (StatusCode::BAD_REQUEST, "alias_invalid"),
                AllocationError::AliasTaken(_) => (StatusCode::CONFLICT, "alias_taken"),
                AllocationError::Exhausted { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "allocation_exhausted")
                }
                AllocationError::Store(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
                }
            },
            ApiError::Resolve(err) => match err {
                ResolveError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                ResolveError::Expired(_) => (StatusCode::GONE, "expired"),
                ResolveError::Unavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
                }
            },
            ApiError::Analytics(err) => match err {
                AnalyticsError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
                AnalyticsError::InvalidWindow(_) => (StatusCode::BAD_REQUEST, "invalid_window"),
                AnalyticsError::Store(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable")
                }
            },
            ApiError::Store(_) => (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable"),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Allocation(err) => err.to_string(),
            ApiError::Resolve(err) => err.to_string(),
            ApiError::Analytics(err) => err.to_string(),
            ApiError::Store(err) => err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        let body = Json(json!({
            "error": kind,
            "message": self.message(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_errors_map_to_contract_statuses() {
        let cases = [
            (
                ApiError::Allocation(AllocationError::InvalidUrl("x".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Allocation(AllocationError::AliasInvalid("x".to_string())),
                StatusCode::BAD_REQUEST,
            ),
            (
                ApiError::Allocation(AllocationError::AliasTaken("x".to_string())),
                StatusCode::CONFLICT,
            ),
            (
                ApiError::Allocation(AllocationError::Exhausted { attempts: 10 }),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_kind().0, expected);
        }
    }

    #[test]
    fn resolve_errors_map_to_contract_statuses() {
        let cases = [
            (
                ApiError::Resolve(ResolveError::NotFound("x".to_string())),
                StatusCode::NOT_FOUND,
            ),
            (
                ApiError::Resolve(ResolveError::Expired("x".to_string())),
                StatusCode::GONE,
            ),
            (
                ApiError::Resolve(ResolveError::Unavailable("x".to_string())),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.status_and_kind().0, expected);
        }
    }
}
