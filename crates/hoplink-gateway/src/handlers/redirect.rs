use axum::extract::{ConnectInfo, Path, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use std::net::SocketAddr;

use crate::error::Result;
use crate::extract::request_metadata;
use crate::state::AppState;
use hoplink_core::{LinkCache, LinkStore, ShortCode};

/// `GET /{code}` — the redirect hot path.
///
/// 302 rather than a permanent status: a cached permanent redirect
/// would let user agents skip us entirely and no click would ever be
/// recorded again.
pub async fn redirect_handler<S: LinkStore, C: LinkCache>(
    Path(code): Path<String>,
    State(state): State<AppState<S, C>>,
    ConnectInfo(remote_addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
) -> Result<Response> {
    let code = ShortCode::new_unchecked(code);
    let meta = request_metadata(&headers, remote_addr);

    let destination = state.resolver.resolve(&code, meta).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, destination)]).into_response())
}
