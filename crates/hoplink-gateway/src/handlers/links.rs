use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use jiff::SignedDuration;

use crate::error::{ApiError, Result};
use crate::model::{
    CreateLinkRequest, LinkResponse, ListParams, ListResponse, OrderParam, Pagination,
    SortByParam, SummaryParams, UpdateLinkRequest,
};
use crate::state::AppState;
use hoplink_allocator::{AllocateParams, ExpirationPolicy};
use hoplink_analytics::{overview, summarize};
use hoplink_core::{LinkCache, LinkMetaUpdate, LinkStore, ListQuery, ShortCode, SortBy, SortOrder};
use hoplink_redirector::ResolveError;
use tracing::warn;

/// `POST /api/links` — allocate a short code. 201 for a fresh link,
/// 200 when the destination was already shortened.
pub async fn create_link_handler<S: LinkStore, C: LinkCache>(
    State(state): State<AppState<S, C>>,
    Json(request): Json<CreateLinkRequest>,
) -> Result<Response> {
    let expiration = match request.expires_in_hours {
        Some(hours) => ExpirationPolicy::AfterDuration(SignedDuration::from_hours(hours)),
        None => ExpirationPolicy::Never,
    };

    let allocation = state
        .allocator
        .allocate(AllocateParams {
            destination: request.destination,
            alias: request.alias,
            expiration,
            custom_domain: request.custom_domain,
            tags: request.tags,
        })
        .await?;

    let status = if allocation.is_created() {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    let body = LinkResponse::from_link(allocation.link(), &state.base_url);
    Ok((status, Json(body)).into_response())
}

/// `GET /api/links` — active links plus dashboard overview.
pub async fn list_links_handler<S: LinkStore, C: LinkCache>(
    State(state): State<AppState<S, C>>,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>> {
    let page = params.page.max(1);
    let query = ListQuery {
        offset: (page - 1) * params.limit,
        limit: params.limit,
        sort_by: match params.sort_by {
            SortByParam::CreatedAt => SortBy::CreatedAt,
            SortByParam::Clicks => SortBy::Clicks,
        },
        order: match params.order {
            OrderParam::Asc => SortOrder::Asc,
            OrderParam::Desc => SortOrder::Desc,
        },
        tag: params.tag,
    };

    let links = state.store.list_active(query).await.map_err(ApiError::from)?;
    let total = state.store.count_active().await.map_err(ApiError::from)?;

    let all_active = state
        .store
        .list_active(ListQuery {
            offset: 0,
            limit: u64::MAX,
            ..Default::default()
        })
        .await
        .map_err(ApiError::from)?;

    Ok(Json(ListResponse {
        links: links
            .iter()
            .map(|link| LinkResponse::from_link(link, &state.base_url))
            .collect(),
        pagination: Pagination {
            page,
            limit: params.limit,
            total,
        },
        overview: overview(&all_active),
    }))
}

/// `GET /api/links/{code}/stats` — the link record itself.
pub async fn link_stats_handler<S: LinkStore, C: LinkCache>(
    Path(code): Path<String>,
    State(state): State<AppState<S, C>>,
) -> Result<Json<LinkResponse>> {
    let code = ShortCode::new_unchecked(code);
    let link = state
        .store
        .find_by_code(&code)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::Resolve(ResolveError::NotFound(code.to_string())))?;

    Ok(Json(LinkResponse::from_link(&link, &state.base_url)))
}

/// `GET /api/links/{code}/summary?days=N` — rolling click statistics.
pub async fn link_summary_handler<S: LinkStore, C: LinkCache>(
    Path(code): Path<String>,
    State(state): State<AppState<S, C>>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<hoplink_analytics::ClickSummary>> {
    let code = ShortCode::new_unchecked(code);
    let summary = summarize(state.store.as_ref(), &code, params.days)
        .await
        .map_err(ApiError::from)?;
    Ok(Json(summary))
}

/// `PUT /api/links/{code}` — update tags / custom domain. The cache
/// entry is invalidated so the next resolve picks the change up.
pub async fn update_link_handler<S: LinkStore, C: LinkCache>(
    Path(code): Path<String>,
    State(state): State<AppState<S, C>>,
    Json(request): Json<UpdateLinkRequest>,
) -> Result<Json<LinkResponse>> {
    let code = ShortCode::new_unchecked(code);
    if state
        .store
        .find_by_code(&code)
        .await
        .map_err(ApiError::from)?
        .is_none()
    {
        return Err(ApiError::Resolve(ResolveError::NotFound(code.to_string())));
    }

    state
        .store
        .update_meta(
            &code,
            LinkMetaUpdate {
                tags: request.tags,
                custom_domain: request.custom_domain,
            },
        )
        .await
        .map_err(ApiError::from)?;

    if let Err(e) = state.cache.delete(&code).await {
        warn!(code = %code, error = %e, "failed to invalidate cache entry after update");
    }

    let link = state
        .store
        .find_by_code(&code)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::Resolve(ResolveError::NotFound(code.to_string())))?;
    Ok(Json(LinkResponse::from_link(&link, &state.base_url)))
}

/// `DELETE /api/links/{code}` — soft delete.
pub async fn delete_link_handler<S: LinkStore, C: LinkCache>(
    Path(code): Path<String>,
    State(state): State<AppState<S, C>>,
) -> Result<StatusCode> {
    let code = ShortCode::new_unchecked(code);
    let removed = state.allocator.deactivate(&code).await?;
    if !removed {
        return Err(ApiError::Resolve(ResolveError::NotFound(code.to_string())));
    }
    Ok(StatusCode::NO_CONTENT)
}
