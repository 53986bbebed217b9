use axum::routing::{get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::handlers::{
    create_link_handler, delete_link_handler, health_handler, link_stats_handler,
    link_summary_handler, list_links_handler, redirect_handler, update_link_handler,
};
use crate::state::AppState;
use hoplink_core::{LinkCache, LinkStore};

pub struct App {}

impl App {
    pub fn router<S: LinkStore, C: LinkCache>(state: AppState<S, C>) -> Router {
        Router::new()
            .route("/health", get(health_handler))
            .nest(
                "/api/links",
                Router::new()
                    .route(
                        "/",
                        post(create_link_handler::<S, C>).get(list_links_handler::<S, C>),
                    )
                    .route(
                        "/{code}",
                        put(update_link_handler::<S, C>).delete(delete_link_handler::<S, C>),
                    )
                    .route("/{code}/stats", get(link_stats_handler::<S, C>))
                    .route("/{code}/summary", get(link_summary_handler::<S, C>)),
            )
            .route("/{code}", get(redirect_handler::<S, C>))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
