use axum::http::HeaderValue;
use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::{actor::Actor, state::AppState};

pub mod comments;
pub mod drawings;
pub mod health;
pub mod transmittals;

fn cors_layer(allowed: Option<&String>) -> CorsLayer {
    let allow_origin = match allowed {
        Some(origins) => {
            let headers: Vec<HeaderValue> = origins
                .split(',')
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .filter_map(|value| match value.parse::<HeaderValue>() {
                    Ok(header) => Some(header),
                    Err(_) => {
                        tracing::warn!(origin = value, "ignoring invalid CORS origin");
                        None
                    }
                })
                .collect();
            AllowOrigin::list(headers)
        }
        None => AllowOrigin::mirror_request(),
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_router(state: AppState) -> Router<()> {
    let cors = cors_layer(state.config.cors_allowed_origin.as_ref());

    let project_routes = Router::new()
        .route(
            "/:project_id/drawings",
            get(drawings::list_drawings).post(drawings::create_drawing),
        )
        .route("/:project_id/drawings/search", get(drawings::search_drawings))
        .route(
            "/:project_id/transmittals",
            get(transmittals::list_transmittals).post(transmittals::create_transmittal),
        );

    let drawing_routes = Router::new()
        .route(
            "/:id",
            get(drawings::get_drawing).delete(drawings::delete_drawing),
        )
        .route("/:id/status", patch(drawings::update_status))
        .route(
            "/:id/revisions",
            get(drawings::list_revisions).post(drawings::create_revision),
        )
        .route("/:id/lineage", get(drawings::lineage))
        .route(
            "/:id/comments",
            get(comments::list_comments).post(comments::add_comment),
        )
        .route("/:id/access-log", get(drawings::list_access_log));

    let comment_routes = Router::new()
        .route("/:id/replies", get(comments::list_replies))
        .route("/:id/resolve", post(comments::resolve_comment))
        .route("/:id/unresolve", post(comments::unresolve_comment));

    let transmittal_routes = Router::new()
        .route("/:id", get(transmittals::get_transmittal))
        .route("/:id/acknowledge", post(transmittals::acknowledge_transmittal));

    let protected_routes = Router::new()
        .nest("/api/projects", project_routes)
        .nest("/api/drawings", drawing_routes)
        .nest("/api/comments", comment_routes)
        .nest("/api/transmittals", transmittal_routes)
        .layer(middleware::from_extractor::<Actor>());

    Router::new()
        .merge(protected_routes)
        .route("/api/health", get(health::health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
