use axum::routing::{delete, get, patch, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{events, health_check, users};
use crate::state::AppState;

/// Mounted under `/api/event`.
fn event_routes() -> Router<AppState> {
    Router::new()
        .route("/newEvent", post(events::create_event))
        .route("/event-list", get(events::list_events))
        .route("/:id/event-details", get(events::event_details))
        .route("/:id/update-event", patch(events::update_event))
        .route(
            "/:id",
            patch(events::close_event).delete(events::delete_event),
        )
        .route("/:id/join", post(events::join_event))
        .route("/:id/leave", delete(events::leave_event))
}

/// Mounted under `/api/user`.
fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(users::list_users))
        .route("/joined", get(users::joined_events))
        .route("/promoted", get(users::promoted_events))
        .route(
            "/:id",
            get(users::user_detail)
                .patch(users::update_profile)
                .delete(users::delete_profile),
        )
}

pub fn create_routes(state: AppState, config: &Config) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .nest("/api/event", event_routes())
        .nest("/api/user", user_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config.production))
        .layer(create_cors_layer(&config.allowed_origins))
}
