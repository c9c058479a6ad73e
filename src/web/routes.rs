use super::AppState;
use super::handlers::{
    complete_project, create_project, delete_project, get_project, health, list_projects,
    method_not_allowed, overdue_projects, root, route_not_found, update_project,
};
use axum::{
    Router,
    http::Method,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root).fallback(method_not_allowed))
        .route("/health", get(health).fallback(method_not_allowed))
        .route(
            "/projects",
            get(list_projects)
                .post(create_project)
                .fallback(method_not_allowed),
        )
        .route(
            "/projects/overdue",
            get(overdue_projects).fallback(method_not_allowed),
        )
        .route(
            "/projects/{id}",
            get(get_project)
                .put(update_project)
                .delete(delete_project)
                .fallback(method_not_allowed),
        )
        .route(
            "/projects/{id}/complete",
            post(complete_project).fallback(method_not_allowed),
        )
        .fallback(route_not_found)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_headers(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ]),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
