//! API routes

pub mod admin;
pub mod auth;
pub mod health;
pub mod posts;
pub mod users;
pub mod webhooks;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{get, post, put},
    Router,
};
use std::sync::atomic::Ordering;
use tower_http::services::ServeDir;

use crate::state::AppState;

/// Middleware counting hits on the static fileserver
async fn track_fileserver_hits(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    state.fileserver_hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}

/// Create all API routes
pub fn create_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/healthz", get(health::healthz))
        .route("/users", post(users::create_user))
        .route("/users", put(users::update_user))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/revoke", post(auth::revoke))
        .route("/posts", post(posts::create_post).get(posts::list_posts))
        .route(
            "/posts/:post_id",
            get(posts::get_post).delete(posts::delete_post),
        )
        .route("/webhooks/membership", post(webhooks::membership_event));

    let admin_routes = Router::new()
        .route("/metrics", get(admin::metrics))
        .route("/reset", post(admin::reset));

    // Static site under /app, behind the hit counter; the layer is scoped to
    // this sub-router so API traffic is not counted
    let app_routes = Router::new()
        .nest_service("/app", ServeDir::new(&state.config.static_dir))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            track_fileserver_hits,
        ));

    Router::new()
        .nest("/api", api_routes)
        .nest("/admin", admin_routes)
        .merge(app_routes)
        .with_state(state)
}
