use axum::{routing::get, routing::post, Router};

use crate::http::handlers;
use crate::AppState;

pub fn health() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health))
}

pub fn feed() -> Router<AppState> {
    Router::new().route("/feed", get(handlers::home_feed))
}

pub fn users() -> Router<AppState> {
    Router::new()
        .route("/users/:id/stats", get(handlers::user_stats))
        .route("/users/:id/follow", post(handlers::follow_user))
}

pub fn posts() -> Router<AppState> {
    Router::new()
        .route("/posts", post(handlers::create_post))
        .route("/posts/:id/like", post(handlers::toggle_like))
}

pub fn notifications() -> Router<AppState> {
    Router::new().route("/notifications", get(handlers::list_notifications))
}

pub fn visitors() -> Router<AppState> {
    Router::new().route("/visitors", post(handlers::track_visitor))
}
