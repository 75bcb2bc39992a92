use axum::Router;

use crate::AppState;

mod auth;
mod error;
mod handlers;
mod routes;

pub use auth::{Identity, IDENTITY_HEADER};
pub use error::AppError;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::feed())
        .merge(routes::users())
        .merge(routes::posts())
        .merge(routes::notifications())
        .merge(routes::visitors());

    Router::new()
        .merge(routes::health())
        .nest("/v1", api)
        .with_state(state)
}
