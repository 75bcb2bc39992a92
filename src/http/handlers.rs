use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::app::engagement::{EngagementService, LikeToggle};
use crate::app::error::require_identity;
use crate::app::feed::{FeedPage, FeedService};
use crate::app::notifications::NotificationService;
use crate::app::posts::{CreatePostInput, PostService};
use crate::app::social::SocialService;
use crate::app::stats::StatsService;
use crate::app::visitors::{TrackVisitInput, VisitorService};
use crate::domain::notification::Notification;
use crate::domain::post::Post;
use crate::domain::social_graph::Follow;
use crate::domain::stats::StatsReport;
use crate::domain::visitor::VisitorAnalytics;
use crate::http::{AppError, Identity};
use crate::AppState;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub next_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_token: Option<String>,
}

fn parse_limit(limit: Option<i64>, max: usize) -> Result<Option<usize>, AppError> {
    let Some(limit) = limit else {
        return Ok(None);
    };
    if limit < 1 || limit as u64 > max as u64 {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {}",
            max
        )));
    }
    Ok(Some(limit as usize))
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.store.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = ?err, "record store ping failed");
            "degraded"
        }
    };

    Json(HealthResponse { status })
}

pub async fn home_feed(
    identity: Identity,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<FeedPage>, AppError> {
    let limit = parse_limit(query.limit, state.feed_max_page_size)?;

    let service =
        FeedService::new(state.store.clone()).with_default_page_size(state.feed_default_page_size);
    let page = service
        .assemble_feed(identity.as_deref(), limit, query.next_token)
        .await
        .map_err(|err| AppError::from_service(err, "get feed"))?;

    Ok(Json(page))
}

pub async fn user_stats(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StatsReport>, AppError> {
    require_identity(identity.as_deref())
        .map_err(|err| AppError::from_service(err, "get user stats"))?;

    let service =
        StatsService::new(state.store.clone()).with_recent_window(state.stats_recent_window);
    let report = service
        .compute_stats(&id, OffsetDateTime::now_utc())
        .await
        .map_err(|err| AppError::from_service(err, "get user stats"))?;

    Ok(Json(report))
}

pub async fn create_post(
    identity: Identity,
    State(state): State<AppState>,
    Json(payload): Json<CreatePostInput>,
) -> Result<Json<Post>, AppError> {
    if payload.content.trim().is_empty() {
        return Err(AppError::bad_request("content is required"));
    }

    let service = PostService::new(state.store.clone());
    let post = service
        .create_post(identity.as_deref(), payload, OffsetDateTime::now_utc())
        .await
        .map_err(|err| AppError::from_service(err, "create post"))?;

    Ok(Json(post))
}

pub async fn follow_user(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Follow>, AppError> {
    let service = SocialService::new(state.store.clone());
    let follow = service
        .follow(identity.as_deref(), &id)
        .await
        .map_err(|err| AppError::from_service(err, "follow user"))?;

    Ok(Json(follow))
}

pub async fn toggle_like(
    identity: Identity,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<LikeToggle>, AppError> {
    let service = EngagementService::new(state.store.clone());
    let toggle = service
        .toggle_like(identity.as_deref(), &id)
        .await
        .map_err(|err| AppError::from_service(err, "like post"))?;

    Ok(Json(toggle))
}

pub async fn list_notifications(
    identity: Identity,
    State(state): State<AppState>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<ListResponse<Notification>>, AppError> {
    let limit = parse_limit(query.limit, state.feed_max_page_size)?
        .unwrap_or(state.feed_default_page_size);

    let service = NotificationService::new(state.store.clone());
    let page = service
        .list(identity.as_deref(), limit, query.next_token)
        .await
        .map_err(|err| AppError::from_service(err, "list notifications"))?;

    Ok(Json(ListResponse {
        items: page.records,
        next_token: page.next_token,
    }))
}

pub async fn track_visitor(
    State(state): State<AppState>,
    Json(payload): Json<TrackVisitInput>,
) -> Result<Json<VisitorAnalytics>, AppError> {
    let service = VisitorService::new(state.store.clone());
    let visit = service
        .track(payload, OffsetDateTime::now_utc())
        .await
        .map_err(|err| AppError::from_service(err, "track visitor"))?;

    Ok(Json(visit))
}
