//! Stats Tests
//!
//! Covers the per-user stats report over HTTP and its failure modes.

mod common;

use std::sync::Arc;

use axum::http::StatusCode;
use common::{app, FailingStore, TestApp};
use serde_json::json;
use socialdash::app::stats::StatsService;
use socialdash::app::ServiceError;
use socialdash::infra::store::{Entity, StoreError};
use time::macros::datetime;
use time::{Duration, OffsetDateTime};

async fn seed_counted_post(
    app: &TestApp,
    id: &str,
    author_id: &str,
    (likes, comments, shares): (i64, i64, i64),
    published_at: &str,
) {
    app.seed(
        Entity::Post,
        json!({
            "id": id,
            "authorId": author_id,
            "content": format!("content of {}", id),
            "isPublic": true,
            "likesCount": likes,
            "commentsCount": comments,
            "sharesCount": shares,
            "viewsCount": likes * 10,
            "publishedAt": published_at,
            "createdAt": published_at,
        }),
    )
    .await;
}

// ===========================================================================
// Report contents
// ===========================================================================

#[tokio::test]
async fn stats_report_aggregates_posts_and_graph() {
    let app = app().await;
    let recent = (OffsetDateTime::now_utc() - Duration::days(1))
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap();

    seed_counted_post(&app, "post1", "u1", (10, 2, 1), &recent).await;
    seed_counted_post(&app, "post2", "u1", (5, 0, 0), "2020-01-01T00:00:00Z").await;
    seed_counted_post(&app, "post3", "u1", (20, 5, 5), &recent).await;
    seed_counted_post(&app, "other", "u2", (99, 99, 99), &recent).await;

    app.seed_follow("f1", "u1").await;
    app.seed_follow("f2", "u1").await;
    app.seed_follow("u1", "f1").await;
    app.seed(Entity::Like, json!({ "userId": "u1", "postId": "other" })).await;

    let resp = app.get("/v1/users/u1/stats", Some("viewer")).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();

    assert_eq!(body["user"]["id"], "u1");
    assert_eq!(body["user"]["postsCount"], 3);
    assert_eq!(body["user"]["followersCount"], 2);
    assert_eq!(body["user"]["followingCount"], 1);
    assert_eq!(body["user"]["likesGiven"], 1);

    assert_eq!(body["engagement"]["totalLikes"], 35);
    assert_eq!(body["engagement"]["totalComments"], 7);
    assert_eq!(body["engagement"]["totalShares"], 6);
    assert_eq!(body["engagement"]["totalViews"], 350);
    assert_eq!(body["engagement"]["totalEngagement"], 48);
    assert_eq!(body["engagement"]["engagementRate"].as_f64().unwrap(), 16.0);

    assert_eq!(body["activity"]["recentPostsCount"], 2);
    let top: Vec<&str> = body["activity"]["topPosts"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["id"].as_str().unwrap())
        .collect();
    assert_eq!(top, vec!["post3", "post1", "post2"]);
    assert_eq!(body["activity"]["topPosts"][0]["likesCount"], 20);

    assert_eq!(body["growth"]["followersGrowth"], 0);
    assert_eq!(body["growth"]["engagementGrowth"], 0);
}

#[tokio::test]
async fn stats_for_unknown_user_are_all_zero() {
    let app = app().await;

    let resp = app.get("/v1/users/nobody/stats", Some("viewer")).await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["user"]["postsCount"], 0);
    assert_eq!(body["engagement"]["engagementRate"].as_f64().unwrap(), 0.0);
    assert!(body["activity"]["topPosts"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn stats_top_posts_truncate_long_content() {
    let app = app().await;
    app.seed(
        Entity::Post,
        json!({
            "id": "long",
            "authorId": "u1",
            "content": "x".repeat(150),
            "publishedAt": "2024-01-01T00:00:00Z",
            "createdAt": "2024-01-01T00:00:00Z",
        }),
    )
    .await;
    app.seed(
        Entity::Post,
        json!({
            "id": "short",
            "authorId": "u1",
            "content": "y".repeat(100),
            "createdAt": "2024-01-02T00:00:00Z",
        }),
    )
    .await;

    let resp = app.get("/v1/users/u1/stats", Some("viewer")).await;

    let top = resp.json()["activity"]["topPosts"].clone();
    let contents: Vec<String> = top
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["content"].as_str().unwrap().to_string())
        .collect();
    assert!(contents.contains(&format!("{}...", "x".repeat(100))));
    assert!(contents.contains(&"y".repeat(100)));
}

#[tokio::test]
async fn stats_top_posts_are_capped_at_five() {
    let app = app().await;
    for n in 0..7 {
        seed_counted_post(
            &app,
            &format!("p{}", n),
            "u1",
            (n, 0, 0),
            &format!("2024-01-0{}T00:00:00Z", n + 1),
        )
        .await;
    }

    let resp = app.get("/v1/users/u1/stats", Some("viewer")).await;

    let body = resp.json();
    assert_eq!(body["user"]["postsCount"], 7);
    let top = body["activity"]["topPosts"].as_array().unwrap();
    assert_eq!(top.len(), 5);
    assert_eq!(top[0]["id"], "p6");
    assert_eq!(top[4]["id"], "p2");
}

// ===========================================================================
// Failures
// ===========================================================================

#[tokio::test]
async fn stats_require_identity() {
    let app = app().await;

    let resp = app.get("/v1/users/u1/stats", None).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stats_fail_when_any_lookup_fails() {
    let store = Arc::new(FailingStore::new(Entity::Like));
    let service = StatsService::new(store);

    let result = service
        .compute_stats("u1", datetime!(2024-05-01 00:00 UTC))
        .await;

    assert!(matches!(
        result,
        Err(ServiceError::AggregationFailure(StoreError::InvalidRecord(_)))
    ));
}

#[tokio::test]
async fn stats_lookup_failure_is_a_server_error() {
    let app = TestApp::with_store(Arc::new(FailingStore::new(Entity::Follow)));

    let resp = app.get("/v1/users/u1/stats", Some("viewer")).await;

    assert_eq!(resp.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(resp.error_message(), "failed to get user stats");
}

#[tokio::test]
async fn stats_recent_window_is_configurable() {
    let app = app().await;
    seed_counted_post(&app, "p1", "u1", (0, 0, 0), "2024-04-25T00:00:00Z").await;
    seed_counted_post(&app, "p2", "u1", (0, 0, 0), "2024-04-01T00:00:00Z").await;

    let service = StatsService::new(app.store.clone()).with_recent_window(Duration::days(7));
    let report = service
        .compute_stats("u1", datetime!(2024-05-01 00:00 UTC))
        .await
        .unwrap();

    assert_eq!(report.activity.recent_posts_count, 1);
}

#[tokio::test]
async fn stats_window_before_earliest_date_is_invalid() {
    let app = app().await;
    seed_counted_post(&app, "p1", "u1", (1, 0, 0), "2024-04-25T00:00:00Z").await;

    let service =
        StatsService::new(app.store.clone()).with_recent_window(Duration::days(10_000_000));
    let result = service
        .compute_stats("u1", datetime!(2024-05-01 00:00 UTC))
        .await;

    assert!(matches!(result, Err(ServiceError::Invalid(_))));
}
