#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use socialdash::config::AppConfig;
use socialdash::infra::store::{
    encode, Entity, Filter, MemoryStore, Page, PageRequest, Record, RecordStore, Store, StoreError,
};
use socialdash::AppState;

// ---------------------------------------------------------------------------
// TestApp: a fresh in-memory store per test
// ---------------------------------------------------------------------------

pub struct TestApp {
    router: Router,
    pub store: Store,
}

pub struct TestResponse {
    pub status: StatusCode,
    body_bytes: bytes::Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body_bytes).unwrap_or(Value::Null)
    }

    pub fn error_message(&self) -> String {
        self.json()["error"].as_str().unwrap_or("").to_string()
    }
}

pub async fn app() -> TestApp {
    TestApp::with_store(Arc::new(MemoryStore::new()))
}

impl TestApp {
    pub fn with_store(store: Store) -> Self {
        let state = AppState::new(store.clone(), &AppConfig::default());
        let router = socialdash::http::router(state);
        TestApp { router, store }
    }

    // ------------------------------------------------------------------
    // Low-level request helper
    // ------------------------------------------------------------------
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        identity: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("host", "localhost");

        if let Some(subject) = identity {
            builder = builder.header("x-identity-sub", subject);
        }

        let request = if let Some(body) = body {
            builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap()
        } else {
            builder.body(Body::empty()).unwrap()
        };

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("oneshot failed");

        let status = response.status();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to collect body")
            .to_bytes();

        TestResponse { status, body_bytes }
    }

    pub async fn get(&self, path: &str, identity: Option<&str>) -> TestResponse {
        self.request(Method::GET, path, None, identity).await
    }

    pub async fn post_json(&self, path: &str, body: Value, identity: Option<&str>) -> TestResponse {
        self.request(Method::POST, path, Some(body), identity).await
    }

    // ------------------------------------------------------------------
    // Fixtures, written straight to the store
    // ------------------------------------------------------------------
    pub async fn seed(&self, entity: Entity, fields: Value) -> Record {
        self.store
            .create(entity, encode(&fields).unwrap())
            .await
            .expect("failed to seed record")
    }

    pub async fn seed_user(&self, id: &str) {
        self.seed(
            Entity::User,
            json!({
                "id": id,
                "username": id,
                "email": format!("{}@example.com", id),
                "followersCount": 0,
                "followingCount": 0,
                "postsCount": 0,
            }),
        )
        .await;
    }

    pub async fn seed_follow(&self, follower_id: &str, following_id: &str) {
        self.seed(
            Entity::Follow,
            json!({ "followerId": follower_id, "followingId": following_id }),
        )
        .await;
    }

    /// A public post published at `published_at` (RFC 3339).
    pub async fn seed_post(&self, id: &str, author_id: &str, published_at: &str) {
        self.seed(
            Entity::Post,
            json!({
                "id": id,
                "authorId": author_id,
                "content": format!("post {}", id),
                "isPublic": true,
                "publishedAt": published_at,
                "createdAt": published_at,
            }),
        )
        .await;
    }

    pub async fn seed_private_post(&self, id: &str, author_id: &str, published_at: &str) {
        self.seed(
            Entity::Post,
            json!({
                "id": id,
                "authorId": author_id,
                "content": format!("post {}", id),
                "isPublic": false,
                "publishedAt": published_at,
                "createdAt": published_at,
            }),
        )
        .await;
    }

    pub async fn record(&self, entity: Entity, id: &str) -> Option<Record> {
        self.store.get(entity, id).await.unwrap()
    }

    pub async fn all(&self, entity: Entity) -> Vec<Record> {
        self.store
            .list(entity, &Filter::and([]), PageRequest::all())
            .await
            .unwrap()
            .records
    }
}

pub fn ids(items: &Value) -> Vec<String> {
    items
        .as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Store doubles
// ---------------------------------------------------------------------------

/// Counts every call before delegating to an in-memory store.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    calls: AtomicUsize,
}

impl CountingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for CountingStore {
    async fn list(
        &self,
        entity: Entity,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<Page<Record>, StoreError> {
        self.hit();
        self.inner.list(entity, filter, page).await
    }

    async fn get(&self, entity: Entity, id: &str) -> Result<Option<Record>, StoreError> {
        self.hit();
        self.inner.get(entity, id).await
    }

    async fn create(&self, entity: Entity, fields: Record) -> Result<Record, StoreError> {
        self.hit();
        self.inner.create(entity, fields).await
    }

    async fn increment(
        &self,
        entity: Entity,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Record, StoreError> {
        self.hit();
        self.inner.increment(entity, id, field, delta).await
    }

    async fn delete(&self, entity: Entity, id: &str) -> Result<bool, StoreError> {
        self.hit();
        self.inner.delete(entity, id).await
    }
}

/// Fails every read of one entity type; everything else goes to memory.
pub struct FailingStore {
    inner: MemoryStore,
    broken: Entity,
}

impl FailingStore {
    pub fn new(broken: Entity) -> Self {
        Self {
            inner: MemoryStore::new(),
            broken,
        }
    }
}

#[async_trait]
impl RecordStore for FailingStore {
    async fn list(
        &self,
        entity: Entity,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<Page<Record>, StoreError> {
        if entity == self.broken {
            return Err(StoreError::InvalidRecord(format!("{} table unavailable", entity)));
        }
        self.inner.list(entity, filter, page).await
    }

    async fn get(&self, entity: Entity, id: &str) -> Result<Option<Record>, StoreError> {
        self.inner.get(entity, id).await
    }

    async fn create(&self, entity: Entity, fields: Record) -> Result<Record, StoreError> {
        self.inner.create(entity, fields).await
    }

    async fn increment(
        &self,
        entity: Entity,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Record, StoreError> {
        self.inner.increment(entity, id, field, delta).await
    }

    async fn delete(&self, entity: Entity, id: &str) -> Result<bool, StoreError> {
        self.inner.delete(entity, id).await
    }
}
