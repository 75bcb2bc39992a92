pub mod cursor;
pub mod filter;
pub mod memory;
pub mod postgres;

use std::fmt;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::config::{AppConfig, StoreBackend};
use crate::infra::db::Db;

pub use filter::Filter;
pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A stored record: a JSON object with camelCase field names.
pub type Record = Map<String, Value>;

/// Shared handle to whichever backend the process was configured with.
pub type Store = Arc<dyn RecordStore>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Entity {
    User,
    Post,
    Follow,
    Like,
    Notification,
    VisitorAnalytics,
}

impl Entity {
    pub fn as_db(&self) -> &'static str {
        match self {
            Self::User => "User",
            Self::Post => "Post",
            Self::Follow => "Follow",
            Self::Like => "Like",
            Self::Notification => "Notification",
            Self::VisitorAnalytics => "VisitorAnalytics",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_db())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("postgres error: {0}")]
    Postgres(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid continuation token")]
    InvalidToken,

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: String },

    #[error("invalid record: {0}")]
    InvalidRecord(String),
}

#[derive(Debug, Clone, Default)]
pub struct PageRequest {
    /// `None` returns every matching record in a single page.
    pub limit: Option<usize>,
    pub token: Option<String>,
}

impl PageRequest {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn first(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            token: None,
        }
    }

    pub fn new(limit: usize, token: Option<String>) -> Self {
        Self {
            limit: Some(limit),
            token,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Page<T> {
    pub records: Vec<T>,
    pub next_token: Option<String>,
}

/// Generic CRUD/query access to the records owned by the platform.
///
/// Listing order is `createdAt` descending, then `id` descending. Continuation
/// tokens are opaque to callers and only valid for the backend that issued them.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn list(
        &self,
        entity: Entity,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<Page<Record>, StoreError>;

    async fn get(&self, entity: Entity, id: &str) -> Result<Option<Record>, StoreError>;

    /// Inserts a record, assigning `id`, `createdAt` and `updatedAt` unless the
    /// fields already carry them (fixtures and imports do).
    async fn create(&self, entity: Entity, fields: Record) -> Result<Record, StoreError>;

    /// Adds `delta` to a numeric field, treating a missing field as 0.
    async fn increment(
        &self,
        entity: Entity,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Record, StoreError>;

    async fn delete(&self, entity: Entity, id: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Typed helpers over [`RecordStore`].
#[async_trait]
pub trait StoreExt: RecordStore {
    async fn list_as<T>(
        &self,
        entity: Entity,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<Page<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        let page = self.list(entity, filter, page).await?;
        let records = page
            .records
            .into_iter()
            .map(decode)
            .collect::<Result<Vec<T>, _>>()?;
        Ok(Page {
            records,
            next_token: page.next_token,
        })
    }

    async fn list_all_as<T>(&self, entity: Entity, filter: &Filter) -> Result<Vec<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        Ok(self.list_as(entity, filter, PageRequest::all()).await?.records)
    }

    async fn get_as<T>(&self, entity: Entity, id: &str) -> Result<Option<T>, StoreError>
    where
        T: DeserializeOwned + Send,
    {
        self.get(entity, id).await?.map(decode).transpose()
    }

    async fn create_as<T, F>(&self, entity: Entity, fields: &F) -> Result<T, StoreError>
    where
        T: DeserializeOwned + Send,
        F: Serialize + Sync,
    {
        let record = self.create(entity, encode(fields)?).await?;
        decode(record)
    }
}

impl<S: RecordStore + ?Sized> StoreExt for S {}

pub fn decode<T: DeserializeOwned>(record: Record) -> Result<T, StoreError> {
    Ok(serde_json::from_value(Value::Object(record))?)
}

pub fn encode<T: Serialize + ?Sized>(value: &T) -> Result<Record, StoreError> {
    match serde_json::to_value(value)? {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::InvalidRecord(format!(
            "expected an object, got {}",
            other
        ))),
    }
}

/// Builds the backend selected by `STORE_BACKEND`.
pub async fn connect(config: &AppConfig) -> Result<Store> {
    match config.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory record store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StoreBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| anyhow!("DATABASE_URL is required for the postgres store"))?;
            let db = Db::connect(config, database_url).await?;
            db.migrate().await?;
            Ok(Arc::new(PgStore::new(db)))
        }
    }
}

/// Reads the `id` and `createdAt` a store needs for ordering, filling them in
/// when absent.
pub(crate) fn stamp(fields: &mut Record, now: OffsetDateTime) -> Result<(String, OffsetDateTime), StoreError> {
    let id = match fields.get("id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        Some(other) if !other.is_null() => {
            return Err(StoreError::InvalidRecord(format!("id must be a string, got {}", other)));
        }
        _ => {
            let id = uuid::Uuid::new_v4().to_string();
            fields.insert("id".to_string(), Value::String(id.clone()));
            id
        }
    };

    let created_at = match fields.get("createdAt") {
        Some(Value::String(raw)) => cursor::parse_timestamp(raw)
            .ok_or_else(|| StoreError::InvalidRecord(format!("invalid createdAt: {}", raw)))?,
        _ => {
            fields.insert("createdAt".to_string(), Value::String(cursor::format_timestamp(now)?));
            now
        }
    };

    if !fields.contains_key("updatedAt") {
        fields.insert("updatedAt".to_string(), Value::String(cursor::format_timestamp(now)?));
    }

    Ok((id, created_at))
}

/// Wall-clock time truncated to the microsecond precision Postgres keeps.
pub(crate) fn store_now() -> OffsetDateTime {
    to_store_precision(OffsetDateTime::now_utc())
}

/// Drops sub-microsecond digits so stored timestamps compare the same on every backend.
pub fn to_store_precision(at: OffsetDateTime) -> OffsetDateTime {
    at.replace_nanosecond(at.nanosecond() / 1_000 * 1_000)
        .unwrap_or(at)
}
