use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder, Row};
use time::OffsetDateTime;

use super::cursor::{self, Cursor};
use super::{Entity, Filter, Page, PageRequest, Record, RecordStore, StoreError};
use crate::infra::db::Db;

/// Records live in one `records` table as jsonb, keyed by `(entity, id)`.
#[derive(Clone)]
pub struct PgStore {
    db: Db,
}

impl PgStore {
    pub fn new(db: Db) -> Self {
        Self { db }
    }
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &Filter) {
    match filter {
        Filter::Eq(field, value) => {
            builder.push("(data -> ");
            builder.push_bind(field.clone());
            builder.push(") = ");
            builder.push_bind(Json(value.clone()));
        }
        Filter::In(field, values) => {
            // A missing field yields `[null]`, which only matches a set containing null.
            builder.push("jsonb_build_array(data -> ");
            builder.push_bind(field.clone());
            builder.push(") <@ ");
            builder.push_bind(Json(Value::Array(values.clone())));
        }
        Filter::And(filters) => push_group(builder, filters, " AND ", "TRUE"),
        Filter::Or(filters) => push_group(builder, filters, " OR ", "FALSE"),
    }
}

fn push_group(
    builder: &mut QueryBuilder<'_, Postgres>,
    filters: &[Filter],
    separator: &str,
    empty: &str,
) {
    if filters.is_empty() {
        builder.push(empty);
        return;
    }

    builder.push("(");
    for (index, filter) in filters.iter().enumerate() {
        if index > 0 {
            builder.push(separator);
        }
        push_filter(builder, filter);
    }
    builder.push(")");
}

fn into_record(value: Value) -> Result<Record, StoreError> {
    match value {
        Value::Object(fields) => Ok(fields),
        other => Err(StoreError::InvalidRecord(format!(
            "stored data is not an object: {}",
            other
        ))),
    }
}

#[async_trait]
impl RecordStore for PgStore {
    async fn list(
        &self,
        entity: Entity,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<Page<Record>, StoreError> {
        let after = page.token.as_deref().map(Cursor::decode).transpose()?;

        let mut builder = QueryBuilder::<Postgres>::new(
            "SELECT id, created_at, data FROM records WHERE entity = ",
        );
        builder.push_bind(entity.as_db());
        builder.push(" AND ");
        push_filter(&mut builder, filter);

        if let Some(cursor) = after {
            builder.push(" AND (created_at < ");
            builder.push_bind(cursor.created_at);
            builder.push(" OR (created_at = ");
            builder.push_bind(cursor.created_at);
            builder.push(" AND id < ");
            builder.push_bind(cursor.id);
            builder.push("))");
        }

        builder.push(" ORDER BY created_at DESC, id DESC");
        if let Some(limit) = page.limit {
            builder.push(" LIMIT ");
            builder.push_bind(limit as i64 + 1);
        }

        let mut rows = builder.build().fetch_all(self.db.pool()).await?;

        let has_more = page.limit.map_or(false, |limit| rows.len() > limit);
        if let Some(limit) = page.limit {
            rows.truncate(limit);
        }

        let next_token = match rows.last() {
            Some(row) if has_more => {
                let created_at: OffsetDateTime = row.try_get("created_at")?;
                let id: String = row.try_get("id")?;
                Some(Cursor::new(created_at, id).encode()?)
            }
            _ => None,
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let Json(data): Json<Value> = row.try_get("data")?;
            records.push(into_record(data)?);
        }

        Ok(Page { records, next_token })
    }

    async fn get(&self, entity: Entity, id: &str) -> Result<Option<Record>, StoreError> {
        let row = sqlx::query("SELECT data FROM records WHERE entity = $1 AND id = $2")
            .bind(entity.as_db())
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.map(|row| {
            let Json(data): Json<Value> = row.try_get("data")?;
            into_record(data)
        })
        .transpose()
    }

    async fn create(&self, entity: Entity, mut fields: Record) -> Result<Record, StoreError> {
        let (id, created_at) = super::stamp(&mut fields, super::store_now())?;

        sqlx::query(
            "INSERT INTO records (entity, id, created_at, data) VALUES ($1, $2, $3, $4)",
        )
        .bind(entity.as_db())
        .bind(&id)
        .bind(created_at)
        .bind(Json(Value::Object(fields.clone())))
        .execute(self.db.pool())
        .await?;

        Ok(fields)
    }

    async fn increment(
        &self,
        entity: Entity,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Record, StoreError> {
        let updated_at = cursor::format_timestamp(super::store_now())?;
        let row = sqlx::query(
            "UPDATE records \
             SET data = jsonb_set( \
                    jsonb_set(data, ARRAY[$3::text], to_jsonb(COALESCE((data ->> $3::text)::bigint, 0) + $4::bigint), true), \
                    '{updatedAt}', to_jsonb($5::text), true) \
             WHERE entity = $1 AND id = $2 \
             RETURNING data",
        )
        .bind(entity.as_db())
        .bind(id)
        .bind(field)
        .bind(delta)
        .bind(updated_at)
        .fetch_optional(self.db.pool())
        .await?;

        let row = row.ok_or_else(|| StoreError::NotFound {
            entity,
            id: id.to_string(),
        })?;
        let Json(data): Json<Value> = row.try_get("data")?;
        into_record(data)
    }

    async fn delete(&self, entity: Entity, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM records WHERE entity = $1 AND id = $2")
            .bind(entity.as_db())
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(self.db.ping().await?)
    }
}
