use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde_json::Value;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::cursor::{self, Cursor};
use super::{Entity, Filter, Page, PageRequest, Record, RecordStore, StoreError};

#[derive(Debug, Clone)]
struct Stored {
    created_at: OffsetDateTime,
    record: Record,
}

/// Process-local store for tests and single-node development runs.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<BTreeMap<Entity, HashMap<String, Stored>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn list(
        &self,
        entity: Entity,
        filter: &Filter,
        page: PageRequest,
    ) -> Result<Page<Record>, StoreError> {
        let after = page.token.as_deref().map(Cursor::decode).transpose()?;

        let tables = self.tables.read().await;
        let mut matched: Vec<(&String, &Stored)> = tables
            .get(&entity)
            .into_iter()
            .flat_map(|table| table.iter())
            .filter(|(id, stored)| {
                after
                    .as_ref()
                    .map_or(true, |cursor| cursor.precedes(stored.created_at, id))
            })
            .filter(|(_, stored)| filter.matches(&stored.record))
            .collect();

        matched.sort_by(|(a_id, a), (b_id, b)| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b_id.cmp(a_id))
        });

        let next_token = match page.limit {
            Some(limit) if matched.len() > limit => {
                matched.truncate(limit);
                match matched.last() {
                    Some((id, stored)) => Some(Cursor::new(stored.created_at, id.as_str()).encode()?),
                    None => None,
                }
            }
            _ => None,
        };

        Ok(Page {
            records: matched
                .into_iter()
                .map(|(_, stored)| stored.record.clone())
                .collect(),
            next_token,
        })
    }

    async fn get(&self, entity: Entity, id: &str) -> Result<Option<Record>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(&entity)
            .and_then(|table| table.get(id))
            .map(|stored| stored.record.clone()))
    }

    async fn create(&self, entity: Entity, mut fields: Record) -> Result<Record, StoreError> {
        let (id, created_at) = super::stamp(&mut fields, super::store_now())?;

        let mut tables = self.tables.write().await;
        let table = tables.entry(entity).or_default();
        if table.contains_key(&id) {
            return Err(StoreError::InvalidRecord(format!("duplicate {} id {}", entity, id)));
        }
        table.insert(
            id,
            Stored {
                created_at,
                record: fields.clone(),
            },
        );

        Ok(fields)
    }

    async fn increment(
        &self,
        entity: Entity,
        id: &str,
        field: &str,
        delta: i64,
    ) -> Result<Record, StoreError> {
        let mut tables = self.tables.write().await;
        let stored = tables
            .get_mut(&entity)
            .and_then(|table| table.get_mut(id))
            .ok_or_else(|| StoreError::NotFound {
                entity,
                id: id.to_string(),
            })?;

        let current = stored
            .record
            .get(field)
            .and_then(Value::as_i64)
            .unwrap_or(0);
        stored
            .record
            .insert(field.to_string(), Value::from(current + delta));
        stored.record.insert(
            "updatedAt".to_string(),
            Value::String(cursor::format_timestamp(super::store_now())?),
        );

        Ok(stored.record.clone())
    }

    async fn delete(&self, entity: Entity, id: &str) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .get_mut(&entity)
            .and_then(|table| table.remove(id))
            .is_some())
    }
}
