use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::debug;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::visitor::VisitorAnalytics;
use crate::infra::store::{Entity, Filter, Page, PageRequest, Store, StoreExt};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackVisitInput {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub referrer: Option<String>,
    pub page: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_on_page: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VisitRecord<'a> {
    #[serde(flatten)]
    visit: &'a TrackVisitInput,
    #[serde(with = "time::serde::rfc3339")]
    timestamp: OffsetDateTime,
    is_new_visitor: bool,
    is_returning_visitor: bool,
}

/// Page-view tracking for anonymous and signed-in visitors alike.
#[derive(Clone)]
pub struct VisitorService {
    store: Store,
}

impl VisitorService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn track(
        &self,
        visit: TrackVisitInput,
        now: OffsetDateTime,
    ) -> ServiceResult<VisitorAnalytics> {
        if visit.session_id.trim().is_empty() {
            return Err(ServiceError::Invalid("sessionId is required".to_string()));
        }
        if visit.page.trim().is_empty() {
            return Err(ServiceError::Invalid("page is required".to_string()));
        }

        let earlier: Page<VisitorAnalytics> = self
            .store
            .list_as(
                Entity::VisitorAnalytics,
                &Filter::eq("sessionId", visit.session_id.as_str()),
                PageRequest::first(1),
            )
            .await?;
        let is_new_visitor = earlier.records.is_empty();

        let record: VisitorAnalytics = self
            .store
            .create_as(
                Entity::VisitorAnalytics,
                &VisitRecord {
                    visit: &visit,
                    timestamp: now,
                    is_new_visitor,
                    is_returning_visitor: !is_new_visitor,
                },
            )
            .await?;

        debug!(session_id = %record.session_id, page = %record.page, is_new_visitor, "visit tracked");
        Ok(record)
    }
}
