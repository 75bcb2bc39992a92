use crate::app::error::{require_identity, ServiceResult};
use crate::domain::notification::{NewNotification, Notification, NotificationKind};
use crate::infra::store::{Entity, Filter, Page, PageRequest, Store, StoreExt};

#[derive(Clone)]
pub struct NotificationService {
    store: Store,
}

impl NotificationService {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    pub async fn notify(
        &self,
        kind: NotificationKind,
        title: &str,
        message: &str,
        user_id: &str,
        related_user_id: Option<&str>,
        related_post_id: Option<&str>,
    ) -> ServiceResult<Notification> {
        let fields = NewNotification {
            kind,
            title: title.to_string(),
            message: message.to_string(),
            is_read: false,
            user_id: user_id.to_string(),
            related_user_id: related_user_id.map(str::to_string),
            related_post_id: related_post_id.map(str::to_string),
        };

        Ok(self.store.create_as(Entity::Notification, &fields).await?)
    }

    pub async fn list(
        &self,
        user_id: Option<&str>,
        limit: usize,
        next_token: Option<String>,
    ) -> ServiceResult<Page<Notification>> {
        let user_id = require_identity(user_id)?;
        Ok(self
            .store
            .list_as(
                Entity::Notification,
                &Filter::eq("userId", user_id),
                PageRequest::new(limit, next_token),
            )
            .await?)
    }
}
