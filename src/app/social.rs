use serde::Serialize;
use tracing::info;

use crate::app::error::{require_identity, ServiceError, ServiceResult};
use crate::app::notifications::NotificationService;
use crate::domain::notification::NotificationKind;
use crate::domain::social_graph::Follow;
use crate::infra::store::{Entity, Filter, Page, PageRequest, Store, StoreExt};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewFollow<'a> {
    follower_id: &'a str,
    following_id: &'a str,
}

#[derive(Clone)]
pub struct SocialService {
    store: Store,
    notifications: NotificationService,
}

impl SocialService {
    pub fn new(store: Store) -> Self {
        Self {
            notifications: NotificationService::new(store.clone()),
            store,
        }
    }

    pub async fn follow(
        &self,
        follower_id: Option<&str>,
        following_id: &str,
    ) -> ServiceResult<Follow> {
        let follower_id = require_identity(follower_id)?;
        if follower_id == following_id {
            return Err(ServiceError::Invalid("cannot follow yourself".to_string()));
        }

        for user_id in [follower_id, following_id] {
            if self.store.get(Entity::User, user_id).await?.is_none() {
                return Err(ServiceError::NotFound(format!("user {}", user_id)));
            }
        }

        let existing: Page<Follow> = self
            .store
            .list_as(
                Entity::Follow,
                &Filter::and([
                    Filter::eq("followerId", follower_id),
                    Filter::eq("followingId", following_id),
                ]),
                PageRequest::first(1),
            )
            .await?;
        if !existing.records.is_empty() {
            return Err(ServiceError::Conflict(
                "already following this user".to_string(),
            ));
        }

        let follow: Follow = self
            .store
            .create_as(
                Entity::Follow,
                &NewFollow {
                    follower_id,
                    following_id,
                },
            )
            .await?;

        self.store
            .increment(Entity::User, follower_id, "followingCount", 1)
            .await?;
        self.store
            .increment(Entity::User, following_id, "followersCount", 1)
            .await?;

        self.notifications
            .notify(
                NotificationKind::Follow,
                "New follower",
                "Someone started following you",
                following_id,
                Some(follower_id),
                None,
            )
            .await?;

        info!(follower_id, following_id, "follow created");
        Ok(follow)
    }
}
