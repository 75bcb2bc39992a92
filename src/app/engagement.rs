use serde::Serialize;

use crate::app::error::{require_identity, ServiceError, ServiceResult};
use crate::app::notifications::NotificationService;
use crate::domain::engagement::Like;
use crate::domain::notification::NotificationKind;
use crate::domain::post::Post;
use crate::infra::store::{decode, Entity, Filter, Page, PageRequest, Store, StoreExt};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeToggle {
    /// The like that was created or removed.
    pub id: String,
    pub is_liked: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewLike<'a> {
    user_id: &'a str,
    post_id: &'a str,
}

#[derive(Clone)]
pub struct EngagementService {
    store: Store,
    notifications: NotificationService,
}

impl EngagementService {
    pub fn new(store: Store) -> Self {
        Self {
            notifications: NotificationService::new(store.clone()),
            store,
        }
    }

    /// Likes the post, or removes the caller's existing like.
    pub async fn toggle_like(
        &self,
        user_id: Option<&str>,
        post_id: &str,
    ) -> ServiceResult<LikeToggle> {
        let user_id = require_identity(user_id)?;

        if self.store.get(Entity::Post, post_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("post {}", post_id)));
        }

        let existing: Page<Like> = self
            .store
            .list_as(
                Entity::Like,
                &Filter::and([
                    Filter::eq("userId", user_id),
                    Filter::eq("postId", post_id),
                ]),
                PageRequest::first(1),
            )
            .await?;

        if let Some(like) = existing.records.into_iter().next() {
            self.store.delete(Entity::Like, &like.id).await?;
            self.store
                .increment(Entity::Post, post_id, "likesCount", -1)
                .await?;
            return Ok(LikeToggle {
                id: like.id,
                is_liked: false,
            });
        }

        let like: Like = self
            .store
            .create_as(Entity::Like, &NewLike { user_id, post_id })
            .await?;
        let post: Post = decode(
            self.store
                .increment(Entity::Post, post_id, "likesCount", 1)
                .await?,
        )?;

        if post.author_id != user_id {
            self.notifications
                .notify(
                    NotificationKind::Like,
                    "Post liked",
                    "Someone liked your post",
                    &post.author_id,
                    Some(user_id),
                    Some(post_id),
                )
                .await?;
        }

        Ok(LikeToggle {
            id: like.id,
            is_liked: true,
        })
    }
}
