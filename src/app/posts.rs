use std::sync::LazyLock;

use futures::future::try_join_all;
use regex::Regex;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tracing::warn;

use crate::app::error::{require_identity, ServiceError, ServiceResult};
use crate::app::notifications::NotificationService;
use crate::domain::notification::NotificationKind;
use crate::domain::post::Post;
use crate::domain::user::User;
use crate::infra::store::{
    to_store_precision, Entity, Filter, Page, PageRequest, Store, StoreExt,
};

// ASCII word characters plus the Hebrew block.
static HASHTAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"#[0-9A-Za-z_\x{0590}-\x{05FF}]+").expect("invalid hashtag regex")
});
static MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"@[0-9A-Za-z_\x{0590}-\x{05FF}]+").expect("invalid mention regex")
});

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostInput {
    pub content: String,
    pub media_urls: Option<Vec<String>>,
    pub hashtags: Option<Vec<String>>,
    pub mentions: Option<Vec<String>>,
    pub location: Option<String>,
    pub is_public: Option<bool>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct NewPost<'a> {
    author_id: &'a str,
    content: &'a str,
    media_urls: Vec<String>,
    hashtags: Vec<String>,
    mentions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    location: Option<String>,
    is_public: bool,
    #[serde(with = "time::serde::rfc3339")]
    published_at: OffsetDateTime,
    likes_count: i64,
    comments_count: i64,
    shares_count: i64,
    views_count: i64,
}

#[derive(Clone)]
pub struct PostService {
    store: Store,
    notifications: NotificationService,
}

impl PostService {
    pub fn new(store: Store) -> Self {
        Self {
            notifications: NotificationService::new(store.clone()),
            store,
        }
    }

    pub async fn create_post(
        &self,
        author_id: Option<&str>,
        input: CreatePostInput,
        now: OffsetDateTime,
    ) -> ServiceResult<Post> {
        let author_id = require_identity(author_id)?;
        if self.store.get(Entity::User, author_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("user {}", author_id)));
        }

        let hashtags = input
            .hashtags
            .unwrap_or_else(|| extract_hashtags(&input.content));
        let mentions = input
            .mentions
            .unwrap_or_else(|| extract_mentions(&input.content));

        let fields = NewPost {
            author_id,
            content: &input.content,
            media_urls: input.media_urls.unwrap_or_default(),
            hashtags,
            mentions,
            location: input.location,
            is_public: input.is_public.unwrap_or(true),
            published_at: to_store_precision(now),
            likes_count: 0,
            comments_count: 0,
            shares_count: 0,
            views_count: 0,
        };
        let post: Post = self.store.create_as(Entity::Post, &fields).await?;

        self.store
            .increment(Entity::User, author_id, "postsCount", 1)
            .await?;

        if !post.mentions.is_empty() {
            // Best effort: the post exists either way.
            if let Err(err) = self.notify_mentions(&post).await {
                warn!(error = ?err, post_id = %post.id, "failed to create mention notifications");
            }
        }

        Ok(post)
    }

    async fn notify_mentions(&self, post: &Post) -> ServiceResult<()> {
        let lookups = post.mentions.iter().map(|mention| {
            let username = mention.trim_start_matches('@').to_string();
            async move {
                let page: Page<User> = self
                    .store
                    .list_as(
                        Entity::User,
                        &Filter::eq("username", username),
                        PageRequest::first(1),
                    )
                    .await?;
                Ok::<_, ServiceError>(page.records.into_iter().next())
            }
        });
        let mentioned = try_join_all(lookups).await?;

        let notices = mentioned
            .into_iter()
            .flatten()
            .filter(|user| user.id != post.author_id)
            .map(|user| async move {
                self.notifications
                    .notify(
                        NotificationKind::Mention,
                        "You were mentioned in a post",
                        "You were mentioned in a post",
                        &user.id,
                        Some(post.author_id.as_str()),
                        Some(post.id.as_str()),
                    )
                    .await
            });
        try_join_all(notices).await?;

        Ok(())
    }
}

/// `#tags` in order of appearance, sigil included.
pub fn extract_hashtags(content: &str) -> Vec<String> {
    HASHTAG_REGEX
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// `@mentions` in order of appearance, sigil included.
pub fn extract_mentions(content: &str) -> Vec<String> {
    MENTION_REGEX
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_tags_in_order() {
        let content = "Launch day! #rust #async and more #rust";
        assert_eq!(extract_hashtags(content), vec!["#rust", "#async", "#rust"]);
    }

    #[test]
    fn extracts_mentions_with_sigil() {
        let content = "thanks @alice_b and @bob, cc nobody@";
        assert_eq!(extract_mentions(content), vec!["@alice_b", "@bob"]);
    }

    #[test]
    fn tags_stop_at_non_ascii_latin() {
        assert_eq!(extract_hashtags("#café au lait"), vec!["#caf"]);
        assert_eq!(extract_mentions("hi @zoë"), vec!["@zo"]);
    }

    #[test]
    fn hebrew_words_are_tags() {
        assert_eq!(extract_hashtags("#שלום world"), vec!["#שלום"]);
    }

    #[test]
    fn plain_text_has_nothing() {
        assert!(extract_hashtags("no tags here").is_empty());
        assert!(extract_mentions("no mentions here").is_empty());
    }
}
