use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author_id: String,
    pub content: String,
    #[serde(default)]
    pub media_urls: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub mentions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub published_at: Option<OffsetDateTime>,
    // Counters are maintained by the like/comment/share handlers; absent means 0.
    #[serde(default)]
    pub likes_count: Option<i64>,
    #[serde(default)]
    pub comments_count: Option<i64>,
    #[serde(default)]
    pub shares_count: Option<i64>,
    #[serde(default)]
    pub views_count: Option<i64>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

fn default_public() -> bool {
    true
}

impl Post {
    /// Publication time, or creation time for posts that were never published.
    pub fn effective_time(&self) -> OffsetDateTime {
        self.published_at.unwrap_or(self.created_at)
    }

    pub fn likes(&self) -> i64 {
        self.likes_count.unwrap_or(0)
    }

    pub fn comments(&self) -> i64 {
        self.comments_count.unwrap_or(0)
    }

    pub fn shares(&self) -> i64 {
        self.shares_count.unwrap_or(0)
    }

    pub fn views(&self) -> i64 {
        self.views_count.unwrap_or(0)
    }

    pub fn engagement_score(&self) -> i64 {
        self.likes() + self.comments() + self.shares()
    }
}
