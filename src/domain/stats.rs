use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Derived engagement metrics for one account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsReport {
    pub user: UserSummary,
    pub engagement: EngagementSummary,
    pub activity: ActivitySummary,
    pub growth: GrowthSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub posts_count: usize,
    pub followers_count: usize,
    pub following_count: usize,
    pub likes_given: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngagementSummary {
    pub total_likes: i64,
    pub total_comments: i64,
    pub total_shares: i64,
    pub total_views: i64,
    pub total_engagement: i64,
    pub engagement_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivitySummary {
    pub recent_posts_count: usize,
    pub top_posts: Vec<TopPost>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopPost {
    pub id: String,
    pub content: String,
    pub likes_count: i64,
    pub comments_count: i64,
    pub shares_count: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub published_at: OffsetDateTime,
}

/// Always zero: no historical snapshots exist to diff against.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthSummary {
    pub followers_growth: i64,
    pub engagement_growth: i64,
}
