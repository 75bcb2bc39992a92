use time::{Duration, OffsetDateTime};
use tracing::debug;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::engagement::Like;
use crate::domain::post::Post;
use crate::domain::social_graph::Follow;
use crate::domain::stats::{
    ActivitySummary, EngagementSummary, GrowthSummary, StatsReport, TopPost, UserSummary,
};
use crate::infra::store::{Entity, Filter, Store, StoreExt};

pub const DEFAULT_RECENT_WINDOW: Duration = Duration::days(30);
const TOP_POSTS_LIMIT: usize = 5;
const PREVIEW_CHARS: usize = 100;

#[derive(Clone)]
pub struct StatsService {
    store: Store,
    recent_window: Duration,
}

impl StatsService {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            recent_window: DEFAULT_RECENT_WINDOW,
        }
    }

    pub fn with_recent_window(mut self, recent_window: Duration) -> Self {
        self.recent_window = recent_window;
        self
    }

    /// Reduces everything the store holds about `subject_id` into a report.
    ///
    /// The four lookups run concurrently; any failure fails the whole report.
    pub async fn compute_stats(
        &self,
        subject_id: &str,
        now: OffsetDateTime,
    ) -> ServiceResult<StatsReport> {
        let recent_since = now.checked_sub(self.recent_window).ok_or_else(|| {
            ServiceError::Invalid(format!(
                "recent window of {} days reaches before the earliest supported date",
                self.recent_window.whole_days()
            ))
        })?;

        let authored = Filter::eq("authorId", subject_id);
        let followed_by = Filter::eq("followingId", subject_id);
        let follows = Filter::eq("followerId", subject_id);
        let liked_by = Filter::eq("userId", subject_id);

        let (posts, followers, following, likes): (Vec<Post>, Vec<Follow>, Vec<Follow>, Vec<Like>) =
            tokio::try_join!(
                self.store.list_all_as(Entity::Post, &authored),
                self.store.list_all_as(Entity::Follow, &followed_by),
                self.store.list_all_as(Entity::Follow, &follows),
                self.store.list_all_as(Entity::Like, &liked_by),
            )?;

        debug!(
            subject_id,
            posts = posts.len(),
            followers = followers.len(),
            following = following.len(),
            likes = likes.len(),
            "loaded stats inputs"
        );

        Ok(summarize(
            subject_id,
            posts,
            followers.len(),
            following.len(),
            likes.len(),
            recent_since,
        ))
    }
}

/// Pure reduction behind [`StatsService::compute_stats`]. Posts at or after
/// `recent_since` count as recent activity.
pub fn summarize(
    subject_id: &str,
    mut posts: Vec<Post>,
    followers_count: usize,
    following_count: usize,
    likes_given: usize,
    recent_since: OffsetDateTime,
) -> StatsReport {
    let total_likes: i64 = posts.iter().map(Post::likes).sum();
    let total_comments: i64 = posts.iter().map(Post::comments).sum();
    let total_shares: i64 = posts.iter().map(Post::shares).sum();
    let total_views: i64 = posts.iter().map(Post::views).sum();
    let total_engagement = total_likes + total_comments + total_shares;

    let engagement_rate = if posts.is_empty() {
        0.0
    } else {
        round_to_hundredths(total_engagement as f64 / posts.len() as f64)
    };

    let recent_posts_count = posts
        .iter()
        .filter(|post| post.effective_time() >= recent_since)
        .count();

    let posts_count = posts.len();

    // Stable: equal scores keep store order.
    posts.sort_by(|a, b| b.engagement_score().cmp(&a.engagement_score()));
    let top_posts = posts
        .into_iter()
        .take(TOP_POSTS_LIMIT)
        .map(|post| TopPost {
            published_at: post.effective_time(),
            likes_count: post.likes(),
            comments_count: post.comments(),
            shares_count: post.shares(),
            content: preview(&post.content),
            id: post.id,
        })
        .collect();

    StatsReport {
        user: UserSummary {
            id: subject_id.to_string(),
            posts_count,
            followers_count,
            following_count,
            likes_given,
        },
        engagement: EngagementSummary {
            total_likes,
            total_comments,
            total_shares,
            total_views,
            total_engagement,
            engagement_rate,
        },
        activity: ActivitySummary {
            recent_posts_count,
            top_posts,
        },
        growth: GrowthSummary::default(),
    }
}

/// First 100 characters of `content`, with `...` appended when anything was cut.
pub fn preview(content: &str) -> String {
    match content.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => format!("{}...", &content[..cut]),
        None => content.to_string(),
    }
}

// Half-up for the non-negative rates this sees.
fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
