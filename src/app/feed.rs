use serde::Serialize;
use tracing::debug;

use crate::app::error::{require_identity, ServiceResult};
use crate::domain::post::Post;
use crate::domain::social_graph::Follow;
use crate::infra::store::{Entity, Filter, Page, PageRequest, Store, StoreExt};

pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedPage {
    pub items: Vec<Post>,
    pub next_token: Option<String>,
}

#[derive(Clone)]
pub struct FeedService {
    store: Store,
    default_page_size: usize,
}

impl FeedService {
    pub fn new(store: Store) -> Self {
        Self {
            store,
            default_page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_default_page_size(mut self, page_size: usize) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Newest-first page of public posts from the accounts `viewer_id` follows,
    /// or of every public post when the viewer follows no one.
    ///
    /// The continuation token is passed to and returned from the store
    /// unchanged. Pages are not deduplicated against each other.
    pub async fn assemble_feed(
        &self,
        viewer_id: Option<&str>,
        page_size: Option<usize>,
        next_token: Option<String>,
    ) -> ServiceResult<FeedPage> {
        let viewer_id = require_identity(viewer_id)?;

        // Unpaged on purpose: the whole followee set feeds the post filter.
        let following: Vec<Follow> = self
            .store
            .list_all_as(Entity::Follow, &Filter::eq("followerId", viewer_id))
            .await?;
        let followee_ids: Vec<String> = following
            .into_iter()
            .map(|follow| follow.following_id)
            .collect();

        let filter = if followee_ids.is_empty() {
            Filter::eq("isPublic", true)
        } else {
            Filter::and([
                Filter::eq("isPublic", true),
                Filter::any_of("authorId", followee_ids.iter().map(String::as_str)),
            ])
        };

        let page_size = page_size.unwrap_or(self.default_page_size);
        let page: Page<Post> = self
            .store
            .list_as(Entity::Post, &filter, PageRequest::new(page_size, next_token))
            .await?;

        let mut items = page.records;
        sort_newest_first(&mut items);

        debug!(
            viewer_id,
            followees = followee_ids.len(),
            returned = items.len(),
            has_more = page.next_token.is_some(),
            "assembled feed page"
        );

        Ok(FeedPage {
            items,
            next_token: page.next_token,
        })
    }
}

/// Stable sort by effective publish time, newest first; ties keep store order.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| b.effective_time().cmp(&a.effective_time()));
}
