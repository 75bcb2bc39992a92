pub mod app;
pub mod config;
pub mod domain;
pub mod http;
pub mod infra;

use crate::config::AppConfig;
use crate::infra::store::Store;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub feed_default_page_size: usize,
    pub feed_max_page_size: usize,
    pub stats_recent_window: time::Duration,
}

impl AppState {
    pub fn new(store: Store, config: &AppConfig) -> Self {
        Self {
            store,
            feed_default_page_size: config.feed_default_page_size,
            feed_max_page_size: config.feed_max_page_size,
            stats_recent_window: config.stats_recent_window(),
        }
    }
}
