//! Timeline adapter that plugs the REST client into the pruning engine.
use async_trait::async_trait;
use ebb_common::Result;
use ebb_prune::{BulkRemove, PageSource};

use crate::twitter::client::TwitterApi;
use crate::twitter::types::{TimelineQuery, Tweet};

/// One account's post history, viewed as pages of prunable items.
pub struct UserTimeline<'a> {
    api: &'a TwitterApi,
    screen_name: String,
    page_size: u32,
    include_rts: bool,
}

impl<'a> UserTimeline<'a> {
    pub fn new(api: &'a TwitterApi, screen_name: impl Into<String>) -> Self {
        Self {
            api,
            screen_name: screen_name.into(),
            page_size: 200,
            include_rts: true,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn with_retweets(mut self, include_rts: bool) -> Self {
        self.include_rts = include_rts;
        self
    }
}

#[async_trait]
impl PageSource for UserTimeline<'_> {
    type Item = Tweet;

    async fn page_before(&self, before_id: Option<u64>) -> Result<Vec<Tweet>> {
        let query = TimelineQuery {
            count: self.page_size,
            include_rts: self.include_rts,
            max_id: before_id,
        };
        self.api.user_timeline(&self.screen_name, &query).await
    }
}

#[async_trait]
impl BulkRemove for UserTimeline<'_> {
    async fn delete_all(&self, items: &[Tweet]) -> Result<()> {
        self.api.destroy_all(items).await
    }
}
