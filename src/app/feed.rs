use std::{collections::HashMap, sync::Arc};

use crate::{
    ArcStr,
    api::atproto::{AtprotoApi, Did},
    app::{FeedError, config::Config, store::Store},
    log::Log,
};

pub use data::{FeedAuthor, LoadMorePage};
pub use heap::MaxHeap;

mod core;
mod data;
mod heap;
#[cfg(test)]
mod tests;

/// Builds a viewer's feed: the authors they follow, most recently active
/// first, each with a first page of posts.
#[derive(Debug, Clone)]
pub struct Feed {
    core: Arc<self::core::Core>,
}

impl Feed {
    pub fn new(api: AtprotoApi, store: Store, config: Config, log: Log) -> Self {
        Self {
            core: Arc::new(self::core::Core::new(api, store, config, log)),
        }
    }

    /// Authors followed by `viewer` that have at least one post, newest
    /// activity first; ties keep follow order.
    ///
    /// `seen` maps an author to the newest post time the viewer has seen.
    /// Unreachable authors are left out. An unreachable follow graph yields
    /// an empty feed.
    ///
    /// # Errors
    /// Only when the cache store fails to persist.
    pub async fn build_feed(
        &self,
        viewer: Did,
        seen: HashMap<Did, ArcStr>,
    ) -> Result<Vec<FeedAuthor>, FeedError> {
        self.core.build_feed(viewer, seen).await
    }

    /// The page after `cursor` of a single author. Remote failures give an
    /// empty, exhausted page.
    pub async fn load_more_for_author(
        &self,
        did: Did,
        cursor: Option<ArcStr>,
    ) -> Result<LoadMorePage, FeedError> {
        self.core.load_more_for_author(did, cursor).await
    }
}
