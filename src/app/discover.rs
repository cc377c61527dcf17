use std::sync::Arc;

use crate::{
    ArcStr,
    api::atproto::{AtprotoApi, Did},
    app::{FeedError, config::Config, store::{Activity, Store}},
    log::Log,
};

pub use data::{LiveUpdate, RecentActivityOptions};

mod core;
mod data;

/// Finds the accounts publishing to a category and keeps track of what each
/// of them posted last.
///
/// Runs on the caller's task; there is no actor loop behind it. Clones share
/// the same collaborators.
///
/// # Examples
/// ```ignore
/// let discover = Discover::new(api, store, config, log);
/// let recent = discover
///     .get_recent_activity(RecentActivityOptions::default())
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct Discover {
    core: Arc<self::core::Core>,
}

impl Discover {
    pub fn new(api: AtprotoApi, store: Store, config: Config, log: Log) -> Self {
        Self {
            core: Arc::new(self::core::Core::new(api, store, config, log)),
        }
    }

    /// Every account that ever published to `category`, without duplicates,
    /// in the order the directory listed them.
    pub async fn list_accounts_for_category(&self, category: ArcStr) -> Result<Vec<Did>, FeedError> {
        self.core.list_accounts_for_category(category).await
    }

    /// The newest activity across a category, newest first.
    ///
    /// Accounts are checked in sequential batches, each batch concurrently.
    /// Unreachable accounts are recorded as empty and left out.
    pub async fn get_recent_activity(
        &self,
        options: RecentActivityOptions,
    ) -> Result<Vec<Activity>, FeedError> {
        self.core.get_recent_activity(options).await
    }

    /// Folds a pushed post into the caches without asking the network.
    pub async fn record_live_update(&self, update: LiveUpdate) -> Result<(), FeedError> {
        self.core.record_live_update(update).await
    }
}
