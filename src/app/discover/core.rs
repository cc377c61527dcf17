use std::{collections::HashSet, sync::Arc};

use chrono::Utc;

use crate::{
    ArcStr,
    api::atproto::{AtprotoApi, Did, PageQuery, PostQuery},
    app::{
        FeedError,
        config::{Config, StrOpt, USizeOpt},
        store::{Activity, ActivityRecord, ActivityState, ActivityStatus, Store},
    },
    log::Log,
};

use super::data::{LiveUpdate, RecentActivityOptions};

const SCOPE: &str = "discover";

#[derive(Debug)]
pub struct Core {
    api: AtprotoApi,
    store: Store,
    config: Config,
    log: Log,
}

impl Core {
    pub fn new(api: AtprotoApi, store: Store, config: Config, log: Log) -> Self {
        Self {
            api,
            store,
            config,
            log,
        }
    }

    async fn category_or_default(&self, category: Option<ArcStr>) -> ArcStr {
        match category {
            Some(category) => category,
            None => self.config.string(StrOpt::Category).await,
        }
    }

    /// Serves the cached index or walks the relay directory. A failing page
    /// ends the walk; whatever was gathered is still cached.
    pub async fn list_accounts_for_category(&self, category: ArcStr) -> Result<Vec<Did>, FeedError> {
        if let Some(accounts) = self.store.account_index(category.clone()).await {
            return Ok(accounts);
        }

        let limit = self.config.usize(USizeOpt::DirectoryPageLimit).await.max(1);
        let mut seen = HashSet::new();
        let mut accounts = Vec::new();
        let mut cursor = None;
        loop {
            let query = PageQuery { limit, cursor };
            let page = match self.api.list_accounts_by_category(category.clone(), query).await {
                Ok(page) => page,
                Err(e) => {
                    self.log.warn(
                        SCOPE,
                        format!(
                            "Directory of {category} cut short at {} accounts: {e:#}",
                            accounts.len()
                        ),
                    );
                    break;
                }
            };
            if page.accounts.is_empty() {
                break;
            }
            for did in page.accounts {
                if seen.insert(did.clone()) {
                    accounts.push(did);
                }
            }
            cursor = page.cursor;
            if cursor.is_none() {
                break;
            }
        }

        self.log.info(
            SCOPE,
            format!("Indexed {} accounts for {category}", accounts.len()),
        );
        self.store
            .put_account_index(category, accounts.clone())
            .await
            .map_err(FeedError::Storage)?;
        Ok(accounts)
    }

    pub async fn get_recent_activity(
        self: &Arc<Self>,
        options: RecentActivityOptions,
    ) -> Result<Vec<Activity>, FeedError> {
        let category = self.category_or_default(options.category).await;
        let limit = match options.limit {
            Some(limit) => limit,
            None => self.config.usize(USizeOpt::ActivityLimit).await,
        };
        let batch_size = match options.batch_size {
            Some(size) => size,
            None => self.config.usize(USizeOpt::ActivityBatchSize).await,
        }
        .max(1);

        let accounts = self.list_accounts_for_category(category.clone()).await?;

        let mut activities = Vec::new();
        let mut unchecked = Vec::new();
        for did in accounts {
            match self.store.activity(category.clone(), did.clone()).await {
                ActivityStatus::HasContent(activity) => activities.push(activity),
                ActivityStatus::Unknown => unchecked.push(did),
                ActivityStatus::Empty if options.recheck_empty => unchecked.push(did),
                ActivityStatus::Empty => {}
            }
        }

        for batch in unchecked.chunks(batch_size) {
            let checks: Vec<_> = batch
                .iter()
                .map(|did| {
                    let core = Arc::clone(self);
                    let category = category.clone();
                    let did = did.clone();
                    tokio::spawn(async move { core.check_account(category, did).await })
                })
                .collect();

            let mut records = Vec::with_capacity(checks.len());
            for check in checks {
                match check.await {
                    Ok(record) => records.push(record),
                    Err(e) => self.log.error(SCOPE, format!("Activity check panicked: {e}")),
                }
            }
            activities.extend(records.iter().filter_map(|record| match record.status() {
                ActivityStatus::HasContent(activity) => Some(activity),
                _ => None,
            }));
            self.store
                .put_activities(records)
                .await
                .map_err(FeedError::Storage)?;
        }

        self.trim().await?;

        activities.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        activities.truncate(limit);
        Ok(activities)
    }

    /// Looks up the newest post of `did`. Any remote failure counts as
    /// "nothing to show".
    async fn check_account(&self, category: ArcStr, did: Did) -> ActivityRecord {
        let newest = async {
            let host = self.api.resolve_storage_host(did.clone()).await?;
            let query = PostQuery {
                collection: category.clone(),
                limit: 1,
                cursor: None,
                newest_first: true,
            };
            self.api.list_recent_posts(host, did.clone(), query).await
        };

        let state = match newest.await {
            Ok(page) => match page.posts.into_iter().next() {
                Some(post) => ActivityState::HasContent {
                    created_at: post.created_at,
                    content_id: post.attachment,
                    caption: post.caption,
                    alt_text: post.alt_text,
                },
                None => ActivityState::Empty,
            },
            Err(e) => {
                self.log
                    .warn(SCOPE, format!("Checking activity of {did} failed: {e:#}"));
                ActivityState::Empty
            }
        };

        ActivityRecord {
            category,
            account: did,
            state,
            checked_at: Utc::now(),
        }
    }

    pub async fn record_live_update(&self, update: LiveUpdate) -> Result<(), FeedError> {
        let category = self.category_or_default(update.category).await;

        let prepended = self
            .store
            .prepend_to_index(category.clone(), update.account.clone())
            .await
            .map_err(FeedError::Storage)?;
        if prepended {
            self.log.info(
                SCOPE,
                format!("Added {} to the {category} index", update.account),
            );
        }

        let record = ActivityRecord {
            category,
            account: update.account,
            state: ActivityState::HasContent {
                created_at: update.created_at,
                content_id: update.content_id,
                caption: update.caption,
                alt_text: update.alt_text,
            },
            checked_at: Utc::now(),
        };
        self.store
            .put_activity(record)
            .await
            .map_err(FeedError::Storage)?;

        self.trim().await
    }

    async fn trim(&self) -> Result<(), FeedError> {
        let capacity = self.config.usize(USizeOpt::ActivityCapacity).await;
        self.store
            .trim_activity(capacity)
            .await
            .map_err(FeedError::Storage)?;
        Ok(())
    }
}
