use std::{collections::HashMap, future::Future, sync::Arc, time::Duration};

use tokio::sync::Semaphore;

use crate::{
    ArcStr,
    api::atproto::{AtprotoApi, Did, PostPage, PostQuery, ProfileSummary},
    app::{
        FeedError,
        config::{Config, StrOpt, USizeOpt},
        store::Store,
    },
    log::Log,
};

use super::{
    data::{AuthorState, FeedAuthor, LoadMorePage},
    heap::MaxHeap,
};

const SCOPE: &str = "feed";

#[derive(Debug)]
pub struct Core {
    api: AtprotoApi,
    store: Store,
    config: Config,
    log: Log,
}

/// Limits of one feed build, read from the configuration once per call.
#[derive(Debug, Clone, Copy)]
struct Budget {
    page_size: usize,
    timeout: Duration,
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

    /// Runs a remote call under the per-call deadline. Failures and timeouts
    /// are logged and come back as `None`.
    async fn bounded<T>(
        &self,
        timeout: Duration,
        what: impl FnOnce() -> String,
        call: impl Future<Output = anyhow::Result<T>>,
    ) -> Option<T> {
        match tokio::time::timeout(timeout, call).await {
            Ok(Ok(value)) => Some(value),
            Ok(Err(e)) => {
                self.log.warn(SCOPE, format!("{} failed: {e:#}", what()));
                None
            }
            Err(_) => {
                self.log.warn(
                    SCOPE,
                    format!("{} timed out after {}ms", what(), timeout.as_millis()),
                );
                None
            }
        }
    }

    /// The viewer's follows, from the cache or the social graph. `None` when
    /// the graph could not be reached.
    async fn follows(&self, viewer: &Did) -> Result<Option<Vec<Did>>, FeedError> {
        if let Some(follows) = self.store.follows(viewer.clone()).await {
            return Ok(Some(follows));
        }

        let cap = self.config.usize(USizeOpt::FollowCap).await;
        let mut follows = match self.api.resolve_follows(viewer.clone(), cap).await {
            Ok(follows) => follows,
            Err(e) => {
                self.log
                    .warn(SCOPE, format!("Resolving follows of {viewer} failed: {e:#}"));
                return Ok(None);
            }
        };
        follows.truncate(cap);

        self.store
            .put_follows(viewer.clone(), follows.clone())
            .await
            .map_err(FeedError::Storage)?;
        Ok(Some(follows))
    }

    pub async fn build_feed(
        self: &Arc<Self>,
        viewer: Did,
        seen: HashMap<Did, ArcStr>,
    ) -> Result<Vec<FeedAuthor>, FeedError> {
        let Some(follows) = self.follows(&viewer).await? else {
            return Ok(Vec::new());
        };

        let budget = Budget {
            page_size: self.config.usize(USizeOpt::PageSize).await.max(1),
            timeout: Duration::from_millis(
                self.config.usize(USizeOpt::AuthorTimeoutMs).await as u64,
            ),
        };
        let window = Arc::new(Semaphore::new(
            self.config.usize(USizeOpt::Concurrency).await.max(1),
        ));

        // Handles are awaited in follow order, so the result never depends
        // on which author finished first
        let inits: Vec<_> = follows
            .into_iter()
            .enumerate()
            .map(|(index, did)| {
                let core = Arc::clone(self);
                let window = Arc::clone(&window);
                tokio::spawn(async move {
                    let Ok(_permit) = window.acquire_owned().await else {
                        return Ok(None);
                    };
                    core.init_author(index, did, budget).await
                })
            })
            .collect();

        let mut heap = MaxHeap::with_capacity(inits.len(), |a: &AuthorState, b: &AuthorState| {
            a.newest().cmp(&b.newest()).then(b.index.cmp(&a.index))
        });
        for init in inits {
            match init.await {
                Ok(Ok(Some(state))) if !state.buffer.is_empty() => heap.push(state),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(e),
                Err(e) => self.log.error(SCOPE, format!("Author setup panicked: {e}")),
            }
        }

        let mut authors: Vec<FeedAuthor> = heap
            .map(|state| {
                let marker = seen.get(&state.account_id);
                state.into_feed_author(marker)
            })
            .collect();
        authors.sort_by(|a, b| b.newest_post_time.cmp(&a.newest_post_time));

        self.log.info(
            SCOPE,
            format!("Built feed of {} authors for {viewer}", authors.len()),
        );
        Ok(authors)
    }

    /// Resolves the storage host, the first page and the profile of one
    /// author. `None` drops the author from the feed.
    async fn init_author(
        &self,
        index: usize,
        did: Did,
        budget: Budget,
    ) -> Result<Option<AuthorState>, FeedError> {
        let Some(storage_host) = self
            .bounded(
                budget.timeout,
                || format!("Resolving storage host of {did}"),
                self.api.resolve_storage_host(did.clone()),
            )
            .await
        else {
            return Ok(None);
        };

        let collection = self.config.string(StrOpt::Category).await;
        let cached = self
            .store
            .author_page(did.clone(), collection.clone(), None)
            .await;
        let page = match cached {
            Some(page) => page,
            None => {
                let query = PostQuery {
                    collection: collection.clone(),
                    limit: budget.page_size,
                    cursor: None,
                    newest_first: true,
                };
                let Some(page) = self
                    .bounded(
                        budget.timeout,
                        || format!("Listing posts of {did}"),
                        self.api
                            .list_recent_posts(storage_host.clone(), did.clone(), query),
                    )
                    .await
                else {
                    return Ok(None);
                };
                self.store
                    .put_author_page(did.clone(), collection, None, page.clone())
                    .await
                    .map_err(FeedError::Storage)?;
                page
            }
        };
        if page.posts.is_empty() {
            return Ok(None);
        }

        let profile = self.profile(&did, budget.timeout).await?;
        let exhausted = is_exhausted(&page, budget.page_size);
        let mut buffer = page.posts;
        buffer.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        Ok(Some(AuthorState {
            index,
            account_id: did,
            storage_host,
            cursor: page.cursor,
            buffer,
            exhausted,
            profile,
        }))
    }

    /// Cached or freshly fetched profile. A missing profile leaves the author
    /// in the feed under their account id.
    async fn profile(&self, did: &Did, timeout: Duration) -> Result<Option<ProfileSummary>, FeedError> {
        if let Some(profile) = self.store.profile(did.clone()).await {
            return Ok(Some(profile));
        }
        let Some(profile) = self
            .bounded(
                timeout,
                || format!("Fetching profile of {did}"),
                self.api.fetch_profile_summary(did.clone()),
            )
            .await
        else {
            return Ok(None);
        };
        self.store
            .put_profile(did.clone(), profile.clone())
            .await
            .map_err(FeedError::Storage)?;
        Ok(Some(profile))
    }

    pub async fn load_more_for_author(
        &self,
        did: Did,
        cursor: Option<ArcStr>,
    ) -> Result<LoadMorePage, FeedError> {
        let page_size = self.config.usize(USizeOpt::PageSize).await.max(1);

        let collection = self.config.string(StrOpt::Category).await;
        let cached = self
            .store
            .author_page(did.clone(), collection.clone(), cursor.clone())
            .await;
        let page = match cached {
            Some(page) => page,
            None => {
                let query = PostQuery {
                    collection: collection.clone(),
                    limit: page_size,
                    cursor: cursor.clone(),
                    newest_first: true,
                };
                let fetched = async {
                    let host = self.api.resolve_storage_host(did.clone()).await?;
                    self.api.list_recent_posts(host, did.clone(), query).await
                };
                match fetched.await {
                    Ok(page) => {
                        self.store
                            .put_author_page(did.clone(), collection, cursor, page.clone())
                            .await
                            .map_err(FeedError::Storage)?;
                        page
                    }
                    Err(e) => {
                        self.log
                            .warn(SCOPE, format!("Loading more posts of {did} failed: {e:#}"));
                        return Ok(LoadMorePage::exhausted());
                    }
                }
            }
        };

        let exhausted = is_exhausted(&page, page_size);
        Ok(LoadMorePage {
            posts: page.posts,
            cursor: page.cursor,
            exhausted,
        })
    }
}

fn is_exhausted(page: &PostPage, page_size: usize) -> bool {
    page.posts.len() < page_size || page.cursor.is_none()
}
