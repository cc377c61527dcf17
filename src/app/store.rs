use std::{collections::HashMap, sync::Arc};

use anyhow::Context;
use chrono::Utc;
use tokio::sync::{Mutex, mpsc::Sender, oneshot};

use crate::{
    ArcStr,
    api::atproto::{Did, PostPage, ProfileSummary},
    app::config::{Config, Ttls},
    fs::Fs,
    log::Log,
};

pub use data::{Activity, ActivityRecord, ActivityState, ActivityStatus, TableName, Tables};
use message::Message;

mod core;
mod data;
mod message;
#[cfg(test)]
mod tests;

/// The cache store: named tables of expiring entries, each persisted to its
/// own file under the cache directory.
///
/// Reads never fail; a missing or expired entry is a miss. Writes report
/// persistence failures.
#[derive(Debug, Clone)]
pub enum Store {
    Actual(Sender<Message>),
    /// In-memory tables, nothing touches the disk
    Mock(Arc<Mutex<Tables>>),
}

impl Store {
    /// Loads the persisted tables and starts serving them.
    pub async fn spawn(fs: Fs, config: Config, log: Log) -> anyhow::Result<Self> {
        let (store, _) = self::core::Core::build(fs, config, log).await?.spawn();
        Ok(store)
    }

    pub fn mock(ttls: Ttls) -> Self {
        Self::Mock(Arc::new(Mutex::new(Tables::new(ttls))))
    }

    /// Runs `f` against the tables of a mock store. Returns `None` for the
    /// real store.
    pub async fn inspect<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> Option<T> {
        match self {
            Self::Actual(_) => None,
            Self::Mock(tables) => Some(f(&mut *tables.lock().await)),
        }
    }

    async fn ask<T>(sender: &Sender<Message>, build: impl FnOnce(oneshot::Sender<T>) -> Message) -> T {
        let (tx, rx) = oneshot::channel();
        sender
            .send(build(tx))
            .await
            .context("Sending message to Store actor")
            .expect("Store actor died");
        rx.await
            .context("Awaiting response from Store actor")
            .expect("Store actor died")
    }

    pub async fn handle(&self, handle: ArcStr) -> Option<Did> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::Handle { handle, now, tx }).await
            }
            Self::Mock(tables) => tables.lock().await.handle(&handle, now),
        }
    }

    pub async fn put_handle(&self, handle: ArcStr, did: Did) -> anyhow::Result<()> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::PutHandle {
                    handle,
                    did,
                    now,
                    tx,
                })
                .await
            }
            Self::Mock(tables) => {
                tables.lock().await.put_handle(&handle, did, now);
                Ok(())
            }
        }
    }

    pub async fn storage_host(&self, did: Did) -> Option<ArcStr> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::StorageHost { did, now, tx }).await
            }
            Self::Mock(tables) => tables.lock().await.storage_host(&did, now),
        }
    }

    pub async fn put_storage_host(&self, did: Did, host: ArcStr) -> anyhow::Result<()> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::PutStorageHost { did, host, now, tx }).await
            }
            Self::Mock(tables) => {
                tables.lock().await.put_storage_host(&did, host, now);
                Ok(())
            }
        }
    }

    /// A cached page of `did`'s posts in `collection`. `None` as cursor
    /// names the first page.
    pub async fn author_page(
        &self,
        did: Did,
        collection: ArcStr,
        cursor: Option<ArcStr>,
    ) -> Option<PostPage> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::AuthorPage {
                    did,
                    collection,
                    cursor,
                    now,
                    tx,
                })
                .await
            }
            Self::Mock(tables) => {
                tables
                    .lock()
                    .await
                    .author_page(&did, &collection, cursor.as_deref(), now)
            }
        }
    }

    /// Caches a page of posts. First pages live shorter than deeper ones.
    pub async fn put_author_page(
        &self,
        did: Did,
        collection: ArcStr,
        cursor: Option<ArcStr>,
        page: PostPage,
    ) -> anyhow::Result<()> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::PutAuthorPage {
                    did,
                    collection,
                    cursor,
                    page,
                    now,
                    tx,
                })
                .await
            }
            Self::Mock(tables) => {
                tables
                    .lock()
                    .await
                    .put_author_page(&did, &collection, cursor.as_deref(), page, now);
                Ok(())
            }
        }
    }

    pub async fn follows(&self, viewer: Did) -> Option<Vec<Did>> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::Follows { viewer, now, tx }).await
            }
            Self::Mock(tables) => tables.lock().await.follows(&viewer, now),
        }
    }

    pub async fn put_follows(&self, viewer: Did, follows: Vec<Did>) -> anyhow::Result<()> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::PutFollows {
                    viewer,
                    follows,
                    now,
                    tx,
                })
                .await
            }
            Self::Mock(tables) => {
                tables.lock().await.put_follows(&viewer, follows, now);
                Ok(())
            }
        }
    }

    pub async fn profile(&self, did: Did) -> Option<ProfileSummary> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => Self::ask(sender, |tx| Message::Profile { did, now, tx }).await,
            Self::Mock(tables) => tables.lock().await.profile(&did, now),
        }
    }

    pub async fn put_profile(&self, did: Did, profile: ProfileSummary) -> anyhow::Result<()> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::PutProfile {
                    did,
                    profile,
                    now,
                    tx,
                })
                .await
            }
            Self::Mock(tables) => {
                tables.lock().await.put_profile(&did, profile, now);
                Ok(())
            }
        }
    }

    /// Accounts known to publish to `category`, newest discoveries first.
    pub async fn account_index(&self, category: ArcStr) -> Option<Vec<Did>> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::AccountIndex { category, now, tx }).await
            }
            Self::Mock(tables) => tables.lock().await.account_index(&category, now),
        }
    }

    pub async fn put_account_index(
        &self,
        category: ArcStr,
        accounts: Vec<Did>,
    ) -> anyhow::Result<()> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::PutAccountIndex {
                    category,
                    accounts,
                    now,
                    tx,
                })
                .await
            }
            Self::Mock(tables) => {
                tables.lock().await.put_account_index(&category, accounts, now);
                Ok(())
            }
        }
    }

    /// Adds `did` to the front of an existing index, keeping its expiry.
    /// Returns whether the index changed.
    pub async fn prepend_to_index(&self, category: ArcStr, did: Did) -> anyhow::Result<bool> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::PrependToIndex { category, did, tx }).await
            }
            Self::Mock(tables) => Ok(tables.lock().await.prepend_to_index(&category, did)),
        }
    }

    pub async fn activity(&self, category: ArcStr, did: Did) -> ActivityStatus {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::Activity {
                    category,
                    did,
                    now,
                    tx,
                })
                .await
            }
            Self::Mock(tables) => tables.lock().await.activity(&category, &did, now),
        }
    }

    pub async fn put_activity(&self, record: ActivityRecord) -> anyhow::Result<()> {
        self.put_activities(vec![record]).await
    }

    /// Upserts a batch of records with a single write of the table.
    pub async fn put_activities(&self, records: Vec<ActivityRecord>) -> anyhow::Result<()> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::PutActivities { records, tx }).await
            }
            Self::Mock(tables) => {
                let mut tables = tables.lock().await;
                for record in records {
                    tables.put_activity(record);
                }
                Ok(())
            }
        }
    }

    /// Keeps the `max` most recently checked activity records, across every
    /// category. Returns how many were evicted.
    pub async fn trim_activity(&self, max: usize) -> anyhow::Result<usize> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::TrimActivity { max, tx }).await
            }
            Self::Mock(tables) => Ok(tables.lock().await.trim_activity(max)),
        }
    }

    pub async fn seen_markers(&self, viewer: Did) -> HashMap<Did, ArcStr> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::SeenMarkers { viewer, tx }).await
            }
            Self::Mock(tables) => tables.lock().await.seen_markers(&viewer),
        }
    }

    /// Moves `viewer`'s marker for `author` forward to `created_at`.
    pub async fn mark_seen(
        &self,
        viewer: Did,
        author: Did,
        created_at: ArcStr,
    ) -> anyhow::Result<bool> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::MarkSeen {
                    viewer,
                    author,
                    created_at,
                    tx,
                })
                .await
            }
            Self::Mock(tables) => Ok(tables.lock().await.mark_seen(&viewer, &author, created_at)),
        }
    }

    /// Removes every expired entry from every table. Returns how many went.
    pub async fn delete_expired(&self) -> anyhow::Result<usize> {
        let now = Utc::now();
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::DeleteExpired { now, tx }).await
            }
            Self::Mock(tables) => Ok(tables
                .lock()
                .await
                .delete_expired(now)
                .into_iter()
                .map(|(_, n)| n)
                .sum()),
        }
    }
}
