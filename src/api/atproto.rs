use std::sync::Arc;

use anyhow::Context;
use tokio::sync::{mpsc::Sender, oneshot};

use crate::{ArcStr, app::config::Config, app::store::Store, log::Log, net::Net};

mod core;
mod data;
mod message;
mod mock;
mod parse;
#[cfg(test)]
mod tests;

pub use self::core::{did_document_url, xrpc_url};
pub use data::{AccountPage, Did, PageQuery, Post, PostPage, PostQuery, ProfileSummary};
pub use mock::{MockData, MockStats};
use message::Message;

/// Client for the federated network: identity, social graph, relay
/// directory and per-account storage hosts.
///
/// # Examples
/// ```ignore
/// let api = AtprotoApi::spawn(net, store, config, log).await;
/// let host = api.resolve_storage_host(did.clone()).await?;
/// let page = api.list_recent_posts(host, did, query).await?;
/// ```
#[derive(Debug, Clone)]
pub enum AtprotoApi {
    Actual(Sender<Message>),
    Mock(mock::Mock),
}

impl AtprotoApi {
    pub async fn spawn(net: Net, store: Store, config: Config, log: Log) -> Self {
        let (api, _) = core::Core::new(net, store, config, log).await.spawn();
        api
    }

    pub fn mock(data: MockData) -> Self {
        Self::Mock(mock::Mock::new(data))
    }

    /// Counters of a mock client.
    pub fn stats(&self) -> Option<Arc<MockStats>> {
        match self {
            Self::Actual(_) => None,
            Self::Mock(mock) => Some(mock.stats()),
        }
    }

    /// Changes the remote world of a mock client. No-op for the real one.
    pub async fn update_mock(&self, f: impl FnOnce(&mut MockData)) {
        if let Self::Mock(mock) = self {
            mock.update(f).await;
        }
    }

    async fn ask<T>(
        sender: &Sender<Message>,
        build: impl FnOnce(oneshot::Sender<anyhow::Result<T>>) -> Message,
    ) -> anyhow::Result<T> {
        let (tx, rx) = oneshot::channel();
        sender
            .send(build(tx))
            .await
            .context("Sending message to AtprotoApi actor")?;
        rx.await.context("Awaiting response from AtprotoApi actor")?
    }

    /// Turns a handle (with or without `@`) into an account id. Account ids
    /// pass through unchanged.
    pub async fn resolve_handle(&self, handle: ArcStr) -> anyhow::Result<Did> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::ResolveHandle { handle, tx }).await
            }
            Self::Mock(mock) => mock.resolve_handle(handle).await,
        }
    }

    /// Base URL of the server holding `did`'s records.
    pub async fn resolve_storage_host(&self, did: Did) -> anyhow::Result<ArcStr> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::ResolveStorageHost { did, tx }).await
            }
            Self::Mock(mock) => mock.resolve_storage_host(did).await,
        }
    }

    /// Accounts followed by `viewer`, in follow order, at most `cap` of them.
    pub async fn resolve_follows(&self, viewer: Did, cap: usize) -> anyhow::Result<Vec<Did>> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::ResolveFollows { viewer, cap, tx }).await
            }
            Self::Mock(mock) => mock.resolve_follows(viewer, cap).await,
        }
    }

    /// One page of `did`'s posts from its storage host.
    pub async fn list_recent_posts(
        &self,
        host: ArcStr,
        did: Did,
        query: PostQuery,
    ) -> anyhow::Result<PostPage> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::ListRecentPosts {
                    host,
                    did,
                    query,
                    tx,
                })
                .await
            }
            Self::Mock(mock) => mock.list_recent_posts(host, did, query).await,
        }
    }

    /// One page of the accounts that ever published to `category`.
    pub async fn list_accounts_by_category(
        &self,
        category: ArcStr,
        query: PageQuery,
    ) -> anyhow::Result<AccountPage> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::ListAccountsByCategory {
                    category,
                    query,
                    tx,
                })
                .await
            }
            Self::Mock(mock) => mock.list_accounts_by_category(category, query).await,
        }
    }

    pub async fn fetch_profile_summary(&self, did: Did) -> anyhow::Result<ProfileSummary> {
        match self {
            Self::Actual(sender) => {
                Self::ask(sender, |tx| Message::FetchProfileSummary { did, tx }).await
            }
            Self::Mock(mock) => mock.fetch_profile_summary(did).await,
        }
    }
}
