use tokio::sync::oneshot::Sender;

use crate::ArcStr;

use super::data::{AccountPage, Did, PageQuery, PostPage, PostQuery, ProfileSummary};

/// Messages accepted by the AT Protocol client actor.
#[derive(Debug)]
pub enum Message {
    ResolveHandle {
        handle: ArcStr,
        tx: Sender<anyhow::Result<Did>>,
    },
    ResolveStorageHost {
        did: Did,
        tx: Sender<anyhow::Result<ArcStr>>,
    },
    ResolveFollows {
        viewer: Did,
        cap: usize,
        tx: Sender<anyhow::Result<Vec<Did>>>,
    },
    ListRecentPosts {
        host: ArcStr,
        did: Did,
        query: PostQuery,
        tx: Sender<anyhow::Result<PostPage>>,
    },
    ListAccountsByCategory {
        category: ArcStr,
        query: PageQuery,
        tx: Sender<anyhow::Result<AccountPage>>,
    },
    FetchProfileSummary {
        did: Did,
        tx: Sender<anyhow::Result<ProfileSummary>>,
    },
}
