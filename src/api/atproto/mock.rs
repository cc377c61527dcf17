use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::bail;
use tokio::sync::Mutex;

use crate::ArcStr;

use super::data::{AccountPage, Did, PageQuery, Post, PostPage, PostQuery, ProfileSummary};

/// The remote world as seen by [`Mock`].
#[derive(Debug, Clone, Default)]
pub struct MockData {
    /// Handle to account id
    pub handles: HashMap<ArcStr, Did>,
    /// Viewer to followed accounts, in follow order
    pub follows: HashMap<Did, Vec<Did>>,
    /// Fails every follow lookup
    pub follows_fail: bool,
    /// Storage hosts; accounts missing here resolve to a placeholder
    pub hosts: HashMap<Did, ArcStr>,
    /// Posts per account, newest first
    pub posts: HashMap<Did, Vec<Post>>,
    /// Category to every account in it, in relay order
    pub directory: HashMap<ArcStr, Vec<Did>>,
    /// Zero-based relay page that fails
    pub directory_fail_page: Option<usize>,
    pub profiles: HashMap<Did, ProfileSummary>,
    /// Accounts whose host lookups and listings fail
    pub failing: HashSet<Did>,
    /// Extra latency of listings, per account
    pub delays: HashMap<Did, Duration>,
    /// Latency of every listing
    pub latency: Duration,
}

/// Call counters, shared by every clone of a mock.
#[derive(Debug, Default)]
pub struct MockStats {
    pub handle_calls: AtomicUsize,
    pub follows_calls: AtomicUsize,
    pub host_calls: AtomicUsize,
    pub posts_calls: AtomicUsize,
    pub directory_calls: AtomicUsize,
    pub profile_calls: AtomicUsize,
    /// Listings currently running
    pub in_flight: AtomicUsize,
    /// Most listings ever running at once
    pub peak_in_flight: AtomicUsize,
}

impl MockStats {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    /// Calls that reached the network, in total.
    pub fn network_calls(&self) -> usize {
        [
            &self.handle_calls,
            &self.follows_calls,
            &self.host_calls,
            &self.posts_calls,
            &self.directory_calls,
            &self.profile_calls,
        ]
        .into_iter()
        .map(Self::get)
        .sum()
    }

    fn bump(counter: &AtomicUsize) {
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// Decrements the in-flight count when a listing ends, however it ends.
struct InFlight<'a>(&'a MockStats);

impl<'a> InFlight<'a> {
    fn enter(stats: &'a MockStats) -> Self {
        let now = stats.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        stats.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        Self(stats)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

fn offset(cursor: &Option<ArcStr>) -> anyhow::Result<usize> {
    match cursor {
        None => Ok(0),
        Some(c) => Ok(c.parse()?),
    }
}

fn page_of<T: Clone>(items: &[T], start: usize, limit: usize) -> (Vec<T>, Option<ArcStr>) {
    let start = start.min(items.len());
    let end = start.saturating_add(limit).min(items.len());
    let cursor = (end < items.len()).then(|| ArcStr::from(end.to_string().as_str()));
    (items[start..end].to_vec(), cursor)
}

/// In-memory stand-in for the network. Cursors are plain offsets.
#[derive(Debug, Clone, Default)]
pub struct Mock {
    data: Arc<Mutex<MockData>>,
    stats: Arc<MockStats>,
}

impl Mock {
    pub fn new(data: MockData) -> Self {
        Self {
            data: Arc::new(Mutex::new(data)),
            stats: Arc::new(MockStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<MockStats> {
        self.stats.clone()
    }

    /// Lets a test change the remote world between calls.
    pub async fn update(&self, f: impl FnOnce(&mut MockData)) {
        f(&mut *self.data.lock().await);
    }

    pub async fn resolve_handle(&self, handle: ArcStr) -> anyhow::Result<Did> {
        let handle = handle.trim_start_matches('@');
        if handle.starts_with("did:") {
            return Ok(Did::from(handle));
        }
        MockStats::bump(&self.stats.handle_calls);
        let data = self.data.lock().await;
        match data.handles.get(handle) {
            Some(did) => Ok(did.clone()),
            None => bail!("Unable to resolve handle {handle}"),
        }
    }

    pub async fn resolve_storage_host(&self, did: Did) -> anyhow::Result<ArcStr> {
        MockStats::bump(&self.stats.host_calls);
        let data = self.data.lock().await;
        if data.failing.contains(&did) {
            bail!("DID document of {did} is unreachable");
        }
        Ok(data
            .hosts
            .get(&did)
            .cloned()
            .unwrap_or_else(|| ArcStr::from("https://pds.invalid")))
    }

    pub async fn resolve_follows(&self, viewer: Did, cap: usize) -> anyhow::Result<Vec<Did>> {
        MockStats::bump(&self.stats.follows_calls);
        let data = self.data.lock().await;
        if data.follows_fail {
            bail!("Fetching follows of {viewer} failed");
        }
        let mut follows = data.follows.get(&viewer).cloned().unwrap_or_default();
        follows.truncate(cap);
        Ok(follows)
    }

    pub async fn list_recent_posts(
        &self,
        _host: ArcStr,
        did: Did,
        query: PostQuery,
    ) -> anyhow::Result<PostPage> {
        MockStats::bump(&self.stats.posts_calls);
        let _guard = InFlight::enter(&self.stats);

        let (delay, failing, mut posts) = {
            let data = self.data.lock().await;
            (
                data.latency + data.delays.get(&did).copied().unwrap_or_default(),
                data.failing.contains(&did),
                data.posts.get(&did).cloned().unwrap_or_default(),
            )
        };
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if failing {
            bail!("Storage host of {did} is unreachable");
        }

        if !query.newest_first {
            posts.reverse();
        }
        let (posts, cursor) = page_of(&posts, offset(&query.cursor)?, query.limit);
        Ok(PostPage { posts, cursor })
    }

    pub async fn list_accounts_by_category(
        &self,
        category: ArcStr,
        query: PageQuery,
    ) -> anyhow::Result<AccountPage> {
        MockStats::bump(&self.stats.directory_calls);
        let data = self.data.lock().await;
        let start = offset(&query.cursor)?;
        if let Some(fail) = data.directory_fail_page {
            if start / query.limit.max(1) == fail {
                bail!("Relay page {fail} failed");
            }
        }
        let accounts = data.directory.get(&category).cloned().unwrap_or_default();
        let (accounts, cursor) = page_of(&accounts, start, query.limit);
        Ok(AccountPage { accounts, cursor })
    }

    pub async fn fetch_profile_summary(&self, did: Did) -> anyhow::Result<ProfileSummary> {
        MockStats::bump(&self.stats.profile_calls);
        let data = self.data.lock().await;
        match data.profiles.get(&did) {
            Some(profile) => Ok(profile.clone()),
            None => bail!("Profile of {did} not found"),
        }
    }
}
