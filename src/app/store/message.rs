use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::oneshot::Sender;

use crate::{
    ArcStr,
    api::atproto::{Did, PostPage, ProfileSummary},
};

use super::data::{ActivityRecord, ActivityStatus};

type Done<T = ()> = Sender<anyhow::Result<T>>;

/// Messages accepted by the store actor. Writes answer once the mutated
/// table is on disk; a write that cannot be persisted leaves the table as it
/// was.
#[derive(Debug)]
pub enum Message {
    Handle {
        handle: ArcStr,
        now: DateTime<Utc>,
        tx: Sender<Option<Did>>,
    },
    PutHandle {
        handle: ArcStr,
        did: Did,
        now: DateTime<Utc>,
        tx: Done,
    },
    StorageHost {
        did: Did,
        now: DateTime<Utc>,
        tx: Sender<Option<ArcStr>>,
    },
    PutStorageHost {
        did: Did,
        host: ArcStr,
        now: DateTime<Utc>,
        tx: Done,
    },
    AuthorPage {
        did: Did,
        collection: ArcStr,
        cursor: Option<ArcStr>,
        now: DateTime<Utc>,
        tx: Sender<Option<PostPage>>,
    },
    PutAuthorPage {
        did: Did,
        collection: ArcStr,
        cursor: Option<ArcStr>,
        page: PostPage,
        now: DateTime<Utc>,
        tx: Done,
    },
    Follows {
        viewer: Did,
        now: DateTime<Utc>,
        tx: Sender<Option<Vec<Did>>>,
    },
    PutFollows {
        viewer: Did,
        follows: Vec<Did>,
        now: DateTime<Utc>,
        tx: Done,
    },
    Profile {
        did: Did,
        now: DateTime<Utc>,
        tx: Sender<Option<ProfileSummary>>,
    },
    PutProfile {
        did: Did,
        profile: ProfileSummary,
        now: DateTime<Utc>,
        tx: Done,
    },
    AccountIndex {
        category: ArcStr,
        now: DateTime<Utc>,
        tx: Sender<Option<Vec<Did>>>,
    },
    PutAccountIndex {
        category: ArcStr,
        accounts: Vec<Did>,
        now: DateTime<Utc>,
        tx: Done,
    },
    PrependToIndex {
        category: ArcStr,
        did: Did,
        tx: Done<bool>,
    },
    Activity {
        category: ArcStr,
        did: Did,
        now: DateTime<Utc>,
        tx: Sender<ActivityStatus>,
    },
    /// Upserts every record, then writes the table once
    PutActivities {
        records: Vec<ActivityRecord>,
        tx: Done,
    },
    TrimActivity {
        max: usize,
        tx: Done<usize>,
    },
    SeenMarkers {
        viewer: Did,
        tx: Sender<HashMap<Did, ArcStr>>,
    },
    MarkSeen {
        viewer: Did,
        author: Did,
        created_at: ArcStr,
        tx: Done<bool>,
    },
    DeleteExpired {
        now: DateTime<Utc>,
        tx: Done<usize>,
    },
}
