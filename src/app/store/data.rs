use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    ArcStr,
    api::atproto::{Did, PostPage, ProfileSummary},
    app::config::{TtlOpt, Ttls},
};

/// A cached value and the instant it stops being served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<V> {
    pub value: V,
    pub expires_at: DateTime<Utc>,
}

impl<V> Entry<V> {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// Anything carrying the instant it was last refreshed. Tables of such
/// values can be trimmed down to their most recently refreshed entries.
pub trait Recency {
    fn recency(&self) -> DateTime<Utc>;
}

/// A namespace of expiring entries.
///
/// Reads past `expires_at` behave as misses but leave the entry in place;
/// only [`Table::delete_expired`] removes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Table<V> {
    entries: BTreeMap<String, Entry<V>>,
}

impl<V> Default for Table<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V: Clone> Table<V> {
    pub fn get(&self, key: &str, now: DateTime<Utc>) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    /// Whole-entry upsert.
    pub fn put(&mut self, key: impl Into<String>, value: V, expires_at: DateTime<Utc>) {
        self.entries
            .insert(key.into(), Entry { value, expires_at });
    }

    pub fn entry_mut(&mut self, key: &str) -> Option<&mut Entry<V>> {
        self.entries.get_mut(key)
    }

    pub fn delete_expired(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        before - self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V: Recency> Table<V> {
    /// Shrinks the table to `max` entries by dropping the least recently
    /// refreshed ones; equal instants are dropped in key order. Expiry plays
    /// no part. Returns how many entries were removed.
    pub fn trim(&mut self, max: usize) -> usize {
        let overflow = self.entries.len().saturating_sub(max);
        if overflow == 0 {
            return 0;
        }

        let mut by_age: Vec<(DateTime<Utc>, &String)> = self
            .entries
            .iter()
            .map(|(key, entry)| (entry.value.recency(), key))
            .collect();
        by_age.sort();

        let doomed: Vec<String> = by_age
            .into_iter()
            .take(overflow)
            .map(|(_, key)| key.clone())
            .collect();
        for key in &doomed {
            self.entries.remove(key);
        }
        doomed.len()
    }
}

/// What a single account last showed for a category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum ActivityState {
    /// Checked, and the account had nothing to show
    Empty,
    /// Checked, and this was the newest post
    HasContent {
        created_at: ArcStr,
        content_id: ArcStr,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<ArcStr>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        alt_text: Option<ArcStr>,
    },
}

/// The persisted per-(category, account) activity record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub category: ArcStr,
    pub account: Did,
    pub state: ActivityState,
    /// When the account was last checked. Drives eviction.
    pub checked_at: DateTime<Utc>,
}

impl Recency for ActivityRecord {
    fn recency(&self) -> DateTime<Utc> {
        self.checked_at
    }
}

/// An account's newest post in a category, as served to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Activity {
    pub account: Did,
    pub category: ArcStr,
    pub created_at: ArcStr,
    /// Attachment reference of the newest post
    pub content_id: ArcStr,
    pub caption: Option<ArcStr>,
    pub alt_text: Option<ArcStr>,
}

/// Result of looking up an activity record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivityStatus {
    /// Never checked, or the last check expired
    Unknown,
    /// Checked recently and found nothing
    Empty,
    HasContent(Activity),
}

impl ActivityRecord {
    pub fn status(&self) -> ActivityStatus {
        match &self.state {
            ActivityState::Empty => ActivityStatus::Empty,
            ActivityState::HasContent {
                created_at,
                content_id,
                caption,
                alt_text,
            } => ActivityStatus::HasContent(Activity {
                account: self.account.clone(),
                category: self.category.clone(),
                created_at: created_at.clone(),
                content_id: content_id.clone(),
                caption: caption.clone(),
                alt_text: alt_text.clone(),
            }),
        }
    }
}

/// Newest post time each viewer has seen, per author. Never expires.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SeenMarkers {
    viewers: BTreeMap<String, BTreeMap<String, ArcStr>>,
}

/// The persisted tables, one file each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableName {
    Handles,
    StorageHosts,
    AuthorPages,
    Follows,
    Profiles,
    AccountIndex,
    Activity,
    Seen,
}

impl TableName {
    pub const ALL: [TableName; 8] = [
        TableName::Handles,
        TableName::StorageHosts,
        TableName::AuthorPages,
        TableName::Follows,
        TableName::Profiles,
        TableName::AccountIndex,
        TableName::Activity,
        TableName::Seen,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            TableName::Handles => "handles.toml",
            TableName::StorageHosts => "storage_hosts.toml",
            TableName::AuthorPages => "author_pages.toml",
            TableName::Follows => "follows.toml",
            TableName::Profiles => "profiles.toml",
            TableName::AccountIndex => "account_index.toml",
            TableName::Activity => "activity.toml",
            TableName::Seen => "seen.toml",
        }
    }
}

fn page_key(collection: &str, account: &str, cursor: Option<&str>) -> String {
    format!("{collection}|{account}|{}", cursor.unwrap_or(""))
}

fn activity_key(category: &str, account: &str) -> String {
    format!("{category}|{account}")
}

/// Every cache table plus the lifetimes used to stamp new entries.
///
/// All operations take `now` explicitly; the store actor passes the wall
/// clock, tests pass whatever instant they need.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub ttls: Ttls,
    pub handles: Table<Did>,
    pub storage_hosts: Table<ArcStr>,
    pub author_pages: Table<PostPage>,
    pub follows: Table<Vec<Did>>,
    pub profiles: Table<ProfileSummary>,
    pub account_index: Table<Vec<Did>>,
    pub activity: Table<ActivityRecord>,
    pub seen: SeenMarkers,
}

impl Tables {
    pub fn new(ttls: Ttls) -> Self {
        Self {
            ttls,
            ..Default::default()
        }
    }

    fn expiry(&self, opt: TtlOpt, from: DateTime<Utc>) -> DateTime<Utc> {
        from.checked_add_signed(self.ttls.get(opt))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn handle(&self, handle: &str, now: DateTime<Utc>) -> Option<Did> {
        self.handles.get(handle, now)
    }

    pub fn put_handle(&mut self, handle: &str, did: Did, now: DateTime<Utc>) {
        let expires_at = self.expiry(TtlOpt::Handle, now);
        self.handles.put(handle, did, expires_at);
    }

    pub fn storage_host(&self, did: &str, now: DateTime<Utc>) -> Option<ArcStr> {
        self.storage_hosts.get(did, now)
    }

    pub fn put_storage_host(&mut self, did: &str, host: ArcStr, now: DateTime<Utc>) {
        let expires_at = self.expiry(TtlOpt::StorageHost, now);
        self.storage_hosts.put(did, host, expires_at);
    }

    pub fn author_page(
        &self,
        did: &str,
        collection: &str,
        cursor: Option<&str>,
        now: DateTime<Utc>,
    ) -> Option<PostPage> {
        self.author_pages
            .get(&page_key(collection, did, cursor), now)
    }

    /// First pages go stale quickly; pages behind a cursor hold still.
    pub fn put_author_page(
        &mut self,
        did: &str,
        collection: &str,
        cursor: Option<&str>,
        page: PostPage,
        now: DateTime<Utc>,
    ) {
        let class = match cursor {
            None => TtlOpt::FirstPage,
            Some(_) => TtlOpt::DeepPage,
        };
        let expires_at = self.expiry(class, now);
        self.author_pages
            .put(page_key(collection, did, cursor), page, expires_at);
    }

    pub fn follows(&self, viewer: &str, now: DateTime<Utc>) -> Option<Vec<Did>> {
        self.follows.get(viewer, now)
    }

    pub fn put_follows(&mut self, viewer: &str, follows: Vec<Did>, now: DateTime<Utc>) {
        let expires_at = self.expiry(TtlOpt::Follows, now);
        self.follows.put(viewer, follows, expires_at);
    }

    pub fn profile(&self, did: &str, now: DateTime<Utc>) -> Option<ProfileSummary> {
        self.profiles.get(did, now)
    }

    pub fn put_profile(&mut self, did: &str, profile: ProfileSummary, now: DateTime<Utc>) {
        let expires_at = self.expiry(TtlOpt::Profile, now);
        self.profiles.put(did, profile, expires_at);
    }

    pub fn account_index(&self, category: &str, now: DateTime<Utc>) -> Option<Vec<Did>> {
        self.account_index.get(category, now)
    }

    pub fn put_account_index(&mut self, category: &str, accounts: Vec<Did>, now: DateTime<Utc>) {
        let expires_at = self.expiry(TtlOpt::AccountIndex, now);
        self.account_index.put(category, accounts, expires_at);
    }

    /// Puts `did` at the front of an existing index without touching its
    /// expiry. A missing index stays missing. Returns whether anything changed.
    pub fn prepend_to_index(&mut self, category: &str, did: Did) -> bool {
        let Some(entry) = self.account_index.entry_mut(category) else {
            return false;
        };
        if entry.value.contains(&did) {
            return false;
        }
        entry.value.insert(0, did);
        true
    }

    pub fn activity(&self, category: &str, did: &str, now: DateTime<Utc>) -> ActivityStatus {
        self.activity
            .get(&activity_key(category, did), now)
            .map(|record| record.status())
            .unwrap_or(ActivityStatus::Unknown)
    }

    /// Upserts a record; it stays valid for one activity lifetime after
    /// `checked_at`.
    pub fn put_activity(&mut self, record: ActivityRecord) {
        let expires_at = self.expiry(TtlOpt::Activity, record.checked_at);
        let key = activity_key(&record.category, &record.account);
        self.activity.put(key, record, expires_at);
    }

    pub fn contains_activity(&self, category: &str, did: &str) -> bool {
        self.activity.contains_key(&activity_key(category, did))
    }

    pub fn trim_activity(&mut self, max: usize) -> usize {
        self.activity.trim(max)
    }

    pub fn seen_markers(&self, viewer: &str) -> HashMap<Did, ArcStr> {
        self.seen
            .viewers
            .get(viewer)
            .map(|authors| {
                authors
                    .iter()
                    .map(|(author, at)| (Did::from(author.as_str()), at.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Records that `viewer` has seen `author` up to `created_at`. Markers
    /// only move forward. Returns whether the marker changed.
    pub fn mark_seen(&mut self, viewer: &str, author: &str, created_at: ArcStr) -> bool {
        let authors = self.seen.viewers.entry(viewer.to_string()).or_default();
        match authors.get(author) {
            Some(current) if *current >= created_at => false,
            _ => {
                authors.insert(author.to_string(), created_at);
                true
            }
        }
    }

    /// Drops every expired entry. Returns the tables that lost entries and
    /// how many each lost.
    pub fn delete_expired(&mut self, now: DateTime<Utc>) -> Vec<(TableName, usize)> {
        let removed = [
            (TableName::Handles, self.handles.delete_expired(now)),
            (TableName::StorageHosts, self.storage_hosts.delete_expired(now)),
            (TableName::AuthorPages, self.author_pages.delete_expired(now)),
            (TableName::Follows, self.follows.delete_expired(now)),
            (TableName::Profiles, self.profiles.delete_expired(now)),
            (TableName::AccountIndex, self.account_index.delete_expired(now)),
            (TableName::Activity, self.activity.delete_expired(now)),
        ];
        removed.into_iter().filter(|(_, n)| *n > 0).collect()
    }

    /// A copy of `table` alone, to hand back to [`Tables::restore`] when a
    /// change to it cannot be persisted.
    pub fn snapshot(&self, table: TableName) -> Tables {
        let mut copy = Tables::new(self.ttls);
        match table {
            TableName::Handles => copy.handles = self.handles.clone(),
            TableName::StorageHosts => copy.storage_hosts = self.storage_hosts.clone(),
            TableName::AuthorPages => copy.author_pages = self.author_pages.clone(),
            TableName::Follows => copy.follows = self.follows.clone(),
            TableName::Profiles => copy.profiles = self.profiles.clone(),
            TableName::AccountIndex => copy.account_index = self.account_index.clone(),
            TableName::Activity => copy.activity = self.activity.clone(),
            TableName::Seen => copy.seen = self.seen.clone(),
        }
        copy
    }

    /// Puts `table` back the way `snapshot` holds it.
    pub fn restore(&mut self, table: TableName, snapshot: Tables) {
        match table {
            TableName::Handles => self.handles = snapshot.handles,
            TableName::StorageHosts => self.storage_hosts = snapshot.storage_hosts,
            TableName::AuthorPages => self.author_pages = snapshot.author_pages,
            TableName::Follows => self.follows = snapshot.follows,
            TableName::Profiles => self.profiles = snapshot.profiles,
            TableName::AccountIndex => self.account_index = snapshot.account_index,
            TableName::Activity => self.activity = snapshot.activity,
            TableName::Seen => self.seen = snapshot.seen,
        }
    }

    /// Serializes one table for persistence.
    pub fn to_toml(&self, table: TableName) -> Result<String, toml::ser::Error> {
        match table {
            TableName::Handles => toml::to_string_pretty(&self.handles),
            TableName::StorageHosts => toml::to_string_pretty(&self.storage_hosts),
            TableName::AuthorPages => toml::to_string_pretty(&self.author_pages),
            TableName::Follows => toml::to_string_pretty(&self.follows),
            TableName::Profiles => toml::to_string_pretty(&self.profiles),
            TableName::AccountIndex => toml::to_string_pretty(&self.account_index),
            TableName::Activity => toml::to_string_pretty(&self.activity),
            TableName::Seen => toml::to_string_pretty(&self.seen),
        }
    }

    /// Replaces one table with its persisted form.
    pub fn load_toml(&mut self, table: TableName, contents: &str) -> Result<(), toml::de::Error> {
        match table {
            TableName::Handles => self.handles = toml::from_str(contents)?,
            TableName::StorageHosts => self.storage_hosts = toml::from_str(contents)?,
            TableName::AuthorPages => self.author_pages = toml::from_str(contents)?,
            TableName::Follows => self.follows = toml::from_str(contents)?,
            TableName::Profiles => self.profiles = toml::from_str(contents)?,
            TableName::AccountIndex => self.account_index = toml::from_str(contents)?,
            TableName::Activity => self.activity = toml::from_str(contents)?,
            TableName::Seen => self.seen = toml::from_str(contents)?,
        }
        Ok(())
    }
}
