use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::{ArcPath, ArcStr, log::LogLevel};

/// Path-valued options.
#[derive(Debug, Clone, Copy)]
pub enum PathOpt {
    /// Directory where log files are stored
    LogDir,
    /// Directory holding one file per cache table
    CacheDir,
}

/// String-valued options.
#[derive(Debug, Clone, Copy)]
pub enum StrOpt {
    /// Record collection that defines the content category
    Category,
    /// Public app view answering follow and profile queries
    AppViewUrl,
    /// Relay enumerating accounts by collection
    RelayUrl,
    /// Directory resolving `did:plc` documents
    PlcUrl,
}

/// Numeric options.
#[derive(Debug, Clone, Copy)]
pub enum USizeOpt {
    /// Maximum age of log files in days before they are deleted
    MaxAge,
    /// Timeout for any HTTP request, in seconds
    Timeout,
    /// Most followed accounts considered for a feed
    FollowCap,
    /// Authors initialized at once while building a feed
    Concurrency,
    /// Posts fetched per author page
    PageSize,
    /// Per-call timeout while initializing an author, in milliseconds
    AuthorTimeoutMs,
    /// Accounts requested per relay page
    DirectoryPageLimit,
    /// Accounts checked concurrently per activity batch
    ActivityBatchSize,
    /// Default number of activity items returned
    ActivityLimit,
    /// Upper bound on cached activity records
    ActivityCapacity,
}

/// Expiry classes of the cache tables.
#[derive(Debug, Clone, Copy)]
pub enum TtlOpt {
    Handle,
    StorageHost,
    Follows,
    /// First page of an author's posts
    FirstPage,
    /// Pages reached through a cursor
    DeepPage,
    Profile,
    AccountIndex,
    Activity,
}

/// Lifetimes of each cache class, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Ttls {
    pub handle: u64,
    pub storage_host: u64,
    pub follows: u64,
    pub first_page: u64,
    pub deep_page: u64,
    pub profile: u64,
    pub account_index: u64,
    pub activity: u64,
}

impl Default for Ttls {
    fn default() -> Self {
        const MINUTE: u64 = 60;
        const HOUR: u64 = 60 * MINUTE;
        Self {
            handle: 24 * HOUR,
            storage_host: 24 * HOUR,
            follows: 30 * MINUTE,
            first_page: 5 * MINUTE,
            deep_page: 2 * HOUR,
            profile: HOUR,
            account_index: 30 * MINUTE,
            activity: 15 * MINUTE,
        }
    }
}

impl Ttls {
    pub fn get(&self, opt: TtlOpt) -> TimeDelta {
        let secs = match opt {
            TtlOpt::Handle => self.handle,
            TtlOpt::StorageHost => self.storage_host,
            TtlOpt::Follows => self.follows,
            TtlOpt::FirstPage => self.first_page,
            TtlOpt::DeepPage => self.deep_page,
            TtlOpt::Profile => self.profile,
            TtlOpt::AccountIndex => self.account_index,
            TtlOpt::Activity => self.activity,
        };
        i64::try_from(secs)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX)
    }

    pub fn set(&mut self, opt: TtlOpt, secs: u64) {
        let slot = match opt {
            TtlOpt::Handle => &mut self.handle,
            TtlOpt::StorageHost => &mut self.storage_host,
            TtlOpt::Follows => &mut self.follows,
            TtlOpt::FirstPage => &mut self.first_page,
            TtlOpt::DeepPage => &mut self.deep_page,
            TtlOpt::Profile => &mut self.profile,
            TtlOpt::AccountIndex => &mut self.account_index,
            TtlOpt::Activity => &mut self.activity,
        };
        *slot = secs;
    }
}

/// Everything stored in the configuration file. Missing keys fall back to
/// their defaults, so older files keep loading.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Data {
    cache_dir: ArcPath,
    log_dir: ArcPath,
    log_level: LogLevel,
    max_age: usize,
    timeout: usize,
    category: ArcStr,
    appview_url: ArcStr,
    relay_url: ArcStr,
    plc_url: ArcStr,
    follow_cap: usize,
    concurrency: usize,
    page_size: usize,
    author_timeout_ms: usize,
    directory_page_limit: usize,
    activity_batch_size: usize,
    activity_limit: usize,
    activity_capacity: usize,
    ttl: Ttls,
}

impl Default for Data {
    fn default() -> Self {
        Self {
            cache_dir: ArcPath::from(std::path::Path::new("/tmp/framefeed/cache")),
            log_dir: ArcPath::from(std::path::Path::new("/tmp/framefeed/logs")),
            log_level: LogLevel::Warning,
            max_age: 0,
            timeout: 30,
            category: ArcStr::from("lol.916.frame.image"),
            appview_url: ArcStr::from("https://public.api.bsky.app"),
            relay_url: ArcStr::from("https://relay1.us-east.bsky.network"),
            plc_url: ArcStr::from("https://plc.directory"),
            follow_cap: 150,
            concurrency: 8,
            page_size: 5,
            author_timeout_ms: 3000,
            directory_page_limit: 2000,
            activity_batch_size: 20,
            activity_limit: 100,
            activity_capacity: 500,
            ttl: Ttls::default(),
        }
    }
}

impl Data {
    pub fn path(&self, opt: PathOpt) -> ArcPath {
        match opt {
            PathOpt::LogDir => self.log_dir.clone(),
            PathOpt::CacheDir => self.cache_dir.clone(),
        }
    }

    pub fn set_path(&mut self, opt: PathOpt, path: ArcPath) {
        match opt {
            PathOpt::LogDir => self.log_dir = path,
            PathOpt::CacheDir => self.cache_dir = path,
        }
    }

    pub fn string(&self, opt: StrOpt) -> ArcStr {
        match opt {
            StrOpt::Category => self.category.clone(),
            StrOpt::AppViewUrl => self.appview_url.clone(),
            StrOpt::RelayUrl => self.relay_url.clone(),
            StrOpt::PlcUrl => self.plc_url.clone(),
        }
    }

    pub fn set_string(&mut self, opt: StrOpt, value: ArcStr) {
        match opt {
            StrOpt::Category => self.category = value,
            StrOpt::AppViewUrl => self.appview_url = value,
            StrOpt::RelayUrl => self.relay_url = value,
            StrOpt::PlcUrl => self.plc_url = value,
        }
    }

    pub fn log_level(&self) -> LogLevel {
        self.log_level
    }

    pub fn set_log_level(&mut self, level: LogLevel) {
        self.log_level = level;
    }

    pub fn usize(&self, opt: USizeOpt) -> usize {
        match opt {
            USizeOpt::MaxAge => self.max_age,
            USizeOpt::Timeout => self.timeout,
            USizeOpt::FollowCap => self.follow_cap,
            USizeOpt::Concurrency => self.concurrency,
            USizeOpt::PageSize => self.page_size,
            USizeOpt::AuthorTimeoutMs => self.author_timeout_ms,
            USizeOpt::DirectoryPageLimit => self.directory_page_limit,
            USizeOpt::ActivityBatchSize => self.activity_batch_size,
            USizeOpt::ActivityLimit => self.activity_limit,
            USizeOpt::ActivityCapacity => self.activity_capacity,
        }
    }

    pub fn set_usize(&mut self, opt: USizeOpt, value: usize) {
        let slot = match opt {
            USizeOpt::MaxAge => &mut self.max_age,
            USizeOpt::Timeout => &mut self.timeout,
            USizeOpt::FollowCap => &mut self.follow_cap,
            USizeOpt::Concurrency => &mut self.concurrency,
            USizeOpt::PageSize => &mut self.page_size,
            USizeOpt::AuthorTimeoutMs => &mut self.author_timeout_ms,
            USizeOpt::DirectoryPageLimit => &mut self.directory_page_limit,
            USizeOpt::ActivityBatchSize => &mut self.activity_batch_size,
            USizeOpt::ActivityLimit => &mut self.activity_limit,
            USizeOpt::ActivityCapacity => &mut self.activity_capacity,
        };
        *slot = value;
    }

    pub fn ttls(&self) -> Ttls {
        self.ttl
    }

    pub fn ttl(&self, opt: TtlOpt) -> TimeDelta {
        self.ttl.get(opt)
    }

    pub fn set_ttl(&mut self, opt: TtlOpt, secs: u64) {
        self.ttl.set(opt, secs);
    }
}
