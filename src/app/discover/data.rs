use crate::{ArcStr, api::atproto::Did};

/// Knobs of [`super::Discover::get_recent_activity`]. Unset values fall back
/// to the configuration.
#[derive(Debug, Clone, Default)]
pub struct RecentActivityOptions {
    pub category: Option<ArcStr>,
    /// Most activities returned
    pub limit: Option<usize>,
    /// Accounts checked concurrently per batch
    pub batch_size: Option<usize>,
    /// Check again accounts last seen with nothing to show
    pub recheck_empty: bool,
}

/// A push notification that `account` just published `content_id`.
#[derive(Debug, Clone)]
pub struct LiveUpdate {
    pub account: Did,
    pub content_id: ArcStr,
    pub created_at: ArcStr,
    pub category: Option<ArcStr>,
    pub caption: Option<ArcStr>,
    pub alt_text: Option<ArcStr>,
}
