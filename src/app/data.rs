use crate::ArcStr;

use super::discover::{LiveUpdate, RecentActivityOptions};

/// Commands that can be executed by the App
#[derive(Debug, Clone)]
pub enum Command {
    /// Build the feed of a viewer; the signed-in viewer when `None`
    Feed { viewer: Option<ArcStr> },
    /// Fetch the page after `cursor` of one author
    More {
        account: ArcStr,
        cursor: Option<ArcStr>,
    },
    /// List the accounts publishing to a category
    Accounts { category: Option<ArcStr> },
    /// Show the newest activity of a category
    Recent(RecentActivityOptions),
    /// Fold a pushed post into the caches. The account may be a handle.
    Live(LiveUpdate),
    /// Record that a viewer has seen an author up to a point in time
    Seen {
        viewer: Option<ArcStr>,
        author: ArcStr,
        created_at: ArcStr,
    },
    /// Delete expired cache entries and old log files
    Clean,
}

/// Mock data for testing code that drives the App
#[derive(Debug, Default)]
pub struct MockData {
    /// Commands that have been executed
    pub executed_commands: Vec<Command>,
    /// Canned output returned for every command
    pub output: String,
}
