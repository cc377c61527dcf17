use thiserror::Error;

/// Failures reported to callers of the feed and discovery operations.
///
/// Remote hiccups never show up here: an unreachable host or a malformed page
/// is logged and treated as an absent or empty result.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("No viewer is signed in")]
    NotSignedIn,
    /// The cache store could not persist a write
    #[error("Cache store failure: {0:#}")]
    Storage(anyhow::Error),
}
