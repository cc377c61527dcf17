use crate::api::atproto::Did;

use super::FeedError;

/// Who is looking at the feed. Passed explicitly to whatever needs a viewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    viewer: Option<Did>,
}

impl Session {
    pub fn signed_in(viewer: Did) -> Self {
        Self {
            viewer: Some(viewer),
        }
    }

    pub fn signed_out() -> Self {
        Self::default()
    }

    /// The signed-in viewer.
    ///
    /// # Errors
    /// [`FeedError::NotSignedIn`] for a signed-out session.
    pub fn viewer(&self) -> Result<&Did, FeedError> {
        self.viewer.as_ref().ok_or(FeedError::NotSignedIn)
    }
}
