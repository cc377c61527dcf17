use crate::{
    ArcStr,
    api::atproto::{Did, Post, ProfileSummary},
};

/// One followed author as presented in the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedAuthor {
    pub account_id: Did,
    /// Falls back to the account id when no profile could be fetched
    pub handle: ArcStr,
    pub display_name: Option<ArcStr>,
    pub avatar_url: Option<ArcStr>,
    pub newest_post_time: Option<ArcStr>,
    /// Whether the author posted after the viewer last looked
    pub has_unseen: bool,
    /// Newest first
    pub posts: Vec<Post>,
    /// Continuation for [`super::Feed::load_more_for_author`]
    pub cursor: Option<ArcStr>,
    pub exhausted: bool,
}

/// A page of older posts of a single author.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadMorePage {
    pub posts: Vec<Post>,
    pub cursor: Option<ArcStr>,
    pub exhausted: bool,
}

impl LoadMorePage {
    pub fn exhausted() -> Self {
        Self {
            exhausted: true,
            ..Default::default()
        }
    }
}

/// Per-author working state while a feed is assembled.
#[derive(Debug, Clone)]
pub struct AuthorState {
    /// Position in the follow list; breaks ties between equally recent authors
    pub index: usize,
    pub account_id: Did,
    pub storage_host: ArcStr,
    pub cursor: Option<ArcStr>,
    /// Newest first
    pub buffer: Vec<Post>,
    pub exhausted: bool,
    pub profile: Option<ProfileSummary>,
}

impl AuthorState {
    pub fn newest(&self) -> Option<&ArcStr> {
        self.buffer.first().map(|post| &post.created_at)
    }

    /// Turns the state into its feed entry. An author is unseen when the
    /// viewer never looked, or looked before the newest post.
    pub fn into_feed_author(self, marker: Option<&ArcStr>) -> FeedAuthor {
        let newest_post_time = self.newest().cloned();
        let has_unseen = match (marker, &newest_post_time) {
            (None, _) => true,
            (Some(marker), Some(newest)) => newest > marker,
            (Some(_), None) => false,
        };
        let (handle, display_name, avatar_url) = match self.profile {
            Some(profile) => (profile.handle, profile.display_name, profile.avatar_url),
            None => (self.account_id.clone(), None, None),
        };

        FeedAuthor {
            account_id: self.account_id,
            handle,
            display_name,
            avatar_url,
            newest_post_time,
            has_unseen,
            posts: self.buffer,
            cursor: self.cursor,
            exhausted: self.exhausted,
        }
    }
}
