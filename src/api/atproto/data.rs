use serde::{Deserialize, Serialize};

use crate::ArcStr;

/// A decentralized account identifier, e.g. `did:plc:abc123`.
pub type Did = ArcStr;

/// One media post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// `at://{did}/{collection}/{rkey}`
    pub uri: ArcStr,
    /// Content hash of the record
    pub cid: ArcStr,
    /// ISO-8601 timestamp. Compared as a string, which orders correctly for
    /// the UTC timestamps the network emits.
    pub created_at: ArcStr,
    /// Reference to the uploaded image blob
    pub attachment: ArcStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<ArcStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<ArcStr>,
    /// Free-form aspect hint such as `9:16`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aspect: Option<ArcStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<ArcStr>,
}

const CDN: &str = "https://cdn.bsky.app/img";

impl Post {
    /// The account that published the post, taken from its URI.
    pub fn author(&self) -> Option<&str> {
        self.uri
            .strip_prefix("at://")
            .and_then(|rest| rest.split('/').next())
            .filter(|did| !did.is_empty())
    }

    pub fn image_url(&self, did: &str) -> String {
        format!("{CDN}/feed_fullsize/plain/{did}/{}@jpeg", self.attachment)
    }

    pub fn thumbnail_url(&self, did: &str) -> String {
        format!("{CDN}/feed_thumbnail/plain/{did}/{}@jpeg", self.attachment)
    }
}

/// A page of posts, newest first when requested so.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostPage {
    pub posts: Vec<Post>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<ArcStr>,
}

/// Parameters of a post listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostQuery {
    pub collection: ArcStr,
    pub limit: usize,
    pub cursor: Option<ArcStr>,
    pub newest_first: bool,
}

/// Parameters of any other paged listing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageQuery {
    pub limit: usize,
    pub cursor: Option<ArcStr>,
}

/// A page of account ids from the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountPage {
    pub accounts: Vec<Did>,
    pub cursor: Option<ArcStr>,
}

/// What the feed shows about an author besides their posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub handle: ArcStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<ArcStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<ArcStr>,
}
