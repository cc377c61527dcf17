//! Plain-text rendering of command results.

use std::fmt::Write;

use crate::{
    ArcStr,
    api::atproto::{Did, Post},
};

use super::{
    feed::{FeedAuthor, LoadMorePage},
    store::Activity,
};

/// Image size printed next to a post
#[derive(Debug, Clone, Copy)]
enum Image {
    Thumbnail,
    FullSize,
}

/// `did` stands in for posts whose record URI names no account.
fn post_line(out: &mut String, did: &str, post: &Post, image: Image) -> std::fmt::Result {
    write!(out, "   - {}", post.created_at)?;
    if let Some(caption) = &post.caption {
        write!(out, " \"{caption}\"")?;
    }
    let author = post.author().unwrap_or(did);
    let url = match image {
        Image::Thumbnail => post.thumbnail_url(author),
        Image::FullSize => post.image_url(author),
    };
    writeln!(out, " {url}")
}

fn continuation(out: &mut String, cursor: &Option<ArcStr>, exhausted: bool) -> std::fmt::Result {
    match cursor {
        Some(cursor) if !exhausted => writeln!(out, "   more: --cursor {cursor}"),
        _ => writeln!(out, "   no more posts"),
    }
}

pub fn feed(authors: &[FeedAuthor]) -> anyhow::Result<String> {
    let mut out = String::new();
    if authors.is_empty() {
        writeln!(out, "Nothing to show")?;
        return Ok(out);
    }

    for (i, author) in authors.iter().enumerate() {
        write!(out, "{}. ", i + 1)?;
        if let Some(name) = &author.display_name {
            write!(out, "{name} ")?;
        }
        write!(out, "@{} ({})", author.handle, author.account_id)?;
        if author.has_unseen {
            write!(out, " [new]")?;
        }
        writeln!(out)?;
        for post in &author.posts {
            post_line(&mut out, &author.account_id, post, Image::Thumbnail)?;
        }
        continuation(&mut out, &author.cursor, author.exhausted)?;
    }
    Ok(out)
}

pub fn page(did: &str, page: &LoadMorePage) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "{did}: {} posts", page.posts.len())?;
    for post in &page.posts {
        post_line(&mut out, did, post, Image::FullSize)?;
    }
    continuation(&mut out, &page.cursor, page.exhausted)?;
    Ok(out)
}

pub fn accounts(category: &str, accounts: &[Did]) -> anyhow::Result<String> {
    let mut out = String::new();
    writeln!(out, "{} accounts publish to {category}", accounts.len())?;
    for did in accounts {
        writeln!(out, "{did}")?;
    }
    Ok(out)
}

pub fn activity(activities: &[Activity]) -> anyhow::Result<String> {
    let mut out = String::new();
    if activities.is_empty() {
        writeln!(out, "No recent activity")?;
        return Ok(out);
    }
    for activity in activities {
        write!(
            out,
            "{} {} {}",
            activity.created_at, activity.account, activity.content_id
        )?;
        if let Some(caption) = &activity.caption {
            write!(out, " \"{caption}\"")?;
        }
        writeln!(out)?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_urls_name_the_posting_account() {
        let mut post = Post {
            uri: "at://did:plc:origin/lol.916.frame.image/1".into(),
            cid: "bafyrec".into(),
            created_at: "2025-01-01T00:00:00Z".into(),
            attachment: "bafyimg".into(),
            caption: None,
            alt_text: None,
            aspect: None,
            expires_at: None,
        };
        let page = LoadMorePage {
            posts: vec![post.clone()],
            cursor: None,
            exhausted: true,
        };
        let out = super::page("did:plc:listed", &page).unwrap();
        assert!(out.contains("/feed_fullsize/plain/did:plc:origin/bafyimg@jpeg"));

        post.uri = "not-a-record-uri".into();
        let mut out = String::new();
        post_line(&mut out, "did:plc:listed", &post, Image::Thumbnail).unwrap();
        assert!(out.ends_with("/feed_thumbnail/plain/did:plc:listed/bafyimg@jpeg\n"));
    }
}
