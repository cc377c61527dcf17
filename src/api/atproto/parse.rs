//! Decoding of XRPC JSON bodies into the crate's types.

use anyhow::Context;
use serde::Deserialize;

use crate::ArcStr;

use super::data::{AccountPage, Did, Post, PostPage, ProfileSummary};

#[derive(Deserialize)]
struct FollowsOutput {
    #[serde(default)]
    follows: Vec<ActorRef>,
    cursor: Option<ArcStr>,
}

#[derive(Deserialize)]
struct ActorRef {
    did: Did,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileOutput {
    handle: ArcStr,
    display_name: Option<ArcStr>,
    avatar: Option<ArcStr>,
}

#[derive(Deserialize)]
struct ResolveHandleOutput {
    did: Did,
}

#[derive(Deserialize)]
struct ReposOutput {
    #[serde(default)]
    repos: Vec<ActorRef>,
    cursor: Option<ArcStr>,
}

#[derive(Deserialize)]
struct RecordsOutput {
    #[serde(default)]
    records: Vec<RawRecord>,
    cursor: Option<ArcStr>,
}

#[derive(Deserialize)]
struct RawRecord {
    uri: ArcStr,
    cid: ArcStr,
    #[serde(default)]
    value: serde_json::Value,
}

/// The record body. Every field is optional on the wire; [`decode_record`]
/// decides which absences make a record unusable.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct RawFrame {
    created_at: Option<ArcStr>,
    text: Option<ArcStr>,
    alt: Option<ArcStr>,
    aspect: Option<ArcStr>,
    expires_at: Option<ArcStr>,
    image: Option<RawBlob>,
}

#[derive(Deserialize)]
struct RawBlob {
    #[serde(rename = "ref")]
    reference: Option<RawLink>,
}

#[derive(Deserialize)]
struct RawLink {
    #[serde(rename = "$link")]
    link: Option<ArcStr>,
}

#[derive(Deserialize)]
struct DidDocument {
    #[serde(default)]
    service: Vec<DidService>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DidService {
    id: String,
    service_endpoint: serde_json::Value,
}

pub fn follows(body: &str) -> anyhow::Result<(Vec<Did>, Option<ArcStr>)> {
    let out: FollowsOutput = serde_json::from_str(body).context("Decoding getFollows output")?;
    Ok((out.follows.into_iter().map(|f| f.did).collect(), out.cursor))
}

pub fn profile(body: &str) -> anyhow::Result<ProfileSummary> {
    let out: ProfileOutput = serde_json::from_str(body).context("Decoding getProfile output")?;
    Ok(ProfileSummary {
        handle: out.handle,
        display_name: out.display_name.filter(|name| !name.is_empty()),
        avatar_url: out.avatar,
    })
}

pub fn resolved_handle(body: &str) -> anyhow::Result<Did> {
    let out: ResolveHandleOutput =
        serde_json::from_str(body).context("Decoding resolveHandle output")?;
    Ok(out.did)
}

pub fn account_page(body: &str) -> anyhow::Result<AccountPage> {
    let out: ReposOutput =
        serde_json::from_str(body).context("Decoding listReposByCollection output")?;
    Ok(AccountPage {
        accounts: out.repos.into_iter().map(|r| r.did).collect(),
        cursor: out.cursor.filter(|c| !c.is_empty()),
    })
}

/// Decodes a `listRecords` page. Records without a creation time or an image
/// reference are skipped rather than failing the page.
pub fn post_page(body: &str) -> anyhow::Result<PostPage> {
    let out: RecordsOutput = serde_json::from_str(body).context("Decoding listRecords output")?;
    Ok(PostPage {
        posts: out.records.into_iter().filter_map(decode_record).collect(),
        cursor: out.cursor.filter(|c| !c.is_empty()),
    })
}

fn decode_record(record: RawRecord) -> Option<Post> {
    let frame: RawFrame = serde_json::from_value(record.value).ok()?;
    let attachment = frame.image?.reference?.link?;
    Some(Post {
        uri: record.uri,
        cid: record.cid,
        created_at: frame.created_at?,
        attachment,
        caption: frame.text,
        alt_text: frame.alt,
        aspect: frame.aspect,
        expires_at: frame.expires_at,
    })
}

/// Finds the personal data server endpoint in a DID document.
pub fn storage_host(body: &str) -> anyhow::Result<ArcStr> {
    let doc: DidDocument = serde_json::from_str(body).context("Decoding DID document")?;
    doc.service
        .into_iter()
        .filter(|service| service.id.ends_with("#atproto_pds"))
        .find_map(|service| match service.service_endpoint {
            serde_json::Value::String(url) => Some(ArcStr::from(url.trim_end_matches('/'))),
            _ => None,
        })
        .context("DID document has no #atproto_pds service")
}
