use std::{collections::HashMap, time::Duration};

use crate::{
    ArcStr,
    app::{
        config::{Config, Data, Ttls},
        store::Store,
    },
    log::Log,
    net::Net,
};

use super::*;

const APPVIEW: &str = "https://public.api.bsky.app";
const PLC: &str = "https://plc.directory";
const RELAY: &str = "https://relay1.us-east.bsky.network";

async fn api_with(net: Net) -> (AtprotoApi, Store, Log) {
    let store = Store::mock(Ttls::default());
    let log = Log::mock();
    let api = AtprotoApi::spawn(net, store.clone(), Config::mock(Data::default()), log.clone()).await;
    (api, store, log)
}

fn follows_url(cursor: Option<&str>) -> String {
    let mut params = vec![("actor", "did:plc:me"), ("limit", "100")];
    if let Some(cursor) = cursor {
        params.push(("cursor", cursor));
    }
    xrpc_url(APPVIEW, "app.bsky.graph.getFollows", &params)
        .unwrap()
        .to_string()
}

fn follows_body(range: std::ops::Range<usize>, cursor: Option<&str>) -> String {
    let follows: Vec<_> = range
        .map(|i| serde_json::json!({ "did": format!("did:plc:f{i}"), "handle": format!("f{i}.test") }))
        .collect();
    serde_json::json!({ "follows": follows, "cursor": cursor }).to_string()
}

#[test]
fn xrpc_url_encodes_parameters() {
    let url = xrpc_url(
        "https://pds.example/",
        "com.atproto.repo.listRecords",
        &[("repo", "did:plc:a"), ("cursor", "a b")],
    )
    .unwrap();
    assert_eq!(
        &*url,
        "https://pds.example/xrpc/com.atproto.repo.listRecords?repo=did%3Aplc%3Aa&cursor=a+b"
    );
}

#[test]
fn did_documents_are_located_per_method() {
    assert_eq!(
        &*did_document_url(PLC, "did:plc:abc").unwrap(),
        "https://plc.directory/did:plc:abc"
    );
    assert_eq!(
        &*did_document_url(PLC, "did:web:example.com").unwrap(),
        "https://example.com/.well-known/did.json"
    );
    assert_eq!(
        &*did_document_url(PLC, "did:web:example.com:users:alice").unwrap(),
        "https://example.com/users/alice/did.json"
    );
    assert!(did_document_url(PLC, "did:key:z6Mk").is_err());
}

#[tokio::test]
async fn handles_are_cached_after_first_resolution() {
    let url = xrpc_url(APPVIEW, "com.atproto.identity.resolveHandle", &[("handle", "alice.test")])
        .unwrap()
        .to_string();
    let net = Net::mock([(url, r#"{"did":"did:plc:alice"}"#)]);
    let (api, store, _) = api_with(net.clone()).await;

    assert_eq!(&*api.resolve_handle("@alice.test".into()).await.unwrap(), "did:plc:alice");
    assert_eq!(&*api.resolve_handle("alice.test".into()).await.unwrap(), "did:plc:alice");
    assert_eq!(&*api.resolve_handle("did:plc:bob".into()).await.unwrap(), "did:plc:bob");

    assert_eq!(net.requested().await.unwrap().len(), 1);
    assert_eq!(store.handle("alice.test".into()).await.as_deref(), Some("did:plc:alice"));
}

#[tokio::test]
async fn storage_host_comes_from_did_document() {
    let doc = serde_json::json!({
        "id": "did:plc:alice",
        "service": [
            { "id": "#other", "type": "X", "serviceEndpoint": "https://wrong.example" },
            { "id": "#atproto_pds", "type": "AtprotoPersonalDataServer", "serviceEndpoint": "https://pds.example/" }
        ]
    });
    let net = Net::mock([(format!("{PLC}/did:plc:alice"), doc.to_string())]);
    let (api, _, _) = api_with(net.clone()).await;

    let host = api.resolve_storage_host("did:plc:alice".into()).await.unwrap();
    assert_eq!(&*host, "https://pds.example");
    api.resolve_storage_host("did:plc:alice".into()).await.unwrap();
    assert_eq!(net.requested().await.unwrap().len(), 1);

    assert!(api.resolve_storage_host("did:plc:nobody".into()).await.is_err());
}

#[tokio::test]
async fn follows_are_paged_up_to_the_cap() {
    let net = Net::mock([
        (follows_url(None), follows_body(0..100, Some("p2"))),
        (follows_url(Some("p2")), follows_body(100..200, Some("p3"))),
        (follows_url(Some("p3")), follows_body(200..250, None)),
    ]);
    let (api, _, _) = api_with(net.clone()).await;

    let follows = api.resolve_follows("did:plc:me".into(), 150).await.unwrap();
    assert_eq!(follows.len(), 150);
    assert_eq!(&*follows[0], "did:plc:f0");
    assert_eq!(&*follows[149], "did:plc:f149");
    // The third page is never needed
    assert_eq!(net.requested().await.unwrap().len(), 2);
}

#[tokio::test]
async fn follows_failure_after_first_page_keeps_partial_list() {
    let net = Net::mock([(follows_url(None), follows_body(0..100, Some("p2")))]);
    let (api, _, log) = api_with(net).await;

    let follows = api.resolve_follows("did:plc:me".into(), 150).await.unwrap();
    assert_eq!(follows.len(), 100);
    assert!(
        log.get_messages()
            .unwrap()
            .iter()
            .any(|m| m.message.contains("cut short"))
    );
}

#[tokio::test]
async fn follows_failure_on_first_page_is_an_error() {
    let (api, _, _) = api_with(Net::mock(HashMap::<String, String>::new())).await;
    assert!(api.resolve_follows("did:plc:me".into(), 150).await.is_err());
}

#[tokio::test]
async fn recent_posts_are_listed_newest_first() {
    let url = xrpc_url(
        "https://pds.example",
        "com.atproto.repo.listRecords",
        &[
            ("repo", "did:plc:a"),
            ("collection", "lol.916.frame.image"),
            ("limit", "1"),
            ("reverse", "true"),
        ],
    )
    .unwrap()
    .to_string();
    let body = serde_json::json!({
        "records": [{
            "uri": "at://did:plc:a/lol.916.frame.image/3k",
            "cid": "bafyrec",
            "value": {
                "createdAt": "2025-03-01T10:00:00.000Z",
                "alt": "a cat",
                "image": { "ref": { "$link": "bafyimg" } }
            }
        }],
        "cursor": "3k"
    });
    let net = Net::mock([(url, body.to_string())]);
    let (api, _, _) = api_with(net).await;

    let page = api
        .list_recent_posts(
            "https://pds.example".into(),
            "did:plc:a".into(),
            PostQuery {
                collection: "lol.916.frame.image".into(),
                limit: 1,
                cursor: None,
                newest_first: true,
            },
        )
        .await
        .unwrap();

    assert_eq!(page.cursor.as_deref(), Some("3k"));
    let post = &page.posts[0];
    assert_eq!(post.author(), Some("did:plc:a"));
    assert_eq!(post.alt_text.as_deref(), Some("a cat"));
    assert_eq!(
        post.image_url("did:plc:a"),
        "https://cdn.bsky.app/img/feed_fullsize/plain/did:plc:a/bafyimg@jpeg"
    );
}

#[tokio::test]
async fn relay_directory_and_profiles_are_decoded() {
    let directory = xrpc_url(
        RELAY,
        "com.atproto.sync.listReposByCollection",
        &[("collection", "lol.916.frame.image"), ("limit", "2")],
    )
    .unwrap()
    .to_string();
    let profile = xrpc_url(APPVIEW, "app.bsky.actor.getProfile", &[("actor", "did:plc:a")])
        .unwrap()
        .to_string();
    let net = Net::mock([
        (
            directory,
            r#"{"repos":[{"did":"did:plc:a"},{"did":"did:plc:b"}],"cursor":"next"}"#.to_string(),
        ),
        (
            profile,
            r#"{"did":"did:plc:a","handle":"a.test","displayName":"","avatar":"https://cdn/a"}"#
                .to_string(),
        ),
    ]);
    let (api, _, _) = api_with(net).await;

    let page = api
        .list_accounts_by_category(
            "lol.916.frame.image".into(),
            PageQuery {
                limit: 2,
                cursor: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(page.accounts, vec![Did::from("did:plc:a"), Did::from("did:plc:b")]);
    assert_eq!(page.cursor.as_deref(), Some("next"));

    let summary = api.fetch_profile_summary("did:plc:a".into()).await.unwrap();
    assert_eq!(&*summary.handle, "a.test");
    assert_eq!(summary.display_name, None);
    assert_eq!(summary.avatar_url.as_deref(), Some("https://cdn/a"));
}

#[tokio::test]
async fn mock_counts_concurrent_listings() {
    let api = AtprotoApi::mock(MockData {
        latency: Duration::from_millis(20),
        ..Default::default()
    });
    let query = PostQuery {
        collection: ArcStr::from("lol.916.frame.image"),
        limit: 5,
        cursor: None,
        newest_first: true,
    };

    let calls: Vec<_> = (0..3)
        .map(|i| {
            let api = api.clone();
            let query = query.clone();
            tokio::spawn(async move {
                api.list_recent_posts("h".into(), format!("did:plc:{i}").as_str().into(), query)
                    .await
            })
        })
        .collect();
    for call in calls {
        call.await.unwrap().unwrap();
    }

    let stats = api.stats().unwrap();
    assert_eq!(MockStats::get(&stats.posts_calls), 3);
    assert_eq!(MockStats::get(&stats.in_flight), 0);
    assert!(MockStats::get(&stats.peak_in_flight) >= 1);
}
