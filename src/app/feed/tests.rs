use std::{collections::HashMap, time::Duration};

use crate::{
    ArcStr,
    api::atproto::{AtprotoApi, Did, MockData, MockStats, Post, ProfileSummary},
    app::{
        config::{Config, Data, StrOpt, Ttls, USizeOpt},
        store::Store,
    },
    log::Log,
};

use super::*;

fn did(name: &str) -> Did {
    Did::from(format!("did:plc:{name}").as_str())
}

fn t(sec: u32) -> ArcStr {
    format!("2025-01-01T00:00:{sec:02}Z").as_str().into()
}

fn post(author: &Did, n: u32, created_at: ArcStr) -> Post {
    Post {
        uri: format!("at://{author}/lol.916.frame.image/{n}").as_str().into(),
        cid: format!("bafyrec{n}").as_str().into(),
        created_at,
        attachment: format!("bafyimg{n}").as_str().into(),
        caption: None,
        alt_text: None,
        aspect: None,
        expires_at: None,
    }
}

/// Posts of `author` at the given seconds, newest first.
fn posts(author: &Did, secs: &[u32]) -> Vec<Post> {
    let mut out: Vec<_> = secs
        .iter()
        .map(|&sec| post(author, sec, t(sec)))
        .collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

struct Fixture {
    feed: Feed,
    api: AtprotoApi,
    store: Store,
    config: Config,
    log: Log,
}

fn fixture(data: MockData) -> Fixture {
    let api = AtprotoApi::mock(data);
    let store = Store::mock(Ttls::default());
    let config = Config::mock(Data::default());
    let log = Log::mock();
    Fixture {
        feed: Feed::new(api.clone(), store.clone(), config.clone(), log.clone()),
        api,
        store,
        config,
        log,
    }
}

fn me() -> Did {
    did("me")
}

/// A posted at t3 and t1, B at t2, C never.
fn abc() -> MockData {
    let (a, b, c) = (did("a"), did("b"), did("c"));
    MockData {
        follows: HashMap::from([(me(), vec![a.clone(), b.clone(), c.clone()])]),
        posts: HashMap::from([
            (a.clone(), posts(&a, &[3, 1])),
            (b.clone(), posts(&b, &[2])),
            (c, vec![]),
        ]),
        profiles: HashMap::from([(
            a,
            ProfileSummary {
                handle: "a.test".into(),
                display_name: Some("Ada".into()),
                avatar_url: None,
            },
        )]),
        ..Default::default()
    }
}

fn order(authors: &[FeedAuthor]) -> Vec<Did> {
    authors.iter().map(|a| a.account_id.clone()).collect()
}

#[tokio::test]
async fn authors_are_ordered_by_newest_post() {
    let f = fixture(abc());

    let authors = f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(order(&authors), vec![did("a"), did("b")]);

    let a = &authors[0];
    assert_eq!(a.newest_post_time, Some(t(3)));
    assert_eq!(a.posts.len(), 2);
    assert_eq!(&*a.handle, "a.test");
    assert_eq!(a.display_name.as_deref(), Some("Ada"));
    assert!(a.exhausted);

    // No profile: the account id stands in for the handle
    assert_eq!(authors[1].handle, did("b"));
}

#[tokio::test]
async fn unseen_follows_the_viewer_marker() {
    let f = fixture(abc());

    let seen = HashMap::from([(did("a"), t(3))]);
    let authors = f.feed.build_feed(me(), seen).await.unwrap();
    assert!(!authors[0].has_unseen);
    assert!(authors[1].has_unseen);

    let seen = HashMap::from([(did("a"), t(2)), (did("b"), t(2))]);
    let authors = f.feed.build_feed(me(), seen).await.unwrap();
    assert!(authors[0].has_unseen);
    assert!(!authors[1].has_unseen);
}

#[tokio::test]
async fn equally_recent_authors_keep_follow_order() {
    let names = ["d", "b", "c", "a"];
    let f = fixture(MockData {
        follows: HashMap::from([(me(), names.iter().map(|n| did(n)).collect())]),
        posts: names
            .iter()
            .map(|n| (did(n), posts(&did(n), &[7])))
            .collect(),
        ..Default::default()
    });

    let authors = f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(
        order(&authors),
        names.iter().map(|n| did(n)).collect::<Vec<_>>()
    );
}

#[tokio::test]
async fn in_flight_listings_never_exceed_the_window() {
    for size in [0, 1, 7, 8, 9, 40] {
        let follows: Vec<_> = (0..size).map(|i| did(&format!("f{i}"))).collect();
        let f = fixture(MockData {
            follows: HashMap::from([(me(), follows.clone())]),
            posts: follows
                .iter()
                .enumerate()
                .map(|(i, d)| (d.clone(), posts(d, &[(i % 60) as u32])))
                .collect(),
            latency: Duration::from_millis(5),
            ..Default::default()
        });

        let authors = f.feed.build_feed(me(), HashMap::new()).await.unwrap();
        assert_eq!(authors.len(), size);

        let stats = f.api.stats().unwrap();
        let peak = MockStats::get(&stats.peak_in_flight);
        assert!(peak <= 8, "peak {peak} with {size} follows");
    }
}

#[tokio::test]
async fn smaller_window_is_honored() {
    let follows: Vec<_> = (0..12).map(|i| did(&format!("f{i}"))).collect();
    let f = fixture(MockData {
        follows: HashMap::from([(me(), follows.clone())]),
        posts: follows.iter().map(|d| (d.clone(), posts(d, &[1]))).collect(),
        latency: Duration::from_millis(5),
        ..Default::default()
    });
    f.config.set_usize(USizeOpt::Concurrency, 3).await;

    f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert!(MockStats::get(&f.api.stats().unwrap().peak_in_flight) <= 3);
}

#[tokio::test]
async fn slow_and_failing_authors_are_dropped() {
    let mut data = abc();
    data.delays.insert(did("b"), Duration::from_millis(500));
    data.failing.insert(did("c"));
    let f = fixture(data);
    f.config.set_usize(USizeOpt::AuthorTimeoutMs, 50).await;

    let authors = f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(order(&authors), vec![did("a")]);

    let messages = f.log.get_messages().unwrap();
    assert!(
        messages
            .iter()
            .any(|m| m.message.contains("did:plc:b") && m.message.contains("timed out"))
    );
    assert!(messages.iter().any(|m| m.message.contains("did:plc:c")));
    assert!(
        f.store
            .author_page(did("b"), "lol.916.frame.image".into(), None)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn follows_and_first_pages_are_served_from_cache() {
    let f = fixture(abc());
    let stats = f.api.stats().unwrap();

    let first = f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(MockStats::get(&stats.follows_calls), 1);
    let listings = MockStats::get(&stats.posts_calls);
    assert_eq!(listings, 3);

    let second = f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(second, first);
    assert_eq!(MockStats::get(&stats.follows_calls), 1);
    assert_eq!(MockStats::get(&stats.posts_calls), listings);
    // Only the missing profile is asked for again
    assert_eq!(MockStats::get(&stats.profile_calls), 3);
}

#[tokio::test]
async fn switching_category_skips_cached_pages() {
    let f = fixture(abc());
    let stats = f.api.stats().unwrap();

    f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(MockStats::get(&stats.posts_calls), 3);

    f.config
        .set_string(StrOpt::Category, "lol.916.frame.video".into())
        .await;
    f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(MockStats::get(&stats.posts_calls), 6);
    assert!(
        f.store
            .author_page(did("a"), "lol.916.frame.video".into(), None)
            .await
            .is_some()
    );
}

#[tokio::test]
async fn unreachable_follow_graph_gives_empty_uncached_feed() {
    let mut data = abc();
    data.follows_fail = true;
    let f = fixture(data);

    assert!(f.feed.build_feed(me(), HashMap::new()).await.unwrap().is_empty());
    assert!(f.store.follows(me()).await.is_none());

    f.api.update_mock(|data| data.follows_fail = false).await;
    let authors = f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(authors.len(), 2);
}

#[tokio::test]
async fn follows_are_capped() {
    let follows: Vec<_> = (0..200).map(|i| did(&format!("f{i}"))).collect();
    let f = fixture(MockData {
        follows: HashMap::from([(me(), follows)]),
        ..Default::default()
    });

    f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    assert_eq!(f.store.follows(me()).await.unwrap().len(), 150);
}

#[tokio::test]
async fn load_more_walks_to_exhaustion() {
    let a = did("a");
    let secs: Vec<u32> = (0..12).collect();
    let f = fixture(MockData {
        follows: HashMap::from([(me(), vec![a.clone()])]),
        posts: HashMap::from([(a.clone(), posts(&a, &secs))]),
        ..Default::default()
    });

    let authors = f.feed.build_feed(me(), HashMap::new()).await.unwrap();
    let first = &authors[0];
    assert_eq!(first.posts.len(), 5);
    assert!(!first.exhausted);
    assert_eq!(first.newest_post_time, Some(t(11)));

    let second = f
        .feed
        .load_more_for_author(a.clone(), first.cursor.clone())
        .await
        .unwrap();
    assert_eq!(second.posts.len(), 5);
    assert_eq!(second.posts[0].created_at, t(6));
    assert!(!second.exhausted);

    let third = f
        .feed
        .load_more_for_author(a.clone(), second.cursor.clone())
        .await
        .unwrap();
    assert_eq!(third.posts.len(), 2);
    assert_eq!(third.cursor, None);
    assert!(third.exhausted);

    // Deeper pages come from the cache the second time
    let calls = MockStats::get(&f.api.stats().unwrap().posts_calls);
    let again = f
        .feed
        .load_more_for_author(a, second.cursor.clone())
        .await
        .unwrap();
    assert_eq!(again, third);
    assert_eq!(MockStats::get(&f.api.stats().unwrap().posts_calls), calls);
}

#[tokio::test]
async fn load_more_failure_is_an_empty_exhausted_page() {
    let mut data = abc();
    data.failing.insert(did("a"));
    let f = fixture(data);

    let page = f
        .feed
        .load_more_for_author(did("a"), Some("5".into()))
        .await
        .unwrap();
    assert_eq!(page, LoadMorePage::exhausted());
}
