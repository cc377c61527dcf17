use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::{
    ArcPath, ArcStr,
    api::atproto::{Did, Post, PostPage},
    app::config::{Config, Data, PathOpt, Ttls},
    fs::Fs,
    log::Log,
};

use super::{
    ActivityRecord, ActivityState, ActivityStatus, Store, Tables,
    data::{Recency, Table},
};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
}

fn did(s: &str) -> Did {
    Did::from(s)
}

fn checked(category: &str, account: &str, checked_at: DateTime<Utc>) -> ActivityRecord {
    ActivityRecord {
        category: category.into(),
        account: did(account),
        state: ActivityState::Empty,
        checked_at,
    }
}

#[derive(Debug, Clone)]
struct Stamp(DateTime<Utc>);

impl Recency for Stamp {
    fn recency(&self) -> DateTime<Utc> {
        self.0
    }
}

#[test]
fn reads_past_expiry_miss_but_keep_the_entry() {
    let mut table = Table::default();
    table.put("k", 1u32, at(10));

    assert_eq!(table.get("k", at(9)), Some(1));
    assert_eq!(table.get("k", at(10)), None);
    assert!(table.contains_key("k"));

    assert_eq!(table.delete_expired(at(10)), 1);
    assert!(table.is_empty());
}

#[test]
fn trim_drops_least_recent_entries() {
    let mut table = Table::default();
    for i in 0..8 {
        table.put(format!("k{i}"), Stamp(at(i)), at(1_000));
    }

    assert_eq!(table.trim(5), 3);
    assert_eq!(table.len(), 5);
    for i in 0..3 {
        assert!(!table.contains_key(&format!("k{i}")));
    }
    for i in 3..8 {
        assert!(table.contains_key(&format!("k{i}")));
    }

    assert_eq!(table.trim(5), 0);
}

#[test]
fn first_pages_expire_before_deeper_pages() {
    let ttls = Ttls::default();
    let mut tables = Tables::new(ttls);
    let page = PostPage {
        posts: vec![],
        cursor: None,
    };
    tables.put_author_page("did:plc:a", "cat", None, page.clone(), at(0));
    tables.put_author_page("did:plc:a", "cat", Some("5"), page, at(0));

    let later = at(0) + TimeDelta::minutes(10);
    assert!(tables.author_page("did:plc:a", "cat", None, later).is_none());
    assert!(tables.author_page("did:plc:a", "cat", Some("5"), later).is_some());
}

#[test]
fn author_pages_are_kept_apart_per_collection() {
    let mut tables = Tables::new(Ttls::default());
    let page = PostPage {
        posts: vec![],
        cursor: Some("next".into()),
    };
    tables.put_author_page("did:plc:a", "lol.916.frame.image", None, page.clone(), at(0));

    assert_eq!(
        tables.author_page("did:plc:a", "lol.916.frame.image", None, at(1)),
        Some(page)
    );
    assert!(tables.author_page("did:plc:a", "lol.916.frame.video", None, at(1)).is_none());
}

#[test]
fn activity_expires_after_its_lifetime() {
    let mut tables = Tables::new(Ttls::default());
    tables.put_activity(checked("cat", "did:plc:a", at(0)));

    assert_eq!(tables.activity("cat", "did:plc:a", at(1)), ActivityStatus::Empty);
    assert_eq!(
        tables.activity("cat", "did:plc:a", at(0) + TimeDelta::hours(3)),
        ActivityStatus::Unknown
    );
    assert_eq!(tables.activity("other", "did:plc:a", at(1)), ActivityStatus::Unknown);
}

#[test]
fn activity_trim_spans_categories() {
    let mut tables = Tables::new(Ttls::default());
    for i in 0..6 {
        tables.put_activity(checked("old", &format!("did:plc:{i}"), at(i)));
    }
    for i in 0..4 {
        tables.put_activity(checked("new", &format!("did:plc:{i}"), at(100 + i)));
    }

    assert_eq!(tables.trim_activity(5), 5);
    assert!(tables.contains_activity("old", "did:plc:5"));
    assert!(!tables.contains_activity("old", "did:plc:4"));
    for i in 0..4 {
        assert!(tables.contains_activity("new", &format!("did:plc:{i}")));
    }
}

#[test]
fn prepend_keeps_index_expiry_and_skips_missing_index() {
    let mut tables = Tables::new(Ttls::default());
    assert!(!tables.prepend_to_index("cat", did("did:plc:z")));
    assert!(tables.account_index("cat", at(0)).is_none());

    tables.put_account_index("cat", vec![did("did:plc:a")], at(0));
    let expiry = tables.account_index.entry_mut("cat").unwrap().expires_at;

    assert!(tables.prepend_to_index("cat", did("did:plc:z")));
    assert!(!tables.prepend_to_index("cat", did("did:plc:a")));

    let entry = tables.account_index.entry_mut("cat").unwrap();
    assert_eq!(entry.expires_at, expiry);
    assert_eq!(entry.value, vec![did("did:plc:z"), did("did:plc:a")]);
}

#[test]
fn seen_markers_only_move_forward() {
    let mut tables = Tables::new(Ttls::default());
    let t1: ArcStr = "2024-01-01T00:00:01Z".into();
    let t2: ArcStr = "2024-01-01T00:00:02Z".into();

    assert!(tables.mark_seen("me", "did:plc:a", t2.clone()));
    assert!(!tables.mark_seen("me", "did:plc:a", t1));
    assert!(!tables.mark_seen("me", "did:plc:a", t2.clone()));

    let markers = tables.seen_markers("me");
    assert_eq!(markers.get("did:plc:a"), Some(&t2));
    assert!(tables.seen_markers("someone else").is_empty());
}

#[tokio::test]
async fn mock_store_serves_fresh_entries() {
    let store = Store::mock(Ttls::default());
    assert!(store.handle("alice.test".into()).await.is_none());

    store
        .put_handle("alice.test".into(), did("did:plc:alice"))
        .await
        .unwrap();
    assert_eq!(
        store.handle("alice.test".into()).await,
        Some(did("did:plc:alice"))
    );
    assert_eq!(store.delete_expired().await.unwrap(), 0);
}

async fn actual_store(dir: &std::path::Path) -> Store {
    let config = Config::mock(Data::default());
    config
        .set_path(PathOpt::CacheDir, ArcPath::from(dir))
        .await;
    Store::spawn(Fs::spawn(), config, Log::mock()).await.unwrap()
}

#[tokio::test]
async fn tables_survive_a_restart() {
    let dir = tempfile::tempdir().unwrap();

    let store = actual_store(dir.path()).await;
    let post = Post {
        uri: "at://did:plc:a/lol.916.frame.image/1".into(),
        cid: "bafy1".into(),
        created_at: "2024-01-01T00:00:00Z".into(),
        attachment: "bafyimg".into(),
        caption: Some("hello".into()),
        alt_text: None,
        aspect: None,
        expires_at: None,
    };
    store
        .put_author_page(
            did("did:plc:a"),
            "cat".into(),
            None,
            PostPage {
                posts: vec![post.clone()],
                cursor: Some("1".into()),
            },
        )
        .await
        .unwrap();
    store
        .put_activity(ActivityRecord {
            category: "cat".into(),
            account: did("did:plc:a"),
            state: ActivityState::HasContent {
                created_at: post.created_at.clone(),
                content_id: post.attachment.clone(),
                caption: post.caption.clone(),
                alt_text: None,
            },
            checked_at: Utc::now(),
        })
        .await
        .unwrap();
    store
        .mark_seen(did("me"), did("did:plc:a"), post.created_at.clone())
        .await
        .unwrap();
    drop(store);

    let store = actual_store(dir.path()).await;
    let page = store
        .author_page(did("did:plc:a"), "cat".into(), None)
        .await
        .unwrap();
    assert_eq!(page.posts, vec![post.clone()]);
    assert_eq!(page.cursor.as_deref(), Some("1"));
    assert!(matches!(
        store.activity("cat".into(), did("did:plc:a")).await,
        ActivityStatus::HasContent(activity) if activity.content_id == post.attachment
    ));
    assert_eq!(
        store.seen_markers(did("me")).await.get("did:plc:a"),
        Some(&post.created_at)
    );
}

#[tokio::test]
async fn unreadable_table_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    tokio::fs::write(dir.path().join("follows.toml"), "not [valid")
        .await
        .unwrap();

    let config = Config::mock(Data::default());
    config
        .set_path(PathOpt::CacheDir, ArcPath::from(dir.path()))
        .await;
    let log = Log::mock();
    let store = Store::spawn(Fs::spawn(), config, log.clone()).await.unwrap();

    assert!(store.follows(did("me")).await.is_none());
    let messages = log.get_messages().unwrap();
    assert!(messages.iter().any(|m| m.message.contains("follows.toml")));
}

#[tokio::test]
async fn trim_through_actor_reports_evictions() {
    let dir = tempfile::tempdir().unwrap();
    let store = actual_store(dir.path()).await;
    let now = Utc::now();
    for i in 0..4 {
        store
            .put_activity(checked("cat", &format!("did:plc:{i}"), now - TimeDelta::seconds(10 - i)))
            .await
            .unwrap();
    }

    assert_eq!(store.trim_activity(3).await.unwrap(), 1);
    assert_eq!(
        store.activity("cat".into(), did("did:plc:0")).await,
        ActivityStatus::Unknown
    );
    for i in 1..4 {
        assert_eq!(
            store.activity("cat".into(), did(&format!("did:plc:{i}"))).await,
            ActivityStatus::Empty
        );
    }
}

#[tokio::test]
async fn failed_writes_reach_the_caller_and_leave_tables_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let cache_dir = dir.path().join("tables");
    let store = actual_store(&cache_dir).await;
    store
        .put_follows(did("me"), vec![did("did:plc:a")])
        .await
        .unwrap();
    tokio::fs::remove_dir_all(&cache_dir).await.unwrap();

    let err = store
        .put_follows(did("me"), vec![did("did:plc:b")])
        .await
        .unwrap_err();
    assert!(format!("{err:#}").contains("follows"));
    assert_eq!(store.follows(did("me")).await, Some(vec![did("did:plc:a")]));

    assert!(store.put_follows(did("you"), vec![]).await.is_err());
    assert_eq!(store.follows(did("you")).await, None);

    assert!(
        store
            .mark_seen(did("me"), did("did:plc:a"), "2025-01-01T00:00:00Z".into())
            .await
            .is_err()
    );
    assert!(store.seen_markers(did("me")).await.is_empty());

    assert!(
        store
            .put_activities(vec![checked("cat", "did:plc:a", Utc::now())])
            .await
            .is_err()
    );
    assert_eq!(
        store.activity("cat".into(), did("did:plc:a")).await,
        ActivityStatus::Unknown
    );
}
