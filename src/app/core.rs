use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::task::JoinHandle;

use crate::api::atproto::AtprotoApi;
use crate::app::config::{Config, PathOpt, StrOpt, USizeOpt};
use crate::app::discover::Discover;
use crate::app::feed::Feed;
use crate::app::store::Store;
use crate::env::Env;
use crate::fs::Fs;
use crate::log::Log;
use crate::net::Net;
use crate::{ArcPath, ArcStr};

use super::data::Command;
use super::discover::LiveUpdate;
use super::report;
use super::session::Session;

const SCOPE: &str = "app";
/// Viewer used when a command names none
const VIEWER_VAR: &str = "FRAMEFEED_VIEWER";

/// Everything a command needs, wired together once per process.
#[derive(Debug)]
pub struct Core {
    env: Env,
    config: Config,
    log: Log,
    store: Store,
    api: AtprotoApi,
    discover: Discover,
    feed: Feed,
}

/// `$XDG_<kind>_HOME/framefeed`, or `$HOME/<fallback>/framefeed`.
async fn user_dir(env: &Env, xdg: &str, fallback: &str) -> Result<PathBuf> {
    if let Some(dir) = env.non_empty(xdg).await {
        return Ok(Path::new(&*dir).join("framefeed"));
    }
    let home = env
        .non_empty("HOME")
        .await
        .with_context(|| format!("Neither {xdg} nor HOME is set"))?;
    Ok(Path::new(&*home).join(fallback).join("framefeed"))
}

impl Core {
    /// Build the full actor graph from the config file at `config_path`, or
    /// the per-user default location.
    ///
    /// A missing or unreadable config file is replaced by one holding the
    /// defaults, with the cache and log directories placed under the user's
    /// cache directory.
    pub async fn build(config_path: Option<ArcPath>) -> Result<Self> {
        let env = Env::spawn();
        let fs = Fs::spawn();

        let config_path = match config_path {
            Some(path) => path,
            None => {
                let dir = user_dir(&env, "XDG_CONFIG_HOME", ".config").await?;
                ArcPath::from(dir.join("config.toml").as_path())
            }
        };

        let config = Config::spawn(fs.clone(), config_path);
        if config.load().await.is_err() {
            let cache = user_dir(&env, "XDG_CACHE_HOME", ".cache").await?;
            config
                .set_path(PathOpt::CacheDir, ArcPath::from(cache.join("tables").as_path()))
                .await;
            config
                .set_path(PathOpt::LogDir, ArcPath::from(cache.join("logs").as_path()))
                .await;
            config.save().await?;
        }

        let log = Log::spawn(
            fs.clone(),
            config.log_level().await,
            config.usize(USizeOpt::MaxAge).await,
            config.path(PathOpt::LogDir).await,
        )
        .await?;

        let net = Net::spawn(config.clone(), log.clone()).await?;
        let store = Store::spawn(fs, config.clone(), log.clone()).await?;
        let api = AtprotoApi::spawn(net, store.clone(), config.clone(), log.clone()).await;

        log.info(SCOPE, "App initialized successfully");
        Ok(Self::with(env, config, log, store, api))
    }

    /// Wire the components over already running collaborators.
    pub fn with(env: Env, config: Config, log: Log, store: Store, api: AtprotoApi) -> Self {
        let discover = Discover::new(api.clone(), store.clone(), config.clone(), log.clone());
        let feed = Feed::new(api.clone(), store.clone(), config.clone(), log.clone());
        Self {
            env,
            config,
            log,
            store,
            api,
            discover,
            feed,
        }
    }

    /// The session of `viewer`, or of the viewer named by the environment.
    async fn session(&self, viewer: Option<ArcStr>) -> Result<Session> {
        let viewer = match viewer {
            Some(viewer) => Some(viewer),
            None => self.env.non_empty(VIEWER_VAR).await,
        };
        let Some(viewer) = viewer else {
            return Ok(Session::signed_out());
        };
        let did = self
            .api
            .resolve_handle(viewer.clone())
            .await
            .with_context(|| format!("Resolving viewer {viewer}"))?;
        Ok(Session::signed_in(did))
    }

    async fn category(&self, category: Option<ArcStr>) -> ArcStr {
        match category {
            Some(category) => category,
            None => self.config.string(StrOpt::Category).await,
        }
    }

    /// Run one command and render its result.
    pub async fn execute(&self, command: Command) -> Result<String> {
        match command {
            Command::Feed { viewer } => {
                let session = self.session(viewer).await?;
                let viewer = session.viewer()?.clone();
                let seen = self.store.seen_markers(viewer.clone()).await;
                let authors = self.feed.build_feed(viewer, seen).await?;
                report::feed(&authors)
            }
            Command::More { account, cursor } => {
                let did = self.api.resolve_handle(account).await?;
                let page = self.feed.load_more_for_author(did.clone(), cursor).await?;
                report::page(&did, &page)
            }
            Command::Accounts { category } => {
                let category = self.category(category).await;
                let accounts = self
                    .discover
                    .list_accounts_for_category(category.clone())
                    .await?;
                report::accounts(&category, &accounts)
            }
            Command::Recent(options) => {
                let activities = self.discover.get_recent_activity(options).await?;
                report::activity(&activities)
            }
            Command::Live(update) => {
                let account = self.api.resolve_handle(update.account).await?;
                self.discover
                    .record_live_update(LiveUpdate { account, ..update })
                    .await?;
                Ok(String::from("Live update recorded\n"))
            }
            Command::Seen {
                viewer,
                author,
                created_at,
            } => {
                let session = self.session(viewer).await?;
                let viewer = session.viewer()?.clone();
                let author = self.api.resolve_handle(author).await?;
                let moved = self
                    .store
                    .mark_seen(viewer, author.clone(), created_at.clone())
                    .await?;
                Ok(if moved {
                    format!("{author} seen up to {created_at}\n")
                } else {
                    format!("{author} was already seen up to {created_at}\n")
                })
            }
            Command::Clean => {
                let removed = self.store.delete_expired().await?;
                self.log.collect_garbage().await;
                Ok(format!("Deleted {removed} expired cache entries\n"))
            }
        }
    }

    /// Flush pending log output; the cache store persists on every write.
    pub fn shutdown(&self) -> JoinHandle<()> {
        self.log.info(SCOPE, "Shutting down application");
        self.log.clone().flush()
    }
}
