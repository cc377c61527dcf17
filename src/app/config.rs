use anyhow::Context;
use chrono::TimeDelta;
use tokio::sync::{mpsc::Sender, oneshot};

pub use data::{Data, PathOpt, StrOpt, TtlOpt, Ttls, USizeOpt};
use message::Message;

use crate::{ArcPath, ArcStr, fs::Fs, log::LogLevel};

mod core;
mod data;
mod message;
mod mock;

/// The configuration actor.
///
/// # Examples
/// ```ignore
/// let config = Config::spawn(fs, config_path);
/// if config.load().await.is_err() {
///     config.save().await?;
/// }
/// let cap = config.usize(USizeOpt::FollowCap).await;
/// ```
#[derive(Debug, Clone)]
pub enum Config {
    /// Backed by a TOML file
    Actual(Sender<Message>),
    /// Backed by memory only
    Mock(mock::Mock),
}

impl Config {
    pub fn spawn(fs: Fs, path: ArcPath) -> Self {
        let (config, _) = core::Core::new(fs, path).spawn();
        config
    }

    pub fn mock(data: Data) -> Self {
        Self::Mock(mock::Mock::new(data))
    }

    async fn ask<T>(sender: &Sender<Message>, build: impl FnOnce(oneshot::Sender<T>) -> Message) -> T {
        let (tx, rx) = oneshot::channel();
        sender
            .send(build(tx))
            .await
            .context("Sending message to Config actor")
            .expect("Config actor died");
        rx.await
            .context("Awaiting response from Config actor")
            .expect("Config actor died")
    }

    async fn tell(sender: &Sender<Message>, msg: Message) {
        sender
            .send(msg)
            .await
            .context("Sending message to Config actor")
            .expect("Config actor died");
    }

    /// Replaces the in-memory values with the ones in the config file.
    ///
    /// # Errors
    /// If the file is missing or not valid TOML. Callers usually answer a
    /// failure by saving the defaults.
    pub async fn load(&self) -> anyhow::Result<()> {
        match self {
            Self::Actual(sender) => Self::ask(sender, |tx| Message::Load { tx }).await,
            Self::Mock(_) => Ok(()),
        }
    }

    /// Writes the in-memory values to the config file, creating its directory.
    pub async fn save(&self) -> anyhow::Result<()> {
        match self {
            Self::Actual(sender) => Self::ask(sender, |tx| Message::Save { tx }).await,
            Self::Mock(_) => Ok(()),
        }
    }

    pub async fn path(&self, opt: PathOpt) -> ArcPath {
        match self {
            Self::Actual(sender) => Self::ask(sender, |tx| Message::GetPath { opt, tx }).await,
            Self::Mock(mock) => mock.path(opt).await,
        }
    }

    pub async fn set_path(&self, opt: PathOpt, path: ArcPath) {
        match self {
            Self::Actual(sender) => Self::tell(sender, Message::SetPath { opt, path }).await,
            Self::Mock(mock) => mock.set_path(opt, path).await,
        }
    }

    pub async fn string(&self, opt: StrOpt) -> ArcStr {
        match self {
            Self::Actual(sender) => Self::ask(sender, |tx| Message::GetStr { opt, tx }).await,
            Self::Mock(mock) => mock.string(opt).await,
        }
    }

    pub async fn set_string(&self, opt: StrOpt, value: ArcStr) {
        match self {
            Self::Actual(sender) => Self::tell(sender, Message::SetStr { opt, value }).await,
            Self::Mock(mock) => mock.set_string(opt, value).await,
        }
    }

    pub async fn log_level(&self) -> LogLevel {
        match self {
            Self::Actual(sender) => Self::ask(sender, |tx| Message::GetLogLevel { tx }).await,
            Self::Mock(mock) => mock.log_level().await,
        }
    }

    pub async fn set_log_level(&self, level: LogLevel) {
        match self {
            Self::Actual(sender) => Self::tell(sender, Message::SetLogLevel { level }).await,
            Self::Mock(mock) => mock.set_log_level(level).await,
        }
    }

    pub async fn usize(&self, opt: USizeOpt) -> usize {
        match self {
            Self::Actual(sender) => Self::ask(sender, |tx| Message::GetUSize { opt, tx }).await,
            Self::Mock(mock) => mock.usize(opt).await,
        }
    }

    pub async fn set_usize(&self, opt: USizeOpt, size: usize) {
        match self {
            Self::Actual(sender) => Self::tell(sender, Message::SetUSize { opt, size }).await,
            Self::Mock(mock) => mock.set_usize(opt, size).await,
        }
    }

    pub async fn ttls(&self) -> Ttls {
        match self {
            Self::Actual(sender) => Self::ask(sender, |tx| Message::GetTtls { tx }).await,
            Self::Mock(mock) => mock.ttls().await,
        }
    }

    pub async fn ttl(&self, opt: TtlOpt) -> TimeDelta {
        self.ttls().await.get(opt)
    }
}
