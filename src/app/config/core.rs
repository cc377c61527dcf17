use anyhow::Context;

use crate::{ArcPath, fs::Fs};

use super::{data::Data, message::Message};

/// Holds the configuration in memory and moves it to and from a TOML file.
pub struct Core {
    fs: Fs,
    path: ArcPath,
    data: Data,
}

impl Core {
    pub fn new(fs: Fs, path: ArcPath) -> Self {
        Self {
            fs,
            path,
            data: Data::default(),
        }
    }

    pub fn spawn(mut self) -> (super::Config, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    Message::Load { tx } => {
                        let _ = tx.send(self.load().await);
                    }
                    Message::Save { tx } => {
                        let _ = tx.send(self.save().await);
                    }
                    Message::GetPath { opt, tx } => {
                        let _ = tx.send(self.data.path(opt));
                    }
                    Message::SetPath { opt, path } => self.data.set_path(opt, path),
                    Message::GetStr { opt, tx } => {
                        let _ = tx.send(self.data.string(opt));
                    }
                    Message::SetStr { opt, value } => self.data.set_string(opt, value),
                    Message::GetLogLevel { tx } => {
                        let _ = tx.send(self.data.log_level());
                    }
                    Message::SetLogLevel { level } => self.data.set_log_level(level),
                    Message::GetUSize { opt, tx } => {
                        let _ = tx.send(self.data.usize(opt));
                    }
                    Message::SetUSize { opt, size } => self.data.set_usize(opt, size),
                    Message::GetTtls { tx } => {
                        let _ = tx.send(self.data.ttls());
                    }
                }
            }
        });
        (super::Config::Actual(tx), handle)
    }

    async fn load(&mut self) -> anyhow::Result<()> {
        let contents = self
            .fs
            .read_to_string(self.path.clone())
            .await
            .with_context(|| format!("Reading config file {}", self.path.display()))?;
        self.data = toml::from_str(&contents)
            .with_context(|| format!("Parsing config file {}", self.path.display()))?;
        Ok(())
    }

    async fn save(&self) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            self.fs
                .mkdir(ArcPath::from(parent))
                .await
                .with_context(|| format!("Creating config directory {}", parent.display()))?;
        }
        let contents = toml::to_string_pretty(&self.data).context("Serializing config")?;
        self.fs
            .write(self.path.clone(), contents)
            .await
            .with_context(|| format!("Writing config file {}", self.path.display()))
    }
}
