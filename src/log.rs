use std::fmt::Display;

use tokio::{sync::mpsc::Sender, task::JoinHandle};

use crate::{ArcPath, fs::Fs};

mod core;
mod data;
mod message;
mod mock;
#[cfg(test)]
mod tests;

pub use data::{LogLevel, LogMessage};
use message::Message;

/// The logging actor.
///
/// Every message carries a static scope naming the module that produced it,
/// so log lines read as `[time] [LEVEL] [scope] text`.
///
/// # Examples
/// ```ignore
/// const SCOPE: &str = "feed";
/// let log = Log::spawn(fs, LogLevel::Warning, 7, log_dir).await?;
/// log.info(SCOPE, "building feed");
/// ```
#[derive(Debug, Clone)]
pub enum Log {
    /// Writes to the log directory and buffers messages for stderr
    Actual(Sender<Message>),
    /// Keeps every message in memory for assertions
    Mock(mock::Mock),
}

impl Log {
    /// Builds the logger and spawns its actor.
    ///
    /// # Arguments
    /// * `fs` - Filesystem actor used to create and append to the log files
    /// * `level` - Minimum level echoed to stderr on [`Log::flush`]
    /// * `max_age` - Age in days after which old log files are collected; 0 keeps them forever
    /// * `log_dir` - Directory holding the log files
    ///
    /// # Errors
    /// If the directory or either log file cannot be created.
    pub async fn spawn(
        fs: Fs,
        level: LogLevel,
        max_age: usize,
        log_dir: ArcPath,
    ) -> anyhow::Result<Self> {
        let (log, _) = core::Core::build(fs, level, max_age, log_dir)
            .await?
            .spawn();
        Ok(log)
    }

    pub fn mock() -> Self {
        Self::Mock(mock::Mock::new())
    }

    fn log(&self, scope: &'static str, message: String, level: LogLevel) {
        let sender = match self {
            Self::Actual(sender) => sender.clone(),
            Self::Mock(mock) => return mock.log(scope, message, level),
        };

        // Logging never blocks the caller
        tokio::spawn(async move {
            let _ = sender
                .send(Message::Log(LogMessage {
                    level,
                    scope,
                    message,
                }))
                .await;
        });
    }

    pub fn info<M: Display>(&self, scope: &'static str, message: M) {
        self.log(scope, message.to_string(), LogLevel::Info);
    }

    pub fn warn<M: Display>(&self, scope: &'static str, message: M) {
        self.log(scope, message.to_string(), LogLevel::Warning);
    }

    pub fn error<M: Display>(&self, scope: &'static str, message: M) {
        self.log(scope, message.to_string(), LogLevel::Error);
    }

    /// Logs the error, if any, at `INFO` and hands the result back untouched.
    pub fn info_on_error<T, E: Display>(
        &self,
        scope: &'static str,
        result: Result<T, E>,
    ) -> Result<T, E> {
        if let Err(err) = &result {
            self.log(scope, err.to_string(), LogLevel::Info);
        }
        result
    }

    /// Logs the error, if any, at `WARN` and hands the result back untouched.
    pub fn warn_on_error<T, E: Display>(
        &self,
        scope: &'static str,
        result: Result<T, E>,
    ) -> Result<T, E> {
        if let Err(err) = &result {
            self.log(scope, err.to_string(), LogLevel::Warning);
        }
        result
    }

    /// Logs the error, if any, at `ERROR` and hands the result back untouched.
    pub fn error_on_error<T, E: Display>(
        &self,
        scope: &'static str,
        result: Result<T, E>,
    ) -> Result<T, E> {
        if let Err(err) = &result {
            self.log(scope, err.to_string(), LogLevel::Error);
        }
        result
    }

    /// Prints the buffered messages to stderr and stops the actor. Messages
    /// sent afterwards are dropped.
    pub fn flush(self) -> JoinHandle<()> {
        match self {
            Self::Actual(sender) => tokio::spawn(async move {
                let _ = sender.send(Message::Flush).await;
                // The actor exits once it has printed
                sender.closed().await;
            }),
            Self::Mock(mock) => tokio::spawn(async move { mock.flush() }),
        }
    }

    /// Deletes log files older than the configured `max_age`.
    pub async fn collect_garbage(&self) {
        if let Self::Actual(sender) = self {
            let _ = sender.send(Message::CollectGarbage).await;
        }
    }

    /// Messages recorded so far. Only the mock keeps them.
    pub fn get_messages(&self) -> Option<Vec<LogMessage>> {
        match self {
            Self::Actual(_) => None,
            Self::Mock(mock) => Some(mock.messages()),
        }
    }
}
