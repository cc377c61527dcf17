use std::time::SystemTime;

use anyhow::Context;
use tokio::{io::AsyncWriteExt, task::JoinHandle};

use super::data::{LogLevel, LogMessage};
use super::message::Message;
use crate::{ArcFile, ArcPath, fs::Fs};

const LOG_PREFIX: &str = "framefeed_";
const SCOPE: &str = "log";

/// Writes every message to a per-run log file and to `latest.log`, and keeps
/// the messages at or above `print_level` for [`Core::flush`].
#[derive(Debug)]
pub struct Core {
    fs: Fs,
    log_dir: ArcPath,
    log_path: ArcPath,
    log_file: ArcFile,
    latest_log_file: ArcFile,
    logs_to_print: Vec<LogMessage>,
    print_level: LogLevel,
    /// Days a log file is kept; 0 disables collection
    max_age: usize,
}

impl Core {
    pub async fn build(
        fs: Fs,
        level: LogLevel,
        max_age: usize,
        log_dir: ArcPath,
    ) -> anyhow::Result<Self> {
        let log_path = ArcPath::from(
            log_dir
                .join(format!(
                    "{LOG_PREFIX}{}.log",
                    chrono::Utc::now().format("%Y-%m-%d-%H-%M-%S")
                ))
                .as_path(),
        );
        let latest_log_path = ArcPath::from(log_dir.join("latest.log").as_path());

        fs.mkdir(log_dir.clone())
            .await
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;

        let log_file = fs
            .open_file(log_path.clone())
            .await
            .with_context(|| format!("Failed to create log file: {}", log_path.display()))?;
        let latest_log_file = fs
            .open_file(latest_log_path.clone())
            .await
            .with_context(|| {
                format!(
                    "Failed to create latest log file: {}",
                    latest_log_path.display()
                )
            })?;

        Ok(Self {
            fs,
            log_dir,
            log_path,
            log_file,
            latest_log_file,
            logs_to_print: Vec::new(),
            print_level: level,
            max_age,
        })
    }

    pub fn spawn(mut self) -> (super::Log, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    Message::Log(msg) => self.log(msg).await,
                    Message::Flush => {
                        self.flush();
                        rx.close();
                        break;
                    }
                    Message::CollectGarbage => self.collect_garbage().await,
                }
            }
        });
        (super::Log::Actual(tx), handle)
    }

    async fn log(&mut self, message: LogMessage) {
        let line = format!(
            "[{}] {}\n",
            chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC"),
            message
        );

        for file in [&self.log_file, &self.latest_log_file] {
            let mut lock = file.write().await;
            let written = async {
                lock.write_all(line.as_bytes()).await?;
                lock.flush().await
            }
            .await;
            if let Err(e) = written {
                eprintln!("Failed to write log line: {e}");
            }
        }

        if message.level >= self.print_level {
            self.logs_to_print.push(message);
        }
    }

    fn flush(self) {
        for message in &self.logs_to_print {
            eprintln!("{}", message);
        }
        if !self.logs_to_print.is_empty() {
            eprintln!("Check the full log file: {}", self.log_path.display());
        }
    }

    async fn collect_garbage(&mut self) {
        if self.max_age == 0 {
            return;
        }

        let Ok(logs) = self.fs.read_dir(self.log_dir.clone()).await else {
            self.log(LogMessage {
                level: LogLevel::Error,
                scope: SCOPE,
                message: "Failed to read the logs directory during garbage collection".into(),
            })
            .await;
            return;
        };

        let now = SystemTime::now();
        for log in logs {
            let Some(filename) = log.file_name().map(|f| f.to_string_lossy().into_owned()) else {
                continue;
            };
            if !filename.starts_with(LOG_PREFIX) || !filename.ends_with(".log") {
                continue;
            }
            let Ok(modified) = tokio::fs::metadata(&log).await.and_then(|m| m.modified()) else {
                continue;
            };
            let Ok(age) = now.duration_since(modified) else {
                continue;
            };

            let days = (age.as_secs() / 60 / 60 / 24) as usize;
            if days > self.max_age && self.fs.remove_file(log.clone()).await.is_err() {
                self.log(LogMessage {
                    level: LogLevel::Warning,
                    scope: SCOPE,
                    message: format!("Failed to remove the log file: {}", log.display()),
                })
                .await;
            }
        }
    }
}
