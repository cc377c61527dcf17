use std::{collections::LinkedList, io};

use anyhow::Context;
use tokio::sync::{mpsc::Sender, oneshot};

use crate::{ArcFile, ArcPath};

mod core;
mod message;
mod mock;

use message::Message;

/// The filesystem actor.
///
/// Every file the application touches goes through this handle, so tests can
/// swap in [`Fs::mock`] and keep all writes inside a temporary directory.
///
/// # Examples
/// ```ignore
/// let fs = Fs::spawn();
/// fs.write(path.clone(), "hello".into()).await?;
/// assert_eq!(fs.read_to_string(path).await?, "hello");
/// ```
#[derive(Debug, Clone)]
pub enum Fs {
    /// Operates on the real filesystem
    Actual(Sender<Message>),
    /// Operates inside a private temporary directory
    Mock(mock::Mock),
}

impl Fs {
    pub fn spawn() -> Self {
        let (fs, _) = core::Core::new().spawn();
        fs
    }

    /// Creates a mock rooted in a fresh temporary directory. Absolute paths
    /// are re-rooted under that directory.
    pub fn mock() -> Self {
        Self::Mock(mock::Mock::new())
    }

    async fn request<T>(
        sender: &Sender<Message>,
        build: impl FnOnce(oneshot::Sender<io::Result<T>>) -> Message,
    ) -> io::Result<T> {
        let (tx, rx) = oneshot::channel();
        sender
            .send(build(tx))
            .await
            .context("Sending message to Fs actor")
            .expect("Fs actor died");
        rx.await
            .context("Awaiting response from Fs actor")
            .expect("Fs actor died")
    }

    /// Opens a file for appending, creating it when missing. Handles are
    /// shared, so opening the same path twice yields the same file.
    pub async fn open_file(&self, path: ArcPath) -> io::Result<ArcFile> {
        match self {
            Self::Actual(sender) => Self::request(sender, |tx| Message::OpenFile { path, tx }).await,
            Self::Mock(mock) => mock.open_file(path).await,
        }
    }

    /// Drops the shared handle of an opened file.
    pub async fn close_file(&self, path: ArcPath) {
        match self {
            Self::Actual(sender) => {
                let _ = sender.send(Message::CloseFile { path }).await;
            }
            Self::Mock(_) => {}
        }
    }

    /// Reads the whole file as UTF-8.
    pub async fn read_to_string(&self, path: ArcPath) -> io::Result<String> {
        match self {
            Self::Actual(sender) => Self::request(sender, |tx| Message::Read { path, tx }).await,
            Self::Mock(mock) => mock.read_to_string(path).await,
        }
    }

    /// Replaces the file contents. The new contents are written to a sibling
    /// temporary file first and renamed over the target, so readers never
    /// observe a half-written file.
    pub async fn write(&self, path: ArcPath, contents: String) -> io::Result<()> {
        match self {
            Self::Actual(sender) => {
                Self::request(sender, |tx| Message::Write { path, contents, tx }).await
            }
            Self::Mock(mock) => mock.write(path, contents).await,
        }
    }

    pub async fn remove_file(&self, path: ArcPath) -> io::Result<()> {
        match self {
            Self::Actual(sender) => Self::request(sender, |tx| Message::RemoveFile { path, tx }).await,
            Self::Mock(mock) => mock.remove_file(path).await,
        }
    }

    pub async fn read_dir(&self, path: ArcPath) -> io::Result<LinkedList<ArcPath>> {
        match self {
            Self::Actual(sender) => Self::request(sender, |tx| Message::ReadDir { path, tx }).await,
            Self::Mock(mock) => mock.read_dir(path).await,
        }
    }

    /// Creates a directory and all of its parents.
    pub async fn mkdir(&self, path: ArcPath) -> io::Result<()> {
        match self {
            Self::Actual(sender) => Self::request(sender, |tx| Message::MkDir { path, tx }).await,
            Self::Mock(mock) => mock.mkdir(path).await,
        }
    }

    /// Paths written so far, in order. Only the mock records them.
    pub async fn written(&self) -> Option<Vec<ArcPath>> {
        match self {
            Self::Actual(_) => None,
            Self::Mock(mock) => Some(mock.written().await),
        }
    }
}
