use std::{collections::LinkedList, io};

use tokio::sync::oneshot;

use crate::{ArcFile, ArcPath};

/// Messages that can be sent to the [`Fs`](super::Fs) actor.
#[derive(Debug)]
pub enum Message {
    /// Opens a file in append mode and returns a shared handle
    OpenFile {
        path: ArcPath,
        tx: oneshot::Sender<io::Result<ArcFile>>,
    },
    /// Forgets a shared handle
    CloseFile { path: ArcPath },
    /// Reads a whole file as UTF-8
    Read {
        path: ArcPath,
        tx: oneshot::Sender<io::Result<String>>,
    },
    /// Replaces a file's contents
    Write {
        path: ArcPath,
        contents: String,
        tx: oneshot::Sender<io::Result<()>>,
    },
    RemoveFile {
        path: ArcPath,
        tx: oneshot::Sender<io::Result<()>>,
    },
    ReadDir {
        path: ArcPath,
        tx: oneshot::Sender<io::Result<LinkedList<ArcPath>>>,
    },
    /// Creates a directory and its parents
    MkDir {
        path: ArcPath,
        tx: oneshot::Sender<io::Result<()>>,
    },
}
