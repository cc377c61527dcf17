use std::{collections::HashMap, collections::LinkedList, io, path::Path};

use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::mpsc, sync::RwLock};

use crate::{ArcFile, ArcPath};

use super::message::Message;

/// Owns the table of shared append handles. Reads and writes of whole files
/// do not go through the table.
#[derive(Debug, Default)]
pub struct Core {
    files: HashMap<ArcPath, ArcFile>,
}

impl Core {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn spawn(mut self) -> (super::Fs, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                use Message::*;
                match msg {
                    OpenFile { path, tx } => {
                        let _ = tx.send(self.open_file(path).await);
                    }
                    CloseFile { path } => {
                        self.files.remove(&path);
                    }
                    Read { path, tx } => {
                        let _ = tx.send(tokio::fs::read_to_string(&path).await);
                    }
                    Write { path, contents, tx } => {
                        let _ = tx.send(write_replacing(&path, contents.as_bytes()).await);
                    }
                    RemoveFile { path, tx } => {
                        self.files.remove(&path);
                        let _ = tx.send(tokio::fs::remove_file(&path).await);
                    }
                    ReadDir { path, tx } => {
                        let _ = tx.send(read_dir(&path).await);
                    }
                    MkDir { path, tx } => {
                        let _ = tx.send(tokio::fs::create_dir_all(&path).await);
                    }
                }
            }
        });

        (super::Fs::Actual(tx), handle)
    }

    async fn open_file(&mut self, path: ArcPath) -> io::Result<ArcFile> {
        if let Some(file) = self.files.get(&path) {
            return Ok(file.clone());
        }

        let file = open_append(&path).await?;
        self.files.insert(path, file.clone());
        Ok(file)
    }
}

pub(super) async fn open_append(path: &Path) -> io::Result<ArcFile> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await?;
    Ok(ArcFile::new(RwLock::new(file)))
}

pub(super) async fn write_replacing(path: &Path, contents: &[u8]) -> io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(contents).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await
}

pub(super) async fn read_dir(path: &Path) -> io::Result<LinkedList<ArcPath>> {
    let mut rd = tokio::fs::read_dir(path).await?;
    let mut entries = LinkedList::new();
    while let Some(entry) = rd.next_entry().await? {
        entries.push_back(ArcPath::from(entry.path().as_path()));
    }
    Ok(entries)
}
