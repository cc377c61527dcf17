use std::{
    collections::LinkedList,
    io,
    path::{Component, Path, PathBuf},
    sync::Arc,
};

use tempfile::TempDir;
use tokio::sync::Mutex;

use crate::{ArcFile, ArcPath};

/// Filesystem mock rooted in a temporary directory that lives as long as the
/// last clone of the mock.
#[derive(Debug, Clone)]
pub struct Mock {
    root: Arc<TempDir>,
    /// Every path passed to `write`, in order
    written: Arc<Mutex<Vec<ArcPath>>>,
}

impl Mock {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("Failed to create temp dir for Fs mock");
        Self {
            root: Arc::new(root),
            written: Arc::default(),
        }
    }

    /// Maps `path` inside the temporary root, dropping any root or prefix
    /// component so absolute paths cannot escape.
    fn real_path(&self, path: &Path) -> PathBuf {
        let relative: PathBuf = path
            .components()
            .filter(|c| !matches!(c, Component::RootDir | Component::Prefix(_)))
            .collect();
        self.root.path().join(relative)
    }

    pub async fn open_file(&self, path: ArcPath) -> io::Result<ArcFile> {
        super::core::open_append(&self.real_path(&path)).await
    }

    pub async fn read_to_string(&self, path: ArcPath) -> io::Result<String> {
        tokio::fs::read_to_string(self.real_path(&path)).await
    }

    pub async fn write(&self, path: ArcPath, contents: String) -> io::Result<()> {
        self.written.lock().await.push(path.clone());
        super::core::write_replacing(&self.real_path(&path), contents.as_bytes()).await
    }

    pub async fn written(&self) -> Vec<ArcPath> {
        self.written.lock().await.clone()
    }

    pub async fn remove_file(&self, path: ArcPath) -> io::Result<()> {
        tokio::fs::remove_file(self.real_path(&path)).await
    }

    pub async fn read_dir(&self, path: ArcPath) -> io::Result<LinkedList<ArcPath>> {
        super::core::read_dir(&self.real_path(&path)).await
    }

    pub async fn mkdir(&self, path: ArcPath) -> io::Result<()> {
        tokio::fs::create_dir_all(self.real_path(&path)).await
    }
}
