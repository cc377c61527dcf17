use std::{ffi::OsStr, path::Path, sync::Arc};

use tokio::sync::RwLock;

/// Shared, immutable string. Cloning only bumps a reference count.
pub type ArcStr = Arc<str>;
/// Shared, immutable OS string, used for environment variable names.
pub type ArcOsStr = Arc<OsStr>;
/// Shared, immutable path.
pub type ArcPath = Arc<Path>;
/// An open file that may be written by more than one task.
pub type ArcFile = Arc<RwLock<tokio::fs::File>>;
