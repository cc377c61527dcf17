use std::env::VarError;

use tokio::sync::oneshot;

use crate::{ArcOsStr, ArcStr};

/// Messages accepted by the [`Env`](super::Env) actor.
#[derive(Debug)]
pub enum Message {
    /// Reads a single variable
    Get {
        key: ArcOsStr,
        tx: oneshot::Sender<Result<ArcStr, VarError>>,
    },
}
