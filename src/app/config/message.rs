use tokio::sync::oneshot;

use crate::{ArcPath, ArcStr, log::LogLevel};

use super::data::{PathOpt, StrOpt, Ttls, USizeOpt};

/// Messages accepted by the configuration actor. Getters answer through
/// `tx`; setters only touch memory until the next [`Message::Save`].
#[derive(Debug)]
pub enum Message {
    Load {
        tx: oneshot::Sender<anyhow::Result<()>>,
    },
    Save {
        tx: oneshot::Sender<anyhow::Result<()>>,
    },
    GetPath {
        opt: PathOpt,
        tx: oneshot::Sender<ArcPath>,
    },
    SetPath {
        opt: PathOpt,
        path: ArcPath,
    },
    GetStr {
        opt: StrOpt,
        tx: oneshot::Sender<ArcStr>,
    },
    SetStr {
        opt: StrOpt,
        value: ArcStr,
    },
    GetLogLevel {
        tx: oneshot::Sender<LogLevel>,
    },
    SetLogLevel {
        level: LogLevel,
    },
    GetUSize {
        opt: USizeOpt,
        tx: oneshot::Sender<usize>,
    },
    SetUSize {
        opt: USizeOpt,
        size: usize,
    },
    /// All cache lifetimes at once
    GetTtls {
        tx: oneshot::Sender<Ttls>,
    },
}
