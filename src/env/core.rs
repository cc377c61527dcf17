use std::env::VarError;

use tokio::sync::{mpsc, oneshot};

use crate::{ArcOsStr, ArcStr};

use super::message::Message;

#[derive(Debug, Default)]
pub struct Core;

impl Core {
    pub fn new() -> Self {
        Self
    }

    pub fn spawn(self) -> (super::Env, tokio::task::JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel(crate::BUFFER_SIZE);
        let handle = tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                match msg {
                    Message::Get { key, tx } => Self::get(key, tx),
                }
            }
        });

        (super::Env::Actual(tx), handle)
    }

    fn get(key: ArcOsStr, tx: oneshot::Sender<Result<ArcStr, VarError>>) {
        let res = std::env::var(&key).map(|value| ArcStr::from(value.as_str()));
        let _ = tx.send(res);
    }
}
