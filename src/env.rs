use std::env::VarError;

use anyhow::Context;
use tokio::sync::mpsc::Sender;

use crate::{ArcOsStr, ArcStr};

mod core;
mod message;
mod mock;

use message::Message;

/// Read-only access to the process environment.
///
/// Only lookups are exposed; the process environment is never mutated, so
/// no `unsafe` is needed anywhere in the actor.
#[derive(Debug, Clone)]
pub enum Env {
    /// Reads variables from the real process environment
    Actual(Sender<Message>),
    /// Serves variables from an in-memory table
    Mock(mock::Mock),
}

impl Env {
    pub fn spawn() -> Self {
        let (env, _) = core::Core::new().spawn();
        env
    }

    /// Creates a mock seeded with the given `(name, value)` pairs.
    pub fn mock<I, K, V>(vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        Self::Mock(mock::Mock::new(vars))
    }

    /// Looks up an environment variable.
    ///
    /// # Errors
    /// [`VarError::NotPresent`] when unset, [`VarError::NotUnicode`] when the
    /// value is not valid UTF-8.
    pub async fn env(&self, key: ArcOsStr) -> Result<ArcStr, VarError> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::Get { key, tx })
                    .await
                    .context("Sending message to Env actor")
                    .expect("Env actor died");
                rx.await
                    .context("Awaiting response from Env actor")
                    .expect("Env actor died")
            }
            Self::Mock(mock) => mock.env(&key),
        }
    }

    /// Looks up `key`, treating unset and empty values the same way.
    pub async fn non_empty(&self, key: &str) -> Option<ArcStr> {
        self.env(ArcOsStr::from(std::ffi::OsStr::new(key)))
            .await
            .ok()
            .filter(|value| !value.is_empty())
    }
}
