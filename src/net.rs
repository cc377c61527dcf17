use std::collections::HashMap;

use anyhow::Context;
use tokio::sync::mpsc::Sender;

use crate::{ArcStr, app::config::Config, log::Log};

mod core;
mod message;
mod mock;
#[cfg(test)]
mod tests;

use message::Message;

/// The networking actor. Only `GET` is needed: every remote call the
/// application makes is a read.
#[derive(Debug, Clone)]
pub enum Net {
    /// Performs real HTTP requests
    Actual(Sender<Message>),
    /// Answers from a table of canned bodies keyed by URL
    Mock(mock::Mock),
}

impl Net {
    /// Builds the HTTP client from the configured timeout and spawns the actor.
    pub async fn spawn(config: Config, log: Log) -> anyhow::Result<Self> {
        let (net, _) = core::Core::new(config, log).await?.spawn();
        Ok(net)
    }

    /// Creates a mock answering `GET url` with `responses[url]`. Unknown URLs
    /// fail like a 404 would.
    pub fn mock<I, K, V>(responses: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self::Mock(mock::Mock::new(responses))
    }

    /// Performs a `GET` request and returns the body.
    ///
    /// # Errors
    /// On transport failures and on any non-success status.
    pub async fn get(&self, url: ArcStr) -> anyhow::Result<ArcStr> {
        match self {
            Self::Actual(sender) => {
                let (tx, rx) = tokio::sync::oneshot::channel();
                sender
                    .send(Message::Get { url, tx })
                    .await
                    .context("Sending message to Net actor")
                    .expect("Net actor died");
                rx.await
                    .context("Awaiting response from Net actor")
                    .expect("Net actor died")
            }
            Self::Mock(mock) => mock.get(url).await,
        }
    }

    /// URLs requested so far, in order. Only the mock records them.
    pub async fn requested(&self) -> Option<Vec<String>> {
        match self {
            Self::Actual(_) => None,
            Self::Mock(mock) => Some(mock.requested().await),
        }
    }

    /// Adds or replaces canned responses on a mock. No-op for the real actor.
    pub async fn respond(&self, responses: HashMap<String, String>) {
        if let Self::Mock(mock) = self {
            mock.extend(responses).await;
        }
    }
}
