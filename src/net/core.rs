use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use tokio::task::JoinHandle;

use crate::{
    ArcStr,
    app::config::{Config, USizeOpt},
    log::Log,
};

use super::message::Message;

const SCOPE: &str = "net";

/// Owns the HTTP client. Each request runs in its own task, so the actor
/// never serializes network I/O; callers bound concurrency themselves.
#[derive(Debug)]
pub struct Core {
    log: Log,
    client: Client,
}

impl Core {
    pub async fn new(config: Config, log: Log) -> anyhow::Result<Self> {
        let timeout = config.usize(USizeOpt::Timeout).await;
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout as u64))
            .user_agent(concat!("framefeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Building HTTP client")?;

        Ok(Self { log, client })
    }

    pub fn spawn(self) -> (super::Net, JoinHandle<()>) {
        let (tx, mut rx) = tokio::sync::mpsc::channel(crate::BUFFER_SIZE);

        let handle = tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                match message {
                    Message::Get { url, tx } => {
                        let client = self.client.clone();
                        let log = self.log.clone();
                        tokio::spawn(async move {
                            let response = get(&client, &url)
                                .await
                                .with_context(|| format!("GET request failed for URL: {}", url));
                            if response.is_err() {
                                log.info(SCOPE, format!("GET {url} failed"));
                            }
                            let _ = tx.send(response);
                        });
                    }
                }
            }
        });

        (super::Net::Actual(tx), handle)
    }
}

async fn get(client: &Client, url: &str) -> anyhow::Result<ArcStr> {
    let response = client
        .get(url)
        .send()
        .await
        .context("Sending GET request")?
        .error_for_status()
        .context("Checking response status")?;
    let text = response.text().await.context("Reading response body")?;
    Ok(ArcStr::from(text.as_str()))
}
