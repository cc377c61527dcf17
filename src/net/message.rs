use tokio::sync::oneshot::Sender;

use crate::ArcStr;

/// Messages accepted by the networking actor.
#[derive(Debug)]
pub enum Message {
    /// Performs an HTTP GET request and answers with the body
    Get {
        url: ArcStr,
        tx: Sender<anyhow::Result<ArcStr>>,
    },
}
