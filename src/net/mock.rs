use std::{collections::HashMap, sync::Arc};

use tokio::sync::Mutex;

use crate::ArcStr;

#[derive(Debug, Default)]
struct State {
    responses: HashMap<String, ArcStr>,
    requested: Vec<String>,
}

/// Canned HTTP responses keyed by the exact request URL.
#[derive(Debug, Clone, Default)]
pub struct Mock {
    state: Arc<Mutex<State>>,
}

impl Mock {
    pub fn new<I, K, V>(responses: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let responses = responses
            .into_iter()
            .map(|(url, body)| (url.into(), ArcStr::from(body.into().as_str())))
            .collect();
        Self {
            state: Arc::new(Mutex::new(State {
                responses,
                requested: Vec::new(),
            })),
        }
    }

    pub async fn get(&self, url: ArcStr) -> anyhow::Result<ArcStr> {
        let mut state = self.state.lock().await;
        state.requested.push(url.to_string());
        state
            .responses
            .get(url.as_ref())
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("GET request not found in mock responses: {}", url))
    }

    pub async fn requested(&self) -> Vec<String> {
        self.state.lock().await.requested.clone()
    }

    pub async fn extend(&self, responses: HashMap<String, String>) {
        let mut state = self.state.lock().await;
        for (url, body) in responses {
            state.responses.insert(url, ArcStr::from(body.as_str()));
        }
    }
}
