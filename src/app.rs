use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;

pub mod config;
pub mod discover;
pub mod feed;
pub mod store;

mod core;
mod data;
mod error;
mod report;
mod session;

pub use data::{Command, MockData};
pub use error::FeedError;
pub use session::Session;

use crate::{
    ArcPath, api::atproto::AtprotoApi, app::config::Config, app::store::Store, env::Env, log::Log,
};

/// App - Central coordinator for the entire application
///
/// Owns the wiring between the actors and runs one command at a time on the
/// caller's task.
#[derive(Debug)]
pub enum App {
    /// Ready to be used
    Ready(Arc<core::Core>),
    /// Mock implementation for testing
    Mock(Arc<Mutex<MockData>>),
}

impl App {
    /// Create a new App with full initialization
    ///
    /// This performs all necessary setup including:
    /// - Actor initialization (env, fs, config, log, net, store, api)
    /// - Configuration loading, writing the defaults on first run
    /// - Cache table loading
    pub async fn build(config_path: Option<ArcPath>) -> Result<Self> {
        let core = core::Core::build(config_path).await?;
        Ok(Self::Ready(Arc::new(core)))
    }

    /// Create an App over collaborators that are already running, usually
    /// mocks.
    pub fn with(env: Env, config: Config, log: Log, store: Store, api: AtprotoApi) -> Self {
        Self::Ready(Arc::new(core::Core::with(env, config, log, store, api)))
    }

    /// Create a mock App for testing
    pub fn mock(data: MockData) -> Self {
        Self::Mock(Arc::new(Mutex::new(data)))
    }

    /// Execute a command and return what it has to say
    ///
    /// # Errors
    /// Only failures the user can act on: no signed-in viewer, an unknown
    /// handle, a cache store that cannot persist. Remote hiccups are logged
    /// and yield partial results instead.
    pub async fn resolve(&self, command: Command) -> Result<String> {
        match self {
            Self::Ready(core) => core.execute(command).await,
            Self::Mock(data) => {
                let mut mock_data = data.lock().await;
                mock_data.executed_commands.push(command);
                Ok(mock_data.output.clone())
            }
        }
    }

    /// Flush the log before the process exits
    pub async fn shutdown(&self) {
        if let Self::Ready(core) = self {
            let _ = core.shutdown().await;
        }
    }
}
