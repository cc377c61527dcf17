use std::sync::{Arc, Mutex};

use super::data::{LogLevel, LogMessage};

/// Logger that records messages in memory, in the order they were sent.
#[derive(Debug, Clone, Default)]
pub struct Mock {
    messages: Arc<Mutex<Vec<LogMessage>>>,
}

impl Mock {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn log(&self, scope: &'static str, message: String, level: LogLevel) {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(LogMessage {
                level,
                scope,
                message,
            });
        }
    }

    pub fn flush(&self) {
        for message in self.messages() {
            eprintln!("{message}");
        }
    }

    pub fn messages(&self) -> Vec<LogMessage> {
        self.messages
            .lock()
            .map(|messages| messages.clone())
            .unwrap_or_default()
    }
}
