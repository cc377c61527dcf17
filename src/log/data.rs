use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};

/// Severity of a log message. Ordered `Info < Warning < Error`, so a
/// threshold comparison selects what reaches stderr.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum LogLevel {
    /// Routine progress: cache hits, fetch counts
    #[default]
    Info,
    /// Something failed and was absorbed, e.g. an unreachable storage host
    Warning,
    /// The current operation could not complete
    Error,
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

/// A single log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    /// Module that emitted the message, e.g. `"feed"`
    pub scope: &'static str,
    pub message: String,
}

impl Display for LogMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] [{}] {}", self.level, self.scope, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Info < LogLevel::Warning);
        assert!(LogLevel::Warning < LogLevel::Error);
    }

    #[test]
    fn test_log_level_from_str() {
        assert_eq!(LogLevel::from_str("INFO").unwrap(), LogLevel::Info);
        assert_eq!(LogLevel::from_str("warn").unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::from_str("Warning").unwrap(), LogLevel::Warning);
        assert_eq!(LogLevel::from_str("error").unwrap(), LogLevel::Error);
        assert!(LogLevel::from_str("loud").is_err());
    }

    #[test]
    fn test_log_level_roundtrips_through_toml() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }

        let text = toml::to_string(&Wrapper {
            level: LogLevel::Error,
        })
        .unwrap();
        let back: Wrapper = toml::from_str(&text).unwrap();
        assert_eq!(back.level, LogLevel::Error);
    }

    #[test]
    fn test_log_message_display() {
        let msg = LogMessage {
            level: LogLevel::Warning,
            scope: "discover",
            message: "relay page failed".to_string(),
        };
        assert_eq!(msg.to_string(), "[WARN] [discover] relay page failed");
    }
}
