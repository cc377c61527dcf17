use super::data::LogMessage;

/// Messages accepted by the log actor.
#[derive(Debug)]
pub enum Message {
    /// Appends a line to the log files
    Log(LogMessage),
    /// Echoes buffered messages to stderr and stops the actor
    Flush,
    /// Deletes expired log files
    CollectGarbage,
}
