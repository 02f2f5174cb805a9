use chrono::{DateTime, Local};
use tracing::info;

/// Errors a sink can report for a single delivery.
///
/// The dispatcher logs them and moves on to the next message.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    // the built-in sinks never fail
    #[cfg_attr(not(test), allow(dead_code))]
    #[error("Sink for {topic} rejected message: {reason}")]
    Rejected { topic: String, reason: String },
}

/// Per-topic destination for routed message text.
///
/// Only ever called from the dispatch thread, so implementations do not need
/// to be `Sync`.
pub trait TopicSink {
    fn append(&mut self, text: &str, received_at: DateTime<Local>) -> Result<(), SinkError>;
}

/// Sink used in headless mode: one structured log event per message.
#[derive(Debug, Clone)]
pub struct LogSink {
    topic: String,
}

impl LogSink {
    pub fn new(topic: &str) -> Self {
        LogSink {
            topic: topic.to_string(),
        }
    }
}

impl TopicSink for LogSink {
    fn append(&mut self, text: &str, received_at: DateTime<Local>) -> Result<(), SinkError> {
        info!(
            topic = %self.topic,
            received_at = %received_at.format("%H:%M:%S%.3f"),
            "{}",
            text.trim_end()
        );
        Ok(())
    }
}
