use chrono::{DateTime, Local};
use std::borrow::Cow;
use std::fmt;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single broker message as seen by the receiver.
///
/// Fields are private so a message cannot change after it was handed to the
/// relay queue. `received_at` is taken from the local clock at receipt, never
/// from the publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    topic: String,
    payload: Vec<u8>,
    received_at: DateTime<Local>,
}

impl Message {
    /// Builds a message stamped with the current local time.
    pub fn received(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self::with_timestamp(topic, payload, Local::now())
    }

    pub fn with_timestamp(
        topic: impl Into<String>,
        payload: impl Into<Vec<u8>>,
        received_at: DateTime<Local>,
    ) -> Self {
        Message {
            topic: topic.into(),
            payload: payload.into(),
            received_at,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    #[cfg(test)]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn received_at(&self) -> DateTime<Local> {
        self.received_at
    }

    /// Payload decoded as UTF-8, invalid sequences replaced.
    pub fn payload_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }

    /// Text appended to the topic's log. The topic itself is not repeated
    /// because every topic has its own log.
    pub fn formatted_text(&self) -> String {
        format!(
            "[{}] Payload: {}\n",
            self.received_at.format(TIMESTAMP_FORMAT),
            self.payload_text()
        )
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} - {}: {}",
            self.received_at.format(TIMESTAMP_FORMAT),
            self.topic,
            self.payload_text()
        )
    }
}
