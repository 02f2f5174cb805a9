use std::sync::Arc;
use tracing::{debug, trace};

use crate::relay::{Message, RelayQueue};

/// Producer side of the relay, owned by the connection thread.
///
/// Builds a [`Message`] and enqueues it. Nothing else happens here so the
/// connection thread gets back to reading as fast as possible.
#[derive(Debug, Clone)]
pub struct MessageRelay {
    queue: Arc<RelayQueue>,
}

impl MessageRelay {
    pub fn new(queue: Arc<RelayQueue>) -> Self {
        MessageRelay { queue }
    }

    /// Called for every inbound publish. Returns whether the message was queued.
    pub fn on_publish(&self, topic: &str, payload: &[u8]) -> bool {
        let message = Message::received(topic, payload);
        debug!("Topic: {}\n{}", topic, message.formatted_text().trim_end());

        let accepted = self.queue.enqueue(message);
        if !accepted {
            trace!("Relay closed, message for {} dropped", topic);
        }
        accepted
    }
}
