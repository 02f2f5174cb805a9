//! Relay queue between the broker thread and the dispatch loop.
//!
//! Any number of producers append, exactly one consumer drains. The queue
//! holds its own lock, so callers never need external synchronization. The
//! critical section is a push or a swap, so producers are never held up by
//! a slow consumer.

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

use super::message::Message;

/// What happens when a bounded queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueuePolicy {
    /// Grow without limit. A stalled consumer means unbounded memory.
    #[default]
    Unbounded,
    /// Keep at most `capacity` messages, evicting the oldest one first.
    DropOldest { capacity: usize },
}

impl QueuePolicy {
    pub fn from_capacity(capacity: Option<usize>) -> Self {
        match capacity {
            Some(capacity) => QueuePolicy::DropOldest { capacity },
            None => QueuePolicy::Unbounded,
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    messages: VecDeque<Message>,
    closed: bool,
    dropped: u64,
}

#[derive(Debug, Default)]
pub struct RelayQueue {
    state: Mutex<QueueState>,
    policy: QueuePolicy,
}

impl RelayQueue {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::with_policy(QueuePolicy::Unbounded)
    }

    pub fn with_policy(policy: QueuePolicy) -> Self {
        debug!("Creating relay queue with policy {:?}", policy);
        RelayQueue {
            state: Mutex::new(QueueState::default()),
            policy,
        }
    }

    /// Appends a message to the tail.
    ///
    /// Returns `false` if the queue is closed; the message is discarded in
    /// that case. Never panics, a poisoned lock is recovered.
    pub fn enqueue(&self, message: Message) -> bool {
        let mut state = self.lock();
        if state.closed {
            trace!("Queue closed, discarding message for {}", message.topic());
            return false;
        }

        if let QueuePolicy::DropOldest { capacity } = self.policy {
            while state.messages.len() >= capacity.max(1) {
                state.messages.pop_front();
                state.dropped += 1;
            }
        }

        state.messages.push_back(message);
        true
    }

    /// Removes and returns everything queued right now, oldest first.
    ///
    /// Does not wait for new messages. Keeps returning buffered messages after
    /// [`close`](Self::close) until the queue is empty.
    pub fn drain_all(&self) -> Vec<Message> {
        let drained = std::mem::take(&mut self.lock().messages);
        Vec::from(drained)
    }

    /// Stops accepting messages. Idempotent.
    pub fn close(&self) {
        let mut state = self.lock();
        if !state.closed {
            debug!(
                "Closing relay queue with {} pending messages",
                state.messages.len()
            );
            state.closed = true;
        }
    }

    #[cfg(test)]
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.lock().messages.is_empty()
    }

    /// Messages evicted by the drop-oldest policy so far.
    pub fn dropped(&self) -> u64 {
        self.lock().dropped
    }

    // A panicking producer must not take the queue down with it
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Barrier};
    use std::thread;

    fn payloads(messages: &[Message]) -> Vec<String> {
        messages
            .iter()
            .map(|m| m.payload_text().into_owned())
            .collect()
    }

    /// Payloads look like "<producer>:<seq>".
    fn parse(message: &Message) -> (usize, usize) {
        let text = message.payload_text();
        let (producer, seq) = text.split_once(':').unwrap();
        (producer.parse().unwrap(), seq.parse().unwrap())
    }

    #[test]
    fn test_single_producer_keeps_order() {
        let queue = RelayQueue::new();
        for i in 0..50 {
            assert!(queue.enqueue(Message::received("rj1", i.to_string())));
        }

        let drained = queue.drain_all();
        let expected: Vec<String> = (0..50).map(|i| i.to_string()).collect();
        assert_eq!(payloads(&drained), expected);
    }

    #[test]
    fn test_drain_twice_is_empty() {
        let queue = RelayQueue::new();
        queue.enqueue(Message::received("rj1", "a"));
        queue.enqueue(Message::received("rj1", "b"));

        assert_eq!(queue.drain_all().len(), 2);
        assert!(queue.drain_all().is_empty());
        assert!(queue.is_empty());
    }

    #[test]
    fn test_drain_on_empty_queue() {
        let queue = RelayQueue::new();
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_close_keeps_buffered_messages() {
        let queue = RelayQueue::new();
        queue.enqueue(Message::received("rj1", "before"));
        queue.close();
        queue.close();

        assert!(queue.is_closed());
        assert!(!queue.enqueue(Message::received("rj1", "after")));

        assert_eq!(payloads(&queue.drain_all()), vec!["before"]);
        assert!(queue.drain_all().is_empty());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_enqueue_after_close_from_other_thread() {
        let queue = Arc::new(RelayQueue::new());
        queue.close();

        let producer = {
            let queue = queue.clone();
            thread::spawn(move || {
                for i in 0..10 {
                    queue.enqueue(Message::received("rj1", i.to_string()));
                }
            })
        };

        assert!(producer.join().is_ok());
        assert!(queue.drain_all().is_empty());
    }

    #[test]
    fn test_two_producers_merge() {
        let queue = Arc::new(RelayQueue::new());
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = (0..2)
            .map(|producer| {
                let queue = queue.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for seq in 0..500 {
                        queue.enqueue(Message::received("rj1", format!("{}:{}", producer, seq)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let drained = queue.drain_all();
        assert_eq!(drained.len(), 1000);

        let mut next = [0usize; 2];
        for message in &drained {
            let (producer, seq) = parse(message);
            assert_eq!(seq, next[producer], "producer {} out of order", producer);
            next[producer] += 1;
        }
        assert_eq!(next, [500, 500]);
    }

    #[test]
    fn test_four_producers_250_each() {
        let queue = Arc::new(RelayQueue::new());
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|producer| {
                let queue = queue.clone();
                let barrier = barrier.clone();
                thread::spawn(move || {
                    barrier.wait();
                    for seq in 0..250 {
                        queue.enqueue(Message::received("rj1", format!("{}:{}", producer, seq)));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let drained = queue.drain_all();
        assert_eq!(drained.len(), 1000);

        for producer in 0..4 {
            let seqs: Vec<usize> = drained
                .iter()
                .map(parse)
                .filter(|(p, _)| *p == producer)
                .map(|(_, seq)| seq)
                .collect();
            assert_eq!(seqs, (0..250).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_drop_oldest_policy() {
        let queue = RelayQueue::with_policy(QueuePolicy::DropOldest { capacity: 3 });
        for i in 0..5 {
            queue.enqueue(Message::received("rj1", i.to_string()));
        }

        assert_eq!(queue.dropped(), 2);
        assert_eq!(payloads(&queue.drain_all()), vec!["2", "3", "4"]);
    }

    #[test]
    fn test_policy_from_capacity() {
        assert_eq!(QueuePolicy::from_capacity(None), QueuePolicy::Unbounded);
        assert_eq!(
            QueuePolicy::from_capacity(Some(8)),
            QueuePolicy::DropOldest { capacity: 8 }
        );
    }
}
