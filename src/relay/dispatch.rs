//! Dispatch loop: drain the relay queue and route every message to its sink.
//!
//! A pass is synchronous and bounded by the number of queued messages. It is
//! driven either by [`DispatchSchedule`] from the egui update callback or by a
//! tokio interval in headless mode. Nothing here blocks or does I/O besides
//! whatever the sinks do.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::queue::RelayQueue;
use super::registry::TopicRegistry;
use super::sink::TopicSink;

pub const DEFAULT_DISPATCH_PERIOD: Duration = Duration::from_millis(100);

/// Outcome of a single dispatch pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub drained: usize,
    pub delivered: usize,
    pub unknown: usize,
    pub failed: usize,
}

impl DispatchReport {
    fn merge(&mut self, other: &DispatchReport) {
        self.drained += other.drained;
        self.delivered += other.delivered;
        self.unknown += other.unknown;
        self.failed += other.failed;
    }
}

pub struct Dispatcher<S> {
    queue: Arc<RelayQueue>,
    registry: TopicRegistry<S>,
    totals: DispatchReport,
}

impl<S: TopicSink> Dispatcher<S> {
    pub fn new(queue: Arc<RelayQueue>, registry: TopicRegistry<S>) -> Self {
        debug!("Creating dispatcher for {} topics", registry.len());
        Dispatcher {
            queue,
            registry,
            totals: DispatchReport::default(),
        }
    }

    /// Runs one drain-and-route pass.
    ///
    /// Unknown topics and sink errors are logged and counted, never returned:
    /// one bad message must not hold back the ones queued after it.
    pub fn dispatch(&mut self) -> DispatchReport {
        let messages = self.queue.drain_all();
        let mut report = DispatchReport {
            drained: messages.len(),
            ..Default::default()
        };

        for message in messages {
            let Some(sink) = self.registry.get_mut(message.topic()) else {
                warn!("Message received for unknown topic: {}", message.topic());
                report.unknown += 1;
                continue;
            };

            match sink.append(&message.formatted_text(), message.received_at()) {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    warn!("Failed to deliver message for {}: {}", message.topic(), e);
                    report.failed += 1;
                }
            }
        }

        if report.drained > 0 {
            debug!("Dispatch pass finished: {:?}", report);
        }
        self.totals.merge(&report);
        report
    }

    pub fn registry(&self) -> &TopicRegistry<S> {
        &self.registry
    }

    pub fn queue(&self) -> &Arc<RelayQueue> {
        &self.queue
    }

    /// Sum of all passes so far.
    pub fn totals(&self) -> DispatchReport {
        self.totals
    }
}

/// Fixed-period schedule for the dispatch loop.
///
/// The first pass is due immediately. Every due pass reschedules the next one
/// a full period later; falling behind never produces a burst of catch-up
/// passes. After [`cancel`](Self::cancel) nothing is ever due again.
#[derive(Debug, Clone)]
pub struct DispatchSchedule {
    period: Duration,
    next_due: Option<Instant>,
    cancelled: bool,
}

impl DispatchSchedule {
    pub fn new(period: Duration) -> Self {
        DispatchSchedule {
            period,
            next_due: None,
            cancelled: false,
        }
    }

    #[cfg(test)]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Returns whether a pass should run now, rescheduling if so.
    pub fn poll_due(&mut self, now: Instant) -> bool {
        if self.cancelled {
            return false;
        }
        match self.next_due {
            Some(due) if now < due => false,
            _ => {
                self.next_due = Some(now + self.period);
                true
            }
        }
    }

    /// Time left until the next pass, `None` once cancelled.
    pub fn until_next(&self, now: Instant) -> Option<Duration> {
        if self.cancelled {
            return None;
        }
        Some(
            self.next_due
                .map(|due| due.saturating_duration_since(now))
                .unwrap_or(Duration::ZERO),
        )
    }

    pub fn cancel(&mut self) {
        if !self.cancelled {
            debug!("Dispatch schedule cancelled");
            self.cancelled = true;
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

impl Default for DispatchSchedule {
    fn default() -> Self {
        Self::new(DEFAULT_DISPATCH_PERIOD)
    }
}
