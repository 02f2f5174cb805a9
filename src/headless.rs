//! Headless presentation: the dispatch loop on a tokio interval, every
//! message ends up as a log line.

use std::time::Duration;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::relay::{Dispatcher, TopicSink};

/// Runs dispatch passes every `period` until `shutdown` is cancelled.
///
/// Hands the dispatcher back so the caller can run one last pass after the
/// relay queue has been closed.
pub async fn run<S: TopicSink>(
    mut dispatcher: Dispatcher<S>,
    period: Duration,
    shutdown: CancellationToken,
) -> Dispatcher<S> {
    info!(
        "Headless dispatch loop started for {} topics, period {:?}",
        dispatcher.registry().len(),
        period
    );

    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => break,
            _ = ticker.tick() => {
                dispatcher.dispatch();
            }
        }
    }

    debug!("Headless dispatch loop stopped: {:?}", dispatcher.totals());
    dispatcher
}
