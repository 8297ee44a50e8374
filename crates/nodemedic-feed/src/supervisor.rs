//! Feed supervision — keeps the subscription alive.
//!
//! The supervisor forwards feed events into the controller's channel
//! and restarts the subscription after a fixed delay whenever it fails
//! with anything other than a deliberate abort.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::feed::{FeedError, FeedEvent, FeedItem, NodeFeed};

/// Fixed delay before restarting a failed subscription.
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Supervises a [`NodeFeed`] subscription.
///
/// `start()` performs the first subscription inline, so the caller
/// knows the feed is active once it returns; the forwarding loop then
/// runs in the background until an abort or until the event consumer
/// goes away.
pub struct FeedSupervisor {
    feed: Arc<dyn NodeFeed>,
    events: mpsc::UnboundedSender<FeedEvent>,
    task: Option<JoinHandle<()>>,
}

impl FeedSupervisor {
    /// Create a supervisor forwarding into `events`.
    pub fn new(feed: Arc<dyn NodeFeed>, events: mpsc::UnboundedSender<FeedEvent>) -> Self {
        Self {
            feed,
            events,
            task: None,
        }
    }

    /// Establish the subscription and spawn the forwarding loop.
    ///
    /// Returns once the first `NodeFeed::start()` has confirmed the
    /// subscription active, or propagates its error.
    pub async fn start(&mut self) -> Result<(), FeedError> {
        let rx = self.feed.start().await?;
        info!("feed subscription active");

        let feed = self.feed.clone();
        let events = self.events.clone();
        self.task = Some(tokio::spawn(async move {
            forward_loop(feed, rx, events).await;
        }));

        Ok(())
    }

    /// Tear the subscription down.
    ///
    /// Signals the feed to abort, then drops the forwarding loop.
    pub fn stop(&mut self) {
        self.feed.stop();
        if let Some(task) = self.task.take() {
            task.abort();
        }
        info!("feed subscription stopped");
    }
}

/// Forward items until abort; restart the subscription on transport
/// failures.
async fn forward_loop(
    feed: Arc<dyn NodeFeed>,
    mut rx: mpsc::Receiver<FeedItem>,
    events: mpsc::UnboundedSender<FeedEvent>,
) {
    loop {
        match rx.recv().await {
            Some(FeedItem::Event(event)) => {
                if events.send(event).is_err() {
                    debug!("feed consumer gone, stopping forward loop");
                    return;
                }
            }
            Some(FeedItem::Error(FeedError::Aborted)) => {
                info!("feed aborted, not restarting");
                return;
            }
            Some(FeedItem::Error(err)) => {
                warn!(error = %err, "feed failed, restarting");
                match restart(feed.as_ref()).await {
                    Some(new_rx) => rx = new_rx,
                    None => return,
                }
            }
            None => {
                // Sender dropped without an explicit signal: treat as a
                // transport failure.
                warn!("feed channel closed, restarting");
                match restart(feed.as_ref()).await {
                    Some(new_rx) => rx = new_rx,
                    None => return,
                }
            }
        }
    }
}

/// Re-establish the subscription, retrying on transport errors.
///
/// Returns `None` when the feed reports an abort, which ends
/// supervision.
async fn restart(feed: &dyn NodeFeed) -> Option<mpsc::Receiver<FeedItem>> {
    loop {
        tokio::time::sleep(RESTART_DELAY).await;
        match feed.start().await {
            Ok(rx) => {
                info!("feed subscription restarted");
                return Some(rx);
            }
            Err(FeedError::Aborted) => {
                info!("feed aborted during restart");
                return None;
            }
            Err(err) => {
                warn!(error = %err, "feed restart failed, retrying");
            }
        }
    }
}
