//! Health change feed contract.
//!
//! A `NodeFeed` is a reconnectable push subscription yielding node
//! add/update events. The trait returns boxed futures so callers can
//! hand in any implementation as a trait object.

use thiserror::Error;
use tokio::sync::mpsc;

use nodemedic_state::Node;

/// Future returned by [`NodeFeed::start`].
pub type StartFuture<'a> = std::pin::Pin<
    Box<dyn std::future::Future<Output = Result<mpsc::Receiver<FeedItem>, FeedError>> + Send + 'a>,
>;

/// Kind of change a feed event reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedEventKind {
    /// Node first seen by the subscription.
    Added,
    /// Node object changed.
    Updated,
}

/// One node change delivered by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEvent {
    pub kind: FeedEventKind,
    pub node: Node,
}

/// Errors a feed subscription can surface.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The subscription was deliberately shut down. Never restarted.
    #[error("feed subscription aborted")]
    Aborted,

    /// Anything else: the supervisor restarts the subscription after a
    /// fixed delay.
    #[error("feed transport error: {0}")]
    Transport(String),
}

impl FeedError {
    pub fn is_aborted(&self) -> bool {
        matches!(self, FeedError::Aborted)
    }
}

/// Item delivered on a live subscription channel.
#[derive(Debug)]
pub enum FeedItem {
    Event(FeedEvent),
    Error(FeedError),
}

/// A push feed of machine-health events.
///
/// `start()` establishes a subscription; resolving `Ok` confirms it is
/// active. After `stop()`, the live channel yields
/// `FeedItem::Error(FeedError::Aborted)` and any in-progress or later
/// `start()` resolves to `Err(FeedError::Aborted)`.
pub trait NodeFeed: Send + Sync {
    fn start(&self) -> StartFuture<'_>;
    fn stop(&self);
}
