//! Collaborator seams supplied by the caller.
//!
//! Both traits return boxed futures so implementations can be handed in
//! as trait objects, matching the callback style used elsewhere in the
//! workspace.

use nodemedic_state::Node;

/// Future returned by [`AutoRepair::repair`].
pub type RepairFuture<'a> =
    std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send + 'a>>;

/// Future returned by [`NodeReader::get_node`].
pub type FetchFuture<'a> =
    std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<Option<Node>>> + Send + 'a>>;

/// The repair action and its outcome notifications.
///
/// `attempts` is 1-based everywhere and counts executed repair calls
/// for the current unhealthy episode of the node.
pub trait AutoRepair: Send + Sync {
    /// Perform one repair attempt.
    ///
    /// The result is logged but never gates retry pacing: the repair
    /// timeout alone decides when the next verification happens.
    fn repair(&self, node: Node, attempts: u32) -> RepairFuture<'_>;

    /// The node was confirmed healthy after `attempts` repair calls.
    /// Only invoked when `attempts > 0`.
    fn repair_success(&self, node: &Node, attempts: u32);

    /// Attempt number `attempts` did not restore health within the
    /// repair timeout.
    fn repair_attempt_failed(&self, node: &Node, attempts: u32);

    /// The attempt budget is exhausted; no further attempts follow
    /// until the node next recovers and breaks again. Invoked once.
    fn repair_attempts_failed(&self, node: &Node, attempts: u32);
}

/// Point-in-time fetch of a live node object.
///
/// Used for freshness verification immediately before acting, so the
/// controller never repairs off stale cached state.
pub trait NodeReader: Send + Sync {
    /// Fetch the node, `Ok(None)` if it no longer exists.
    fn get_node<'a>(&'a self, name: &'a str) -> FetchFuture<'a>;
}
