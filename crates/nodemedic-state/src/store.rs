//! Broken-node store — tracking state for in-flight repair sequences.
//!
//! One `BrokenNode` record exists per currently-unhealthy node; absence
//! of a record means the node was last observed healthy. The store is
//! owned by the repair controller's single control task, so it needs no
//! lock of its own.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::types::{Node, NodeName};

/// Cancellable handle to a scheduled action.
///
/// Wraps the spawned sleep task driving a debounce or repair-timeout
/// timer. Dropping the handle aborts the task, so removing a record
/// always cancels its pending timer.
#[derive(Debug)]
pub struct TimerHandle {
    task: JoinHandle<()>,
}

impl TimerHandle {
    pub fn new(task: JoinHandle<()>) -> Self {
        Self { task }
    }

    /// Cancel the scheduled action.
    pub fn cancel(self) {
        self.task.abort();
    }
}

impl Drop for TimerHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Repair-tracking record for one unhealthy node.
#[derive(Debug)]
pub struct BrokenNode {
    /// Most recently observed node object, refreshed at each
    /// verification; handed to the repair callbacks.
    pub node: Node,
    /// Executed repair attempts. Shared with queued repair tasks, which
    /// increment it exactly once per executed action.
    pub attempts: Arc<AtomicU32>,
    /// The one pending timer for this node, if any.
    pub timer: Option<TimerHandle>,
}

impl BrokenNode {
    /// Fresh record with zero attempts and no timer.
    pub fn new(node: Node) -> Self {
        Self {
            node,
            attempts: Arc::new(AtomicU32::new(0)),
            timer: None,
        }
    }

    /// Current attempt count.
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Cancel the pending timer, if one is armed.
    pub fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.cancel();
        }
    }
}

/// Map of node name → broken-node record.
#[derive(Debug, Default)]
pub struct BrokenNodeStore {
    records: HashMap<NodeName, BrokenNode>,
}

impl BrokenNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&BrokenNode> {
        self.records.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut BrokenNode> {
        self.records.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Insert or replace the record for a node.
    pub fn insert(&mut self, name: &str, record: BrokenNode) {
        self.records.insert(name.to_string(), record);
    }

    /// Remove a node's record, returning it if present.
    pub fn remove(&mut self, name: &str) -> Option<BrokenNode> {
        self.records.remove(name)
    }

    /// Remove and yield every record (used on shutdown).
    pub fn drain(&mut self) -> impl Iterator<Item = (NodeName, BrokenNode)> + '_ {
        self.records.drain()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
