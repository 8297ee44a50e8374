//! nodemedic-state — node object model and repair-tracking state.
//!
//! Holds the types shared by the feed and repair crates:
//!
//! ```text
//! Node / NodeCondition      what the health feed delivers
//! HealthSnapshot            derived health view (Ready condition)
//! BrokenNodeStore           name → BrokenNode, one record per unhealthy node
//!   └── BrokenNode          attempt counter + pending timer handle
//! ```
//!
//! The store is plain in-memory state with no interior locking: the
//! repair controller owns it from a single task, so absence of a key is
//! the only synchronization-free "node is healthy" signal needed.

pub mod snapshot;
pub mod store;
pub mod types;

pub use snapshot::HealthSnapshot;
pub use store::{BrokenNode, BrokenNodeStore, TimerHandle};
pub use types::{Node, NodeCondition, NodeName, CONDITION_TRUE, READY_CONDITION};
