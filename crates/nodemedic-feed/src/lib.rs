//! nodemedic-feed — the machine-health change feed seam.
//!
//! The feed itself is an external collaborator: anything that can push
//! add/update events for nodes implements [`NodeFeed`]. This crate owns
//! the contract and the supervision policy around it:
//!
//! ```text
//! NodeFeed (caller-supplied)
//!   └── FeedSupervisor
//!         ├── forwards FeedEvent into the controller's channel
//!         ├── transport error → restart after a fixed 5s delay
//!         └── aborted (deliberate stop) → no restart
//! ```

pub mod feed;
pub mod supervisor;

pub use feed::{FeedError, FeedEvent, FeedEventKind, FeedItem, NodeFeed, StartFuture};
pub use supervisor::{FeedSupervisor, RESTART_DELAY};
