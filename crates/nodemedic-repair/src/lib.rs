//! nodemedic-repair — the automated node repair workflow.
//!
//! Watches a feed of machine-health events and drives a debounced,
//! retry-bounded repair sequence for each node that turns unhealthy,
//! with a shared cap on how many repair actions run at once.
//!
//! # Architecture
//!
//! ```text
//! RepairController
//!   ├── FeedSupervisor        reconnecting health event subscription
//!   ├── control task          single owner of the BrokenNodeStore
//!   │     ├── debounce        unhealthy for `unhealthy_time` before acting
//!   │     ├── verification    live re-fetch via NodeReader before each attempt
//!   │     └── retry loop      `repair_timeout` per attempt, `max_attempts` total
//!   └── RepairQueue           at most `concurrency` repair actions in flight
//! ```
//!
//! The actual repair is supplied by the caller as an [`AutoRepair`]
//! implementation; every caller-visible outcome flows through its four
//! callbacks, never through errors from this crate.

pub mod config;
pub mod controller;
pub mod error;
pub mod hooks;
pub mod queue;

pub use config::RepairConfig;
pub use controller::RepairController;
pub use error::{RepairError, RepairResult};
pub use hooks::{AutoRepair, FetchFuture, NodeReader, RepairFuture};
pub use queue::RepairQueue;
