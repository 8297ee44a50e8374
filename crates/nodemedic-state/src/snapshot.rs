//! Derived health view of a node.
//!
//! A `HealthSnapshot` is computed on demand from the `Ready` condition;
//! it is never stored. Debouncing works off `last_transition` rather
//! than observation time, so a node that was already down when the
//! watch (re)started is not delayed twice.

use std::time::{Duration, SystemTime};

use crate::types::{Node, CONDITION_TRUE};

/// Point-in-time health of a node.
#[derive(Debug, Clone, Copy)]
pub struct HealthSnapshot {
    /// Whether the `Ready` condition reports the affirmative status.
    pub healthy: bool,
    /// When the readiness status last changed.
    pub last_transition: SystemTime,
}

impl HealthSnapshot {
    /// Compute the snapshot for a node.
    ///
    /// A node without a `Ready` condition is treated as unhealthy with
    /// `last_transition` set to the observation time, so it debounces
    /// the full unhealthy window before any repair is considered.
    pub fn of(node: &Node) -> Self {
        match node.ready_condition() {
            Some(cond) => Self {
                healthy: cond.status == CONDITION_TRUE,
                last_transition: cond.last_transition,
            },
            None => Self {
                healthy: false,
                last_transition: SystemTime::now(),
            },
        }
    }

    /// How long the node has been in its current readiness state.
    ///
    /// A `last_transition` in the future (clock skew) counts as zero.
    pub fn down_time(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_transition).unwrap_or_default()
    }
}
