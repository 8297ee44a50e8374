//! Error types for the repair controller.

use thiserror::Error;

use nodemedic_feed::FeedError;

use crate::config::ConfigError;

/// Result type alias for controller operations.
pub type RepairResult<T> = Result<T, RepairError>;

/// Errors surfaced by the controller's control surface.
///
/// Nothing here reaches the caller during normal operation; repair
/// outcomes flow exclusively through the [`AutoRepair`] callbacks.
///
/// [`AutoRepair`]: crate::hooks::AutoRepair
#[derive(Debug, Error)]
pub enum RepairError {
    #[error("controller already started")]
    AlreadyStarted,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("feed subscription failed: {0}")]
    Feed(#[from] FeedError),
}
