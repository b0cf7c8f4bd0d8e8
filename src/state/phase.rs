/// Pagination driver states and terminal outcomes
use crate::HarvestError;
use std::fmt;

/// The state the pagination driver is currently in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Phase {
    /// No run has started yet
    #[default]
    Idle,

    /// Navigating to the target and collecting the first screen
    InitialLoad,

    /// Replaying checkpointed advances without collecting
    Resuming,

    /// Clicking "load more" and collecting after each advance
    Advancing,

    /// The run reached one of its terminal outcomes
    Finished,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::InitialLoad => "initial_load",
            Self::Resuming => "resuming",
            Self::Advancing => "advancing",
            Self::Finished => "finished",
        }
    }

    /// Returns true while a driver owns the page
    pub fn is_active(&self) -> bool {
        matches!(self, Self::InitialLoad | Self::Resuming | Self::Advancing)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a harvest run ended
///
/// Every variant is reached only after the collected records were flushed
/// (best effort) and the page was closed.
#[derive(Debug)]
pub enum Termination {
    /// No further "load more" control, or the advance budget was used up
    Exhausted,

    /// The stop signal was observed
    Cancelled,

    /// Setup failed or the consecutive-failure budget ran out
    Failed(HarvestError),
}

impl Termination {
    /// Maps an error that ended the run to its outcome
    ///
    /// A stop signal that surfaces as an error is a cancellation, not a failure.
    pub fn from_error(err: HarvestError) -> Self {
        if err.is_stop() {
            Self::Cancelled
        } else {
            Self::Failed(err)
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Exhausted => "exhausted",
            Self::Cancelled => "cancelled",
            Self::Failed(_) => "failed",
        }
    }

    /// The failure cause, if any
    pub fn error(&self) -> Option<&HarvestError> {
        match self {
            Self::Failed(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(e) => write!(f, "failed ({})", e),
            other => f.write_str(other.as_str()),
        }
    }
}
