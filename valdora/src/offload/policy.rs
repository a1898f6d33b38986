//! Background task policies.

use std::time::Duration;

/// What to do with a background task that runs for too long.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimeoutPolicy {
    /// No bound, the task runs until completion.
    #[default]
    None,
    /// Drop the task after the given duration.
    Cancel(Duration),
    /// Log a warning once the task finishes past the duration.
    Warn(Duration),
}

impl TimeoutPolicy {
    /// Duration after which the policy kicks in, if any.
    pub fn threshold(&self) -> Option<Duration> {
        match self {
            TimeoutPolicy::None => None,
            TimeoutPolicy::Cancel(duration) | TimeoutPolicy::Warn(duration) => Some(*duration),
        }
    }
}
