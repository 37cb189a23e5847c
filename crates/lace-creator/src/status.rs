//! Platform and event-creation status values

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of the platform hosting the creator
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlatformStatus {
    #[default]
    StartingUp,
    Active,
    ReplayingEvents,
    Observing,
    Checking,
    ReconnectComplete,
    Behind,
    Freezing,
    FreezeComplete,
    CatastrophicFailure,
}

impl PlatformStatus {
    /// Statuses in which the node takes part in gossip as a creator
    pub fn allows_event_creation(&self) -> bool {
        matches!(self, Self::Active | Self::Checking)
    }
}

impl fmt::Display for PlatformStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::StartingUp => "STARTING_UP",
            Self::Active => "ACTIVE",
            Self::ReplayingEvents => "REPLAYING_EVENTS",
            Self::Observing => "OBSERVING",
            Self::Checking => "CHECKING",
            Self::ReconnectComplete => "RECONNECT_COMPLETE",
            Self::Behind => "BEHIND",
            Self::Freezing => "FREEZING",
            Self::FreezeComplete => "FREEZE_COMPLETE",
            Self::CatastrophicFailure => "CATASTROPHIC_FAILURE",
        };
        f.write_str(name)
    }
}

/// Why the last creation attempt did (or did not) produce an event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCreationStatus {
    /// Nothing attempted yet
    #[default]
    Idle,
    /// Maximum creation rate reached
    RateLimited,
    /// Platform status does not allow creation
    PlatformStatus,
    /// Platform has been unhealthy for too long
    Overloaded,
    /// State after a reconnect has not been saved yet
    ReconnectPending,
    /// No other parent would advance the DAG
    NoEligibleParents,
    /// The creator is building an event
    AttemptingCreation,
    /// A created event is waiting for the downstream consumer
    PipelineInsertion,
    /// Creation has been paused by the caller
    Paused,
}

/// Counters kept by the creation managers
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CreationStats {
    /// Calls to `maybe_create_event`
    pub attempts: u64,
    /// Events handed out
    pub created: u64,
    /// Attempts where the creator found nothing to build on
    pub declined: u64,
    /// Attempts stopped by a rule
    pub denied_by_rules: u64,
    /// Attempts skipped because the creator lock was busy
    pub lock_contended: u64,
    /// Times the downstream consumer refused the buffered event
    pub buffered_rejections: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creation_allowed_statuses() {
        assert!(PlatformStatus::Active.allows_event_creation());
        assert!(PlatformStatus::Checking.allows_event_creation());
        assert!(!PlatformStatus::Freezing.allows_event_creation());
        assert!(!PlatformStatus::Behind.allows_event_creation());
        assert!(!PlatformStatus::default().allows_event_creation());
    }

    #[test]
    fn test_status_display() {
        assert_eq!(PlatformStatus::ReconnectComplete.to_string(), "RECONNECT_COMPLETE");
    }
}
