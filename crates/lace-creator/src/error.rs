//! Error types for event creation

use lace_core::error::LaceError;
use lace_core::types::EventDescriptor;
use thiserror::Error;

/// Result type alias for event creation
pub type CreationResult<T> = std::result::Result<T, CreationError>;

/// Faults raised while creating events
///
/// Declining to create an event is not an error; these are the cases the
/// caller has to hear about.
#[derive(Error, Debug, Clone)]
pub enum CreationError {
    /// The signer could not sign a new event
    #[error("Failed to sign event: {0}")]
    Signing(String),

    /// The consumer of created events has gone away
    #[error("Event consumer is closed")]
    ConsumerClosed,

    /// An event that must already be tracked is missing
    #[error("Event is not tracked: {0}")]
    UntrackedEvent(EventDescriptor),

    /// Error from the core data model
    #[error(transparent)]
    Core(#[from] LaceError),
}

impl CreationError {
    /// Check if retrying the same call can succeed
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Signing(_) | Self::ConsumerClosed | Self::UntrackedEvent(_) => false,
            Self::Core(err) => err.is_recoverable(),
        }
    }
}
