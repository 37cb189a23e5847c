//! Error types for Lace core operations

use crate::types::NodeId;
use thiserror::Error;

/// Result type alias for Lace core operations
pub type Result<T> = std::result::Result<T, LaceError>;

/// Errors that can occur in Lace core operations
#[derive(Error, Debug, Clone)]
pub enum LaceError {
    // === Roster ===
    /// A roster needs at least one participant
    #[error("Roster has no entries")]
    EmptyRoster,

    /// The same node appears twice in a roster
    #[error("Duplicate roster entry: {0}")]
    DuplicateRosterEntry(NodeId),

    /// No participant carries weight
    #[error("Roster total weight is zero")]
    ZeroTotalWeight,

    /// Node is not part of the roster
    #[error("Node not in roster: {0}")]
    UnknownNode(NodeId),

    // === Configuration ===
    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Configuration could not be read
    #[error("Configuration error: {0}")]
    ConfigError(String),

    // === General ===
    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LaceError {
    /// Stable numeric code for reporting
    pub fn code(&self) -> u32 {
        match self {
            Self::EmptyRoster | Self::DuplicateRosterEntry(_) | Self::ZeroTotalWeight => 1001,
            Self::UnknownNode(_) => 1002,
            Self::InvalidConfig(_) | Self::ConfigError(_) => 1003,
            Self::SerializationError(_) => 1004,
            _ => 9999,
        }
    }

    /// Check if error is recoverable
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::UnknownNode(_) | Self::ConfigError(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LaceError::EmptyRoster.code(), 1001);
        assert_eq!(LaceError::UnknownNode(NodeId::new(3)).code(), 1002);
        assert_eq!(LaceError::Internal("x".into()).code(), 9999);
    }

    #[test]
    fn test_error_display() {
        let err = LaceError::DuplicateRosterEntry(NodeId::new(7));
        assert!(format!("{}", err).contains("node7"));
    }

    #[test]
    fn test_recoverable_errors() {
        assert!(LaceError::UnknownNode(NodeId::new(1)).is_recoverable());
        assert!(!LaceError::ZeroTotalWeight.is_recoverable());
    }
}
