//! # Lace Event Creation
//!
//! Decides when this node creates its own hashgraph events and which
//! parents they reference.
//!
//! ## Pipeline
//!
//! 1. Gossip intake - every learned event is registered with the creator
//! 2. Tipset tracking - each event gets a vector of the newest ancestor
//!    generation per participant
//! 3. Frontier tracking - events without children are the candidate parents
//! 4. Rule gating - rate, platform status, health and reconnect state
//! 5. Parent selection - the candidate advancing the most weight past the
//!    last supermajority snapshot wins, with a random nudge toward
//!    participants that keep getting ignored
//! 6. Delivery - the signed event goes to the consumer, with back-pressure

pub mod childless_tracker;
pub mod config;
pub mod creator;
pub mod error;
pub mod manager;
pub mod rules;
pub mod signer;
pub mod status;
pub mod sync_manager;
pub mod tipset;
pub mod tipset_tracker;
pub mod weight_calculator;

// Re-exports
pub use childless_tracker::*;
pub use config::*;
pub use creator::*;
pub use error::*;
pub use manager::*;
pub use rules::*;
pub use signer::*;
pub use status::*;
pub use sync_manager::*;
pub use tipset::*;
pub use tipset_tracker::*;
pub use weight_calculator::*;
