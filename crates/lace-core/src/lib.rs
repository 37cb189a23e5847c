//! # Lace Core
//!
//! Data model shared by the Lace event-creation engine.
//!
//! This crate provides the building blocks:
//! - `NodeId`, `EventHash`, `EventDescriptor` - identities of participants and events
//! - `Roster` - participants and their stake weights
//! - `EventWindow` - which part of the DAG is still relevant
//! - `UnsignedEvent` / `GossipEvent` - the events themselves
//! - `Clock` - injectable wall clock
//!
//! ```text
//!     self-parent          other-parent
//!   (A, g=4) ──┐         ┌── (C, g=6)
//!              ▼         ▼
//!              (A, g=7, txs...)
//! ```

pub mod clock;
pub mod error;
pub mod event;
pub mod roster;
pub mod types;

pub use clock::*;
pub use error::*;
pub use event::*;
pub use roster::*;
pub use types::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::clock::{Clock, ManualClock, SystemClock};
    pub use crate::error::{LaceError, Result};
    pub use crate::event::{GossipEvent, Signature, Transaction, UnsignedEvent};
    pub use crate::roster::{Roster, RosterEntry};
    pub use crate::types::*;
}
