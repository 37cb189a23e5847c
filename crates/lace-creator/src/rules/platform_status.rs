//! Gate on the platform lifecycle state

use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

use super::EventCreationRule;
use crate::signer::TransactionSupplier;
use crate::status::{EventCreationStatus, PlatformStatus};

/// Permits creation while the platform is ACTIVE or CHECKING
///
/// While FREEZING, creation stays allowed as long as state signatures are
/// still waiting to go out, so the network can finish signing the freeze
/// state.
pub struct PlatformStatusRule {
    status: RwLock<PlatformStatus>,
    transactions: Arc<dyn TransactionSupplier>,
}

impl PlatformStatusRule {
    pub fn new(transactions: Arc<dyn TransactionSupplier>) -> Self {
        Self {
            status: RwLock::new(PlatformStatus::default()),
            transactions,
        }
    }

    pub fn set_platform_status(&self, status: PlatformStatus) {
        let previous = std::mem::replace(&mut *self.status.write(), status);
        if previous != status {
            debug!("Platform status {} -> {}", previous, status);
        }
    }

    pub fn platform_status(&self) -> PlatformStatus {
        *self.status.read()
    }
}

impl EventCreationRule for PlatformStatusRule {
    fn is_event_creation_permitted(&self) -> bool {
        match self.platform_status() {
            PlatformStatus::Freezing => self.transactions.has_buffered_signature_transactions(),
            status => status.allows_event_creation(),
        }
    }

    fn status(&self) -> EventCreationStatus {
        EventCreationStatus::PlatformStatus
    }
}
