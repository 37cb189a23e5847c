//! Gate that holds creation back until post-reconnect state is saved

use parking_lot::Mutex;
use tracing::debug;

use super::EventCreationRule;
use crate::status::EventCreationStatus;

#[derive(Default)]
struct Rounds {
    last_reconnect: Option<u64>,
    last_state_saved: Option<u64>,
}

/// Denies creation while the latest reconnect round is newer than the
/// latest saved state
#[derive(Default)]
pub struct ReconnectStateSavedRule {
    rounds: Mutex<Rounds>,
}

impl ReconnectStateSavedRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// A reconnect finished with state from `round`
    pub fn reconnect_completed(&self, round: u64) {
        debug!("Reconnect completed at round {}", round);
        self.rounds.lock().last_reconnect = Some(round);
    }

    /// State from `round` has been written to disk
    pub fn state_saved(&self, round: u64) {
        let mut rounds = self.rounds.lock();
        rounds.last_state_saved = rounds.last_state_saved.max(Some(round));
    }
}

impl EventCreationRule for ReconnectStateSavedRule {
    fn is_event_creation_permitted(&self) -> bool {
        let rounds = self.rounds.lock();
        match (rounds.last_reconnect, rounds.last_state_saved) {
            (None, _) => true,
            (Some(_), None) => false,
            (Some(reconnect), Some(saved)) => saved >= reconnect,
        }
    }

    fn status(&self) -> EventCreationStatus {
        EventCreationStatus::ReconnectPending
    }
}
