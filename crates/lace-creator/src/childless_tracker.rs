//! Childless event tracker
//!
//! Keeps the DAG frontier: per creator, the events nobody is known to have
//! built on yet. A creator that branches (several events at the same
//! generation) keeps every branch tip; a newer generation replaces them all.

use hashbrown::HashMap;
use lace_core::types::{EventDescriptor, EventWindow, NodeId};
use tracing::debug;

/// Frontier of the DAG, grouped by creator
#[derive(Debug, Default)]
pub struct ChildlessEventTracker {
    /// Childless events per creator, all at the same generation
    childless: HashMap<NodeId, Vec<EventDescriptor>>,
}

impl ChildlessEventTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a new event: its parents stop being childless and the event
    /// joins the frontier if it is not older than its creator's tips
    pub fn add_event(&mut self, descriptor: EventDescriptor, parents: &[EventDescriptor]) {
        for parent in parents {
            self.remove(parent);
        }

        let tips = self.childless.entry(descriptor.creator).or_default();
        match tips.first().map(|tip| tip.generation) {
            Some(generation) if generation > descriptor.generation => {
                debug!(
                    "Not tracking {} as childless, {} already has generation {}",
                    descriptor, descriptor.creator, generation
                );
            }
            Some(generation) if generation == descriptor.generation => {
                if !tips.contains(&descriptor) {
                    debug!("Branch detected for {} at generation {}", descriptor.creator, generation);
                    tips.push(descriptor);
                }
            }
            _ => {
                tips.clear();
                tips.push(descriptor);
            }
        }
    }

    fn remove(&mut self, descriptor: &EventDescriptor) {
        if let Some(tips) = self.childless.get_mut(&descriptor.creator) {
            tips.retain(|tip| tip != descriptor);
            if tips.is_empty() {
                self.childless.remove(&descriptor.creator);
            }
        }
    }

    /// The whole frontier, ordered by creator then hash
    pub fn get_childless_events(&self) -> Vec<EventDescriptor> {
        let mut events: Vec<EventDescriptor> = self.childless.values().flatten().copied().collect();
        events.sort_by_key(|event| (event.creator, event.hash));
        events
    }

    /// Childless events of a single creator
    pub fn childless_events_by(&self, creator: NodeId) -> &[EventDescriptor] {
        self.childless
            .get(&creator)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Drop every tip that is ancient under the window
    pub fn prune_old_events(&mut self, window: &EventWindow) {
        self.childless.retain(|_, tips| {
            tips.retain(|tip| !window.is_ancient(tip));
            !tips.is_empty()
        });
    }

    /// Number of frontier events
    pub fn len(&self) -> usize {
        self.childless.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.childless.is_empty()
    }

    pub fn clear(&mut self) {
        self.childless.clear();
    }
}
