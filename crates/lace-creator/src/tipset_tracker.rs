//! Tipset tracker
//!
//! Arena of tipsets keyed by event descriptor. Entries are evicted by key
//! once the event window makes their event ancient, so nothing ever holds a
//! reference into pruned state.

use hashbrown::HashMap;
use lace_core::roster::Roster;
use lace_core::types::{AncientMode, EventDescriptor, EventWindow};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};

use crate::tipset::Tipset;

/// Computes and caches the tipset of every non-ancient event
pub struct TipsetTracker {
    roster: Arc<Roster>,
    ancient_mode: AncientMode,
    event_window: EventWindow,

    /// Tipset of every tracked event
    tipsets: HashMap<EventDescriptor, Tipset>,

    /// Tracked events grouped by ancient indicator, for pruning
    by_indicator: BTreeMap<u64, Vec<EventDescriptor>>,
}

impl TipsetTracker {
    pub fn new(roster: Arc<Roster>, ancient_mode: AncientMode) -> Self {
        Self {
            roster,
            ancient_mode,
            event_window: EventWindow::genesis(ancient_mode),
            tipsets: HashMap::new(),
            by_indicator: BTreeMap::new(),
        }
    }

    /// Compute, cache and return the tipset of a new event
    ///
    /// Parents that are unknown (never seen or already pruned) are skipped.
    /// Adding the same event again returns the cached tipset untouched.
    pub fn add_event(&mut self, descriptor: EventDescriptor, parents: &[EventDescriptor]) -> &Tipset {
        if !self.tipsets.contains_key(&descriptor) {
            let tipset = self.compute_tipset(&descriptor, parents);
            self.by_indicator
                .entry(descriptor.ancient_indicator(self.ancient_mode))
                .or_default()
                .push(descriptor);
            self.tipsets.insert(descriptor, tipset);
        }
        &self.tipsets[&descriptor]
    }

    fn compute_tipset(&self, descriptor: &EventDescriptor, parents: &[EventDescriptor]) -> Tipset {
        let parent_tipsets = parents.iter().filter_map(|parent| {
            let tipset = self.tipsets.get(parent);
            if tipset.is_none() {
                trace!("Parent {} of {} is not tracked, skipping", parent, descriptor);
            }
            tipset
        });

        let mut tipset =
            Tipset::merge(parent_tipsets).unwrap_or_else(|| Tipset::new(self.roster.clone()));
        tipset.advance(descriptor.creator, descriptor.generation);
        tipset
    }

    /// Cached tipset of an event, `None` if unknown or ancient
    pub fn get_tipset(&self, descriptor: &EventDescriptor) -> Option<&Tipset> {
        self.tipsets.get(descriptor)
    }

    /// Move the window forward, evicting every event that became ancient
    pub fn set_event_window(&mut self, window: EventWindow) {
        debug_assert_eq!(window.ancient_mode(), self.ancient_mode, "ancient mode changed");
        self.event_window = window;

        let threshold = window.ancient_threshold();
        let mut evicted = 0usize;
        while let Some(entry) = self.by_indicator.first_entry() {
            if *entry.key() >= threshold {
                break;
            }
            for descriptor in entry.remove() {
                if self.tipsets.remove(&descriptor).is_some() {
                    evicted += 1;
                }
            }
        }

        if evicted > 0 {
            debug!(
                "Evicted {} ancient tipsets below {} ({} remaining)",
                evicted,
                threshold,
                self.tipsets.len()
            );
        }
    }

    pub fn event_window(&self) -> &EventWindow {
        &self.event_window
    }

    /// Number of tracked tipsets
    pub fn len(&self) -> usize {
        self.tipsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tipsets.is_empty()
    }

    /// Forget everything and return to the genesis window
    pub fn clear(&mut self) {
        self.tipsets.clear();
        self.by_indicator.clear();
        self.event_window = EventWindow::genesis(self.ancient_mode);
    }
}
