//! Event creation with back-pressure from a downstream consumer
//!
//! At most one created event waits for the consumer. While it is refused, no
//! new event is created. Pausing blocks until that event has been accepted,
//! so nothing is dropped across a pause.

use lace_core::event::GossipEvent;
use lace_core::types::EventWindow;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::creator::{EventCreator, TipsetEventCreator};
use crate::error::{CreationError, CreationResult};
use crate::manager::EventCreationManager;
use crate::status::EventCreationStatus;

/// Why a sink did not take an event
#[derive(Debug)]
pub enum SinkError {
    /// No room right now; the event is given back
    Full(GossipEvent),
    /// The consumer is gone and will never take it
    Closed(GossipEvent),
}

/// Where created events go
pub trait EventSink: Send + Sync {
    /// Hand over an event without blocking
    fn submit(&self, event: GossipEvent) -> Result<(), SinkError>;
}

impl EventSink for mpsc::Sender<GossipEvent> {
    fn submit(&self, event: GossipEvent) -> Result<(), SinkError> {
        self.try_send(event).map_err(|e| match e {
            mpsc::error::TrySendError::Full(event) => SinkError::Full(event),
            mpsc::error::TrySendError::Closed(event) => SinkError::Closed(event),
        })
    }
}

impl EventSink for std::sync::mpsc::SyncSender<GossipEvent> {
    fn submit(&self, event: GossipEvent) -> Result<(), SinkError> {
        self.try_send(event).map_err(|e| match e {
            std::sync::mpsc::TrySendError::Full(event) => SinkError::Full(event),
            std::sync::mpsc::TrySendError::Disconnected(event) => SinkError::Closed(event),
        })
    }
}

/// Event creation manager that delivers to an [`EventSink`]
pub struct SyncEventCreationManager<S: EventSink, C: EventCreator = TipsetEventCreator> {
    manager: EventCreationManager<C>,
    sink: S,
    buffered: Mutex<Option<GossipEvent>>,
    paused: AtomicBool,
    retry_interval: Duration,
}

impl<S: EventSink, C: EventCreator> SyncEventCreationManager<S, C> {
    pub fn new(manager: EventCreationManager<C>, sink: S, retry_interval: Duration) -> Self {
        Self {
            manager,
            sink,
            buffered: Mutex::new(None),
            paused: AtomicBool::new(false),
            retry_interval,
        }
    }

    pub fn manager(&self) -> &EventCreationManager<C> {
        &self.manager
    }

    /// Try to deliver the buffered event, then create and deliver a new one
    ///
    /// Returns true if an event reached the sink during this call. A closed
    /// sink is an error; the undelivered event stays buffered.
    pub fn maybe_create_event(&self) -> CreationResult<bool> {
        let mut buffered = self.buffered.lock();
        if self.paused.load(Ordering::Acquire) {
            self.manager.set_status(EventCreationStatus::Paused);
            return Ok(false);
        }

        let mut delivered = false;
        if let Some(event) = buffered.take() {
            if !self.try_submit(&mut buffered, event)? {
                return Ok(false);
            }
            delivered = true;
        }

        match self.manager.maybe_create_event()? {
            Some(event) => Ok(self.try_submit(&mut buffered, event)? || delivered),
            None => Ok(delivered),
        }
    }

    fn try_submit(
        &self,
        buffered: &mut Option<GossipEvent>,
        event: GossipEvent,
    ) -> CreationResult<bool> {
        match self.sink.submit(event) {
            Ok(()) => Ok(true),
            Err(SinkError::Full(event)) => {
                debug!("Consumer refused {}, holding it", event.descriptor());
                *buffered = Some(event);
                self.manager.record_buffered_rejection();
                self.manager.set_status(EventCreationStatus::PipelineInsertion);
                Ok(false)
            }
            Err(SinkError::Closed(event)) => {
                error!("Consumer closed, {} cannot be delivered", event.descriptor());
                *buffered = Some(event);
                self.manager.set_status(EventCreationStatus::PipelineInsertion);
                Err(CreationError::ConsumerClosed)
            }
        }
    }

    /// Stop creating events, blocking until the buffered event is delivered
    ///
    /// Fails if the consumer closes while an event is still buffered; creation
    /// stays paused in that case.
    pub fn pause_event_creation(&self) -> CreationResult<()> {
        self.paused.store(true, Ordering::Release);
        loop {
            let mut buffered = self.buffered.lock();
            let Some(event) = buffered.take() else {
                break;
            };
            if self.try_submit(&mut buffered, event)? {
                break;
            }
            drop(buffered);
            std::thread::sleep(self.retry_interval);
        }
        self.manager.set_status(EventCreationStatus::Paused);
        debug!("Event creation paused");
        Ok(())
    }

    pub fn resume_event_creation(&self) {
        self.paused.store(false, Ordering::Release);
        self.manager.set_status(EventCreationStatus::Idle);
        debug!("Event creation resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// True if a created event is waiting for the consumer
    pub fn has_buffered_event(&self) -> bool {
        self.buffered.lock().is_some()
    }

    pub fn register_event(&self, event: &GossipEvent) {
        self.manager.register_event(event);
    }

    pub fn set_event_window(&self, window: EventWindow) {
        self.manager.set_event_window(window);
    }

    /// Forget all creator state and drop any undelivered event
    pub fn clear(&self) {
        if let Some(event) = self.buffered.lock().take() {
            warn!("Dropping undelivered event {} on clear", event.descriptor());
        }
        self.manager.clear();
    }

    /// Drive creation every `interval` until `shutdown_rx` fires
    pub async fn run(&self, interval: Duration, mut shutdown_rx: mpsc::Receiver<()>) {
        info!("Starting event creation (interval: {}ms)", interval.as_millis());
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Event creation shutting down");
                    break;
                }
                _ = tokio::time::sleep(interval) => {
                    if let Err(e) = self.maybe_create_event() {
                        warn!("Event creation failed: {}", e);
                        if !e.is_recoverable() {
                            break;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EventCreationConfig;
    use crate::signer::{Ed25519Signer, TransactionQueue};
    use crate::status::PlatformStatus;
    use lace_core::clock::ManualClock;
    use lace_core::roster::Roster;
    use lace_core::types::NodeId;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use std::sync::Arc;

    fn manager() -> EventCreationManager {
        let config = EventCreationConfig {
            max_creation_rate: 0.0,
            ..Default::default()
        };
        let roster = Arc::new(Roster::uniform(4, 1).unwrap());
        let clock = Arc::new(ManualClock::at_epoch());
        let transactions = Arc::new(TransactionQueue::new(16));
        let creator = TipsetEventCreator::new(
            NodeId::new(0),
            roster,
            &config,
            clock.clone(),
            Arc::new(Ed25519Signer::from_bytes(&[2u8; 32])),
            transactions.clone(),
            Box::new(ChaCha8Rng::seed_from_u64(0)),
        )
        .unwrap();
        let manager = EventCreationManager::new(creator, &config, clock, transactions);
        manager.update_platform_status(PlatformStatus::Active);
        manager
    }

    #[test]
    fn test_refused_event_is_buffered() {
        let (tx, rx) = std::sync::mpsc::sync_channel(0);
        let sync = SyncEventCreationManager::new(manager(), tx, Duration::from_millis(1));

        assert!(!sync.maybe_create_event().unwrap());
        assert!(sync.has_buffered_event());
        assert_eq!(sync.manager().status(), EventCreationStatus::PipelineInsertion);

        // still refused: nothing new is created behind it
        assert!(!sync.maybe_create_event().unwrap());
        assert_eq!(sync.manager().stats().created, 1);
        assert_eq!(sync.manager().stats().buffered_rejections, 2);
        drop(rx);
    }

    #[tokio::test]
    async fn test_accepted_event_is_not_buffered() {
        let (tx, mut rx) = mpsc::channel(1);
        let sync = SyncEventCreationManager::new(manager(), tx, Duration::from_millis(1));

        // genesis fills the channel
        assert!(sync.maybe_create_event().unwrap());
        let genesis = rx.recv().await.unwrap();
        assert_eq!(genesis.generation(), 1);
        assert!(!sync.has_buffered_event());
    }

    #[test]
    fn test_pause_flushes_buffer() {
        let (tx, rx) = std::sync::mpsc::sync_channel(1);
        let sync = Arc::new(SyncEventCreationManager::new(
            manager(),
            tx,
            Duration::from_millis(1),
        ));

        // occupy the only slot so genesis gets buffered
        let placeholder = {
            let other = manager();
            other.maybe_create_event().unwrap().unwrap()
        };
        sync.sink.submit(placeholder).unwrap();
        assert!(!sync.maybe_create_event().unwrap());
        assert!(sync.has_buffered_event());

        let pauser = {
            let sync = sync.clone();
            std::thread::spawn(move || sync.pause_event_creation().unwrap())
        };
        std::thread::sleep(Duration::from_millis(20));
        assert!(!pauser.is_finished());

        let first = rx.recv().unwrap();
        pauser.join().unwrap();
        let second = rx.recv().unwrap();
        assert_eq!(first.generation(), 1);
        assert_eq!(second.generation(), 1);
        assert!(!sync.has_buffered_event());
        assert!(sync.is_paused());

        assert!(!sync.maybe_create_event().unwrap());
        assert_eq!(sync.manager().status(), EventCreationStatus::Paused);

        sync.resume_event_creation();
        assert!(!sync.is_paused());
    }

    #[test]
    fn test_closed_consumer_is_reported() {
        let (tx, rx) = std::sync::mpsc::sync_channel(0);
        drop(rx);
        let sync = SyncEventCreationManager::new(manager(), tx, Duration::from_millis(1));

        let result = sync.maybe_create_event();
        assert!(matches!(result, Err(CreationError::ConsumerClosed)));
        assert!(sync.has_buffered_event());
        assert_eq!(sync.manager().stats().created, 1);

        // nothing new is created behind the stuck event
        assert!(sync.maybe_create_event().is_err());
        assert_eq!(sync.manager().stats().created, 1);

        assert!(matches!(
            sync.pause_event_creation(),
            Err(CreationError::ConsumerClosed)
        ));
        assert!(sync.is_paused());
        assert!(sync.has_buffered_event());

        sync.clear();
        assert!(sync.pause_event_creation().is_ok());
    }

    #[tokio::test]
    async fn test_run_stops_when_consumer_closes() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sync = SyncEventCreationManager::new(manager(), tx, Duration::from_millis(1));
        let (_shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::time::timeout(
            Duration::from_secs(5),
            sync.run(Duration::from_millis(1), shutdown_rx),
        )
        .await
        .unwrap();
        assert!(sync.has_buffered_event());
    }
}
