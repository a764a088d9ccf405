//! Push notification intake.
//!
//! Responsibilities:
//! - Accepting notification batches from the ingress handler (non-blocking)
//! - Feeding them to the reconciler in arrival order, one batch at a time
//! - Stopping on cancellation without abandoning a batch mid-way
//! - Reporting batches still queued at shutdown, which are discarded

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::reconciler::NotificationReconciler;
use crate::types::PlaybackNotification;

/// Why a batch could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum EnqueueError {
    #[error("notification queue is full")]
    Full,
    #[error("notification listener has stopped")]
    Closed,
}

/// Cloneable handle used by the ingress side to queue batches.
#[derive(Clone)]
pub struct NotificationSender {
    tx: mpsc::Sender<Vec<PlaybackNotification>>,
}

impl NotificationSender {
    /// Queues a batch without waiting.
    ///
    /// Empty batches are accepted and discarded.
    pub fn try_send(&self, batch: Vec<PlaybackNotification>) -> Result<(), EnqueueError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.tx.try_send(batch).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => EnqueueError::Full,
            mpsc::error::TrySendError::Closed(_) => EnqueueError::Closed,
        })
    }

    /// Returns true once the listener loop has exited.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Drives the reconciler from the notification channel.
pub struct NotificationListener {
    reconciler: Arc<NotificationReconciler>,
    rx: Arc<Mutex<Option<mpsc::Receiver<Vec<PlaybackNotification>>>>>,
    cancel: CancellationToken,
    /// Cancelled by the loop itself once it has exited.
    stopped: CancellationToken,
    /// Batches left in the queue when the loop exited.
    discarded: Arc<AtomicUsize>,
    spawner: TokioSpawner,
}

impl NotificationListener {
    /// Creates a listener and the sender that feeds it.
    ///
    /// # Arguments
    /// * `reconciler` - Reconciler that processes each batch
    /// * `capacity` - Number of batches that may wait in the queue
    /// * `cancel` - Token that stops the loop
    /// * `spawner` - Task spawner for the loop
    pub fn new(
        reconciler: Arc<NotificationReconciler>,
        capacity: usize,
        cancel: CancellationToken,
        spawner: TokioSpawner,
    ) -> (Self, NotificationSender) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let listener = Self {
            reconciler,
            rx: Arc::new(Mutex::new(Some(rx))),
            cancel,
            stopped: CancellationToken::new(),
            discarded: Arc::new(AtomicUsize::new(0)),
            spawner,
        };
        (listener, NotificationSender { tx })
    }

    /// Spawns the listener loop. Calling it a second time does nothing.
    pub fn start(&self) {
        let Some(mut rx) = self.rx.lock().take() else {
            log::warn!("[NotificationListener] Already started");
            return;
        };

        let reconciler = Arc::clone(&self.reconciler);
        let cancel = self.cancel.clone();
        let stopped = self.stopped.clone();
        let discarded = Arc::clone(&self.discarded);

        self.spawner.spawn(async move {
            log::info!("[NotificationListener] Listening for playback notifications");

            loop {
                // Cancellation is only observed between batches
                let batch = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    batch = rx.recv() => batch,
                };

                let Some(batch) = batch else {
                    log::info!("[NotificationListener] All senders dropped");
                    break;
                };

                reconciler.reconcile_batch(&batch).await;
            }

            // Refuse new batches, then account for the ones already queued
            rx.close();
            let mut batches = 0;
            let mut notifications = 0;
            while let Ok(batch) = rx.try_recv() {
                batches += 1;
                notifications += batch.len();
            }
            if batches > 0 {
                log::warn!(
                    "[NotificationListener] Discarded {} queued batch(es) ({} notifications) on shutdown",
                    batches,
                    notifications
                );
            }
            discarded.store(batches, Ordering::SeqCst);

            log::info!("[NotificationListener] Stopped");
            stopped.cancel();
        });
    }

    /// Waits until the loop has exited.
    pub async fn stopped(&self) {
        self.stopped.cancelled().await;
    }

    /// Returns true once the loop has exited.
    pub fn is_stopped(&self) -> bool {
        self.stopped.is_cancelled()
    }

    /// Number of queued batches dropped when the loop exited.
    pub fn discarded_batches(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::events::NoopEventEmitter;
    use crate::plex::http::SourceResult;
    use crate::plex::SessionSource;
    use crate::services::session_registry::SessionRegistry;
    use crate::services::source_health::SourceHealthMonitor;
    use crate::types::{CurrentSession, MediaInfo, SessionState};

    /// Source that answers slowly and never lists the session.
    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl SessionSource for SlowSource {
        async fn list_current_sessions(&self) -> SourceResult<Vec<CurrentSession>> {
            tokio::time::sleep(self.delay).await;
            Ok(Vec::new())
        }

        async fn fetch_metadata(&self, media_id: &str) -> SourceResult<MediaInfo> {
            Err(crate::plex::SourceError::NotFound(media_id.to_string()))
        }
    }

    fn listener(
        delay: Duration,
        capacity: usize,
    ) -> (NotificationListener, NotificationSender, Arc<SessionRegistry>, CancellationToken) {
        let registry = Arc::new(SessionRegistry::new("", ""));
        let emitter = Arc::new(NoopEventEmitter);
        let reconciler = Arc::new(NotificationReconciler::new(
            Arc::new(SlowSource { delay }),
            Arc::clone(&registry),
            emitter.clone(),
            Arc::new(SourceHealthMonitor::new(emitter, 3)),
            Duration::from_secs(30),
        ));
        let cancel = CancellationToken::new();
        let (listener, sender) =
            NotificationListener::new(reconciler, capacity, cancel.clone(), TokioSpawner::current());
        (listener, sender, registry, cancel)
    }

    fn event(key: &str, state: &str) -> PlaybackNotification {
        PlaybackNotification {
            session_key: Some(key.to_string()),
            state_label: Some(state.to_string()),
            media_id: Some("m1".to_string()),
            view_offset_millis: Some(0),
        }
    }

    #[tokio::test]
    async fn batches_reach_the_registry() {
        let (listener, sender, registry, cancel) = listener(Duration::ZERO, 8);
        listener.start();

        sender
            .try_send(vec![event("a", "stopped"), event("b", "stopped")])
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while registry.len() < 2 {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        cancel.cancel();
        listener.stopped().await;
        assert_eq!(sender.try_send(vec![event("c", "stopped")]), Err(EnqueueError::Closed));
    }

    #[tokio::test]
    async fn full_queue_is_reported() {
        // Not started, so nothing drains the queue
        let (_listener, sender, _, _) = listener(Duration::ZERO, 1);

        sender.try_send(vec![event("a", "stopped")]).unwrap();
        assert_eq!(sender.try_send(vec![event("b", "stopped")]), Err(EnqueueError::Full));
        // Empty batches never occupy a slot
        assert_eq!(sender.try_send(Vec::new()), Ok(()));
    }

    #[tokio::test(start_paused = true)]
    async fn in_flight_batch_completes_after_cancel() {
        let (listener, sender, registry, cancel) = listener(Duration::from_secs(2), 8);
        listener.start();

        sender.try_send(vec![event("s1", "playing")]).unwrap();
        // Let the loop pick the batch up and block on the slow lookup
        tokio::time::sleep(Duration::from_millis(10)).await;
        cancel.cancel();

        listener.stopped().await;
        assert!(listener.is_stopped());
        assert_eq!(listener.discarded_batches(), 0);

        // The lookup finished and the vanished session was recorded
        assert_eq!(registry.get("s1").unwrap().state, SessionState::Stopped);
    }

    #[tokio::test(start_paused = true)]
    async fn queued_batches_are_counted_when_discarded() {
        let (listener, sender, registry, cancel) = listener(Duration::from_secs(2), 8);
        listener.start();

        sender.try_send(vec![event("s1", "playing")]).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        // Queued behind the in-flight batch
        sender.try_send(vec![event("s2", "stopped")]).unwrap();
        sender
            .try_send(vec![event("s3", "stopped"), event("s4", "stopped")])
            .unwrap();
        cancel.cancel();

        listener.stopped().await;

        assert_eq!(listener.discarded_batches(), 2);
        assert!(registry.get("s1").is_some());
        assert!(registry.get("s2").is_none());
        assert!(registry.get("s3").is_none());
        assert_eq!(sender.try_send(vec![event("s5", "stopped")]), Err(EnqueueError::Closed));
    }

    #[tokio::test]
    async fn start_twice_is_harmless() {
        let (listener, _sender, _, cancel) = listener(Duration::ZERO, 1);
        listener.start();
        listener.start();
        cancel.cancel();
        listener.stopped().await;
    }
}
