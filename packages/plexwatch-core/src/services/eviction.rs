//! Periodic removal of stopped sessions.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::events::{EventEmitter, RegistryEvent};
use crate::runtime::{TaskSpawner, TokioSpawner};
use crate::services::session_registry::SessionRegistry;
use crate::utils::now_millis;

/// Runs [`SessionRegistry::evict`] on a fixed interval.
pub struct EvictionTask {
    registry: Arc<SessionRegistry>,
    emitter: Arc<dyn EventEmitter>,
    retention: Duration,
    interval: Duration,
    cancel: CancellationToken,
    spawner: TokioSpawner,
}

impl EvictionTask {
    pub fn new(
        registry: Arc<SessionRegistry>,
        emitter: Arc<dyn EventEmitter>,
        retention: Duration,
        interval: Duration,
        cancel: CancellationToken,
        spawner: TokioSpawner,
    ) -> Self {
        Self {
            registry,
            emitter,
            retention,
            interval,
            cancel,
            spawner,
        }
    }

    /// Runs one eviction pass at `now` (Unix millis).
    ///
    /// Returns the evicted keys.
    pub fn run_once(&self, now: u64) -> Vec<String> {
        evict_and_announce(&self.registry, &*self.emitter, now, self.retention)
    }

    /// Spawns the periodic eviction loop.
    pub fn start(&self) {
        let registry = Arc::clone(&self.registry);
        let emitter = Arc::clone(&self.emitter);
        let retention = self.retention;
        let cancel = self.cancel.clone();
        let period = self.interval.max(Duration::from_millis(1));

        self.spawner.spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        log::debug!("[Eviction] Stopped");
                        break;
                    }
                    _ = ticker.tick() => {
                        evict_and_announce(&registry, &*emitter, now_millis(), retention);
                    }
                }
            }
        });
    }
}

fn evict_and_announce(
    registry: &SessionRegistry,
    emitter: &dyn EventEmitter,
    now: u64,
    retention: Duration,
) -> Vec<String> {
    let evicted = registry.evict(now, retention);
    if !evicted.is_empty() {
        log::info!(
            "[Eviction] Removed {} stopped session(s): {}",
            evicted.len(),
            evicted.join(", ")
        );
        emitter.emit_registry(RegistryEvent::SessionsEvicted {
            session_keys: evicted.clone(),
            timestamp: now,
        });
    }
    evicted
}
