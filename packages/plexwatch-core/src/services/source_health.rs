//! Media server health tracking.
//!
//! Repeated transport failures are a signal for whoever manages the
//! connection; they are never escalated to a crash. This monitor turns a run
//! of consecutive failures into a Degraded status and back.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;

use crate::events::{EventEmitter, HealthEvent, SourceHealth};
use crate::utils::now_millis;

/// Current source health with reason.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SourceHealthState {
    pub health: SourceHealth,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(rename = "consecutiveFailures")]
    pub consecutive_failures: u32,
}

/// Tracks consecutive transport failures against the media server.
pub struct SourceHealthMonitor {
    emitter: Arc<dyn EventEmitter>,
    /// Failures in a row before the status flips to Degraded.
    threshold: u32,
    consecutive_failures: AtomicU32,
    state: RwLock<(SourceHealth, Option<String>)>,
}

impl SourceHealthMonitor {
    pub fn new(emitter: Arc<dyn EventEmitter>, threshold: u32) -> Self {
        Self {
            emitter,
            threshold: threshold.max(1),
            consecutive_failures: AtomicU32::new(0),
            state: RwLock::new((SourceHealth::Ok, None)),
        }
    }

    /// Returns the current health state.
    pub fn get(&self) -> SourceHealthState {
        let (health, reason) = self.state.read().clone();
        SourceHealthState {
            health,
            reason,
            consecutive_failures: self.consecutive_failures.load(Ordering::SeqCst),
        }
    }

    /// Records a query that reached the server.
    pub fn record_success(&self) {
        self.consecutive_failures.store(0, Ordering::SeqCst);
        self.set_health(SourceHealth::Ok, None);
    }

    /// Records a transport-level failure.
    pub fn record_failure(&self, reason: &str) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
        if failures >= self.threshold {
            self.set_health(
                SourceHealth::Degraded,
                Some(format!("{} consecutive failures, last: {}", failures, reason)),
            );
        }
    }

    /// Updates health and emits an event if it changed.
    fn set_health(&self, health: SourceHealth, reason: Option<String>) {
        let mut state = self.state.write();
        let old_health = state.0;

        // Keep the reason current while degraded, but only announce transitions
        state.1 = reason.clone();
        if old_health == health {
            return;
        }
        state.0 = health;
        drop(state);

        log::info!(
            "[SourceHealth] Media server health changed: {:?} -> {:?}{}",
            old_health,
            health,
            reason
                .as_ref()
                .map(|r| format!(" ({})", r))
                .unwrap_or_default()
        );

        self.emitter.emit_health(HealthEvent::HealthChanged {
            health,
            reason,
            timestamp: now_millis(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::RegistryEvent;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingEmitter {
        health: Mutex<Vec<SourceHealth>>,
    }

    impl EventEmitter for RecordingEmitter {
        fn emit_registry(&self, _event: RegistryEvent) {}

        fn emit_health(&self, event: HealthEvent) {
            let HealthEvent::HealthChanged { health, .. } = event;
            self.health.lock().push(health);
        }
    }

    #[test]
    fn starts_ok() {
        let monitor = SourceHealthMonitor::new(Arc::new(RecordingEmitter::default()), 3);
        let state = monitor.get();
        assert_eq!(state.health, SourceHealth::Ok);
        assert_eq!(state.consecutive_failures, 0);
        assert!(state.reason.is_none());
    }

    #[test]
    fn degrades_after_threshold_and_recovers() {
        let emitter = Arc::new(RecordingEmitter::default());
        let monitor = SourceHealthMonitor::new(emitter.clone(), 3);

        monitor.record_failure("timeout");
        monitor.record_failure("timeout");
        assert_eq!(monitor.get().health, SourceHealth::Ok);

        monitor.record_failure("connection refused");
        let state = monitor.get();
        assert_eq!(state.health, SourceHealth::Degraded);
        assert!(state.reason.unwrap().contains("connection refused"));

        monitor.record_success();
        assert_eq!(monitor.get().health, SourceHealth::Ok);
        assert_eq!(monitor.get().consecutive_failures, 0);

        assert_eq!(
            *emitter.health.lock(),
            vec![SourceHealth::Degraded, SourceHealth::Ok]
        );
    }

    #[test]
    fn success_resets_the_failure_run() {
        let monitor = SourceHealthMonitor::new(Arc::new(RecordingEmitter::default()), 2);
        monitor.record_failure("a");
        monitor.record_success();
        monitor.record_failure("b");
        assert_eq!(monitor.get().health, SourceHealth::Ok);
    }

    #[test]
    fn repeated_failures_emit_only_once() {
        let emitter = Arc::new(RecordingEmitter::default());
        let monitor = SourceHealthMonitor::new(emitter.clone(), 1);
        for _ in 0..5 {
            monitor.record_failure("down");
        }
        assert_eq!(emitter.health.lock().len(), 1);
        assert_eq!(monitor.get().consecutive_failures, 5);
    }
}
