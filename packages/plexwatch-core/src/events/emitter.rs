//! Event emitter abstraction for decoupling services from transport.
//!
//! Services depend on the [`EventEmitter`] trait rather than on a concrete
//! delivery mechanism, enabling testing and alternative implementations.

use super::{HealthEvent, RegistryEvent};

/// Trait for emitting domain events without knowledge of transport.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     emitter: Arc<dyn EventEmitter>,
/// }
///
/// impl MyService {
///     fn do_something(&self) {
///         self.emitter.emit_registry(RegistryEvent::SessionsEvicted { ... });
///     }
/// }
/// ```
pub trait EventEmitter: Send + Sync {
    /// Emits a registry change event.
    fn emit_registry(&self, event: RegistryEvent);

    /// Emits a media server health event.
    fn emit_health(&self, event: HealthEvent);
}

/// No-op emitter for headless server or testing.
///
/// Events are silently discarded; readers poll the registry instead.
pub struct NoopEventEmitter;

impl EventEmitter for NoopEventEmitter {
    fn emit_registry(&self, _event: RegistryEvent) {
        // No-op: readers use snapshots
    }

    fn emit_health(&self, _event: HealthEvent) {
        // No-op
    }
}

/// Logging emitter for debugging and development.
///
/// Logs all events at debug level. Useful for debugging event flow
/// or in development environments.
pub struct LoggingEventEmitter;

impl EventEmitter for LoggingEventEmitter {
    fn emit_registry(&self, event: RegistryEvent) {
        tracing::debug!(?event, "registry_event");
    }

    fn emit_health(&self, event: HealthEvent) {
        tracing::debug!(?event, "health_event");
    }
}
