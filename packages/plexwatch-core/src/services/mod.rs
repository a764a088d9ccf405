//! Application services layer.
//!
//! This module contains the business logic services that sit between the
//! API layer and the media server adapter (plex/).

pub mod eviction;
pub mod notification_listener;
pub mod reconciler;
pub mod session_registry;
pub mod source_health;

pub use eviction::EvictionTask;
pub use notification_listener::{EnqueueError, NotificationListener, NotificationSender};
pub use reconciler::{NotificationReconciler, ReconcileError, ReconcileOutcome};
pub use session_registry::SessionRegistry;
pub use source_health::{SourceHealthMonitor, SourceHealthState};
