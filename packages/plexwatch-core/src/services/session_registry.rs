//! Playback session registry.
//!
//! Pure data structure for tracking sessions without I/O operations. Every
//! write replaces a whole record under the write lock, so readers see either
//! the previous or the new record and never a mix of the two.

use std::collections::HashMap;
use std::time::Duration;

use parking_lot::RwLock;

use crate::types::{SessionRecord, SessionState, SessionUpdate};
use crate::utils::now_millis;

/// In-memory map from session key to session record.
///
/// Readers receive clones; nothing outside the registry holds a reference
/// into the map.
pub struct SessionRegistry {
    /// Friendly name of the media server (informational).
    server_name: String,
    /// Machine identifier of the media server (informational).
    machine_id: String,
    sessions: RwLock<HashMap<String, SessionRecord>>,
}

impl SessionRegistry {
    /// Creates an empty registry for the given server.
    pub fn new(server_name: impl Into<String>, machine_id: impl Into<String>) -> Self {
        Self {
            server_name: server_name.into(),
            machine_id: machine_id.into(),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn server_name(&self) -> &str {
        &self.server_name
    }

    pub fn machine_id(&self) -> &str {
        &self.machine_id
    }

    /// Upserts a session stamped with the current time.
    ///
    /// Returns a copy of the record as stored.
    pub fn update(&self, update: SessionUpdate) -> SessionRecord {
        self.update_at(update, now_millis())
    }

    /// Upserts a session stamped with `now` (Unix millis).
    ///
    /// A stopped session never keeps user, player or media details, whatever
    /// the caller passed.
    pub fn update_at(&self, update: SessionUpdate, now: u64) -> SessionRecord {
        let enrichable = update.state.permits_enrichment();

        let record = SessionRecord {
            session_key: update.session_key,
            state: update.state,
            user: update.user.filter(|_| enrichable),
            player: update.player.filter(|_| enrichable),
            media: update.media.filter(|_| enrichable),
            view_offset_millis: update.view_offset_millis,
            last_updated: now,
        };

        self.sessions
            .write()
            .insert(record.session_key.clone(), record.clone());

        record
    }

    /// Returns a point-in-time copy of all records, ordered by session key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<SessionRecord> {
        let mut records: Vec<SessionRecord> = self.sessions.read().values().cloned().collect();
        records.sort_by(|a, b| a.session_key.cmp(&b.session_key));
        records
    }

    /// Returns a copy of one record.
    #[must_use]
    pub fn get(&self, session_key: &str) -> Option<SessionRecord> {
        self.sessions.read().get(session_key).cloned()
    }

    /// Removes stopped records last updated before `now - retention`.
    ///
    /// Records in any other state are kept regardless of age. Returns the
    /// removed keys; calling it again with the same arguments removes nothing.
    pub fn evict(&self, now: u64, retention: Duration) -> Vec<String> {
        // Retentions past u64 milliseconds saturate instead of wrapping
        let retention_millis = u64::try_from(retention.as_millis()).unwrap_or(u64::MAX);
        let cutoff = now.saturating_sub(retention_millis);
        let mut evicted = Vec::new();

        self.sessions.write().retain(|key, record| {
            let expired = record.state == SessionState::Stopped && record.last_updated < cutoff;
            if expired {
                evicted.push(key.clone());
            }
            !expired
        });

        evicted.sort();
        evicted
    }

    /// Returns the number of tracked sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no sessions are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MediaInfo, PlayerInfo, UserInfo};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn alice() -> UserInfo {
        UserInfo {
            id: "7".to_string(),
            name: "alice".to_string(),
        }
    }

    fn movie() -> MediaInfo {
        MediaInfo {
            media_id: "m1".to_string(),
            title: "Movie".to_string(),
            duration_millis: Some(7_200_000),
            kind: Some("movie".to_string()),
            grandparent_title: None,
        }
    }

    fn full_update(key: &str, state: SessionState, offset: u64) -> SessionUpdate {
        SessionUpdate {
            session_key: key.to_string(),
            state,
            user: Some(alice()),
            player: Some(PlayerInfo {
                title: Some("TV".to_string()),
                ..Default::default()
            }),
            media: Some(movie()),
            view_offset_millis: offset,
        }
    }

    #[test]
    fn new_registry_is_empty() {
        let registry = SessionRegistry::new("basement", "abc");
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.server_name(), "basement");
        assert_eq!(registry.machine_id(), "abc");
    }

    #[test]
    fn update_inserts_then_mutates_in_place() {
        let registry = SessionRegistry::new("", "");

        registry.update_at(full_update("s1", SessionState::Playing, 1000), 10);
        registry.update_at(full_update("s1", SessionState::Paused, 2000), 20);

        assert_eq!(registry.len(), 1);
        let record = registry.get("s1").unwrap();
        assert_eq!(record.state, SessionState::Paused);
        assert_eq!(record.view_offset_millis, 2000);
        assert_eq!(record.last_updated, 20);
    }

    #[test]
    fn applying_same_update_twice_is_idempotent() {
        let registry = SessionRegistry::new("", "");

        let once = registry.update_at(full_update("s1", SessionState::Playing, 1000), 10);
        let twice = registry.update_at(full_update("s1", SessionState::Playing, 1000), 10);

        assert_eq!(once, twice);
        assert_eq!(registry.snapshot(), vec![once]);
    }

    #[test]
    fn stopped_clears_enrichment_but_keeps_offset() {
        let registry = SessionRegistry::new("", "");
        registry.update_at(full_update("s1", SessionState::Playing, 1000), 10);

        // Even if a caller passes details, a stopped record drops them
        let record = registry.update_at(full_update("s1", SessionState::Stopped, 5000), 20);

        assert_eq!(record.session_key, "s1");
        assert_eq!(record.state, SessionState::Stopped);
        assert!(record.user.is_none());
        assert!(record.player.is_none());
        assert!(record.media.is_none());
        assert_eq!(record.view_offset_millis, 5000);
        assert_eq!(record.last_updated, 20);
    }

    #[test]
    fn updates_are_isolated_per_key() {
        let registry = SessionRegistry::new("", "");
        registry.update_at(full_update("a", SessionState::Playing, 1), 10);
        let b_before = registry.update_at(full_update("b", SessionState::Paused, 2), 10);

        registry.update_at(SessionUpdate::bare("a", SessionState::Stopped, 99), 30);

        assert_eq!(registry.get("b").unwrap(), b_before);
        assert_eq!(registry.get("a").unwrap().state, SessionState::Stopped);
    }

    #[test]
    fn snapshot_is_sorted_copy() {
        let registry = SessionRegistry::new("", "");
        registry.update_at(full_update("s2", SessionState::Playing, 1), 10);
        registry.update_at(full_update("s1", SessionState::Playing, 1), 10);

        let snapshot = registry.snapshot();
        let keys: Vec<_> = snapshot.iter().map(|r| r.session_key.as_str()).collect();
        assert_eq!(keys, vec!["s1", "s2"]);

        // Later writes do not affect an already-taken snapshot
        registry.update_at(SessionUpdate::bare("s1", SessionState::Stopped, 0), 20);
        assert_eq!(snapshot[0].state, SessionState::Playing);
    }

    #[test]
    fn evict_removes_only_expired_stopped_records() {
        let registry = SessionRegistry::new("", "");
        let retention = Duration::from_secs(60);

        registry.update_at(SessionUpdate::bare("old-stopped", SessionState::Stopped, 0), 1_000);
        registry.update_at(SessionUpdate::bare("new-stopped", SessionState::Stopped, 0), 90_000);
        registry.update_at(full_update("old-playing", SessionState::Playing, 0), 1_000);

        let now = 100_000;
        let evicted = registry.evict(now, retention);

        assert_eq!(evicted, vec!["old-stopped".to_string()]);
        assert!(registry.get("old-stopped").is_none());
        assert!(registry.get("new-stopped").is_some());
        assert!(registry.get("old-playing").is_some());
    }

    #[test]
    fn evict_is_idempotent() {
        let registry = SessionRegistry::new("", "");
        registry.update_at(SessionUpdate::bare("s1", SessionState::Stopped, 0), 0);

        let retention = Duration::from_secs(1);
        assert_eq!(registry.evict(10_000, retention).len(), 1);
        assert!(registry.evict(10_000, retention).is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn evict_keeps_record_at_exact_cutoff() {
        let registry = SessionRegistry::new("", "");
        registry.update_at(SessionUpdate::bare("s1", SessionState::Stopped, 0), 40_000);

        assert!(registry.evict(100_000, Duration::from_secs(60)).is_empty());
        assert_eq!(registry.evict(100_001, Duration::from_secs(60)).len(), 1);
    }

    #[test]
    fn huge_retention_keeps_everything() {
        let registry = SessionRegistry::new("", "");
        registry.update_at(SessionUpdate::bare("s1", SessionState::Stopped, 0), 1_000);

        // 18_446_744_073_709_552 s is 2^64 + 384 ms, which wraps to 384 ms if truncated
        for retention in [
            Duration::from_secs(18_446_744_073_709_552),
            Duration::from_secs(u64::MAX),
            Duration::MAX,
        ] {
            assert!(registry.evict(10_000, retention).is_empty());
        }
        assert!(registry.get("s1").is_some());
    }

    #[test]
    fn restarted_session_is_not_evicted() {
        let registry = SessionRegistry::new("", "");
        registry.update_at(SessionUpdate::bare("s1", SessionState::Stopped, 0), 0);
        registry.update_at(full_update("s1", SessionState::Playing, 10), 1);

        assert!(registry.evict(1_000_000, Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn concurrent_readers_never_see_torn_records() {
        let registry = Arc::new(SessionRegistry::new("", ""));
        let done = Arc::new(AtomicBool::new(false));

        // Alternates between two internally consistent records
        let consistent = |i: u64| {
            let mut update = full_update("s1", SessionState::Playing, i);
            let tag = i.to_string();
            update.user = Some(UserInfo {
                id: tag.clone(),
                name: tag.clone(),
            });
            update.media = Some(MediaInfo {
                media_id: tag.clone(),
                title: tag,
                duration_millis: Some(i),
                kind: None,
                grandparent_title: None,
            });
            update
        };

        registry.update_at(consistent(0), 0);

        let writer = {
            let registry = Arc::clone(&registry);
            let done = Arc::clone(&done);
            std::thread::spawn(move || {
                for i in 1..5_000u64 {
                    registry.update_at(consistent(i), i);
                }
                done.store(true, Ordering::SeqCst);
            })
        };

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let done = Arc::clone(&done);
                std::thread::spawn(move || {
                    while !done.load(Ordering::SeqCst) {
                        for record in registry.snapshot() {
                            let user = record.user.unwrap();
                            let media = record.media.unwrap();
                            let offset = record.view_offset_millis.to_string();
                            assert_eq!(user.id, offset);
                            assert_eq!(media.media_id, offset);
                            assert_eq!(record.last_updated, record.view_offset_millis);
                        }
                    }
                })
            })
            .collect();

        writer.join().unwrap();
        for reader in readers {
            reader.join().unwrap();
        }
    }
}
