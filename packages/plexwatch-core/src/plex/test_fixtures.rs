//! Shared test fixtures for Plex JSON payloads.
//!
//! These constants are used by multiple test modules to avoid duplication.

/// `/status/sessions` with two sessions, the second without player details.
pub const SESSIONS_RESPONSE: &str = r#"{
  "MediaContainer": {
    "size": 2,
    "Metadata": [
      {
        "sessionKey": "12",
        "ratingKey": "4821",
        "title": "Movie",
        "type": "movie",
        "viewOffset": 61000,
        "User": { "id": "7", "thumb": "https://plex.tv/users/x/avatar", "title": "alice" },
        "Player": {
          "address": "10.0.0.21",
          "machineIdentifier": "abc",
          "platform": "Android",
          "product": "Plex for Android (TV)",
          "state": "playing",
          "title": "Living Room TV"
        },
        "Session": { "id": "xyz", "bandwidth": 4000, "location": "lan" }
      },
      {
        "sessionKey": 13,
        "ratingKey": "90",
        "title": "Song",
        "type": "track",
        "User": { "id": 8, "title": "bob" }
      }
    ]
  }
}"#;

/// `/status/sessions` when nothing is playing (Plex omits `Metadata`).
pub const EMPTY_SESSIONS_RESPONSE: &str = r#"{ "MediaContainer": { "size": 0 } }"#;

/// `/library/metadata/{id}` for an episode.
pub const METADATA_RESPONSE: &str = r#"{
  "MediaContainer": {
    "size": 1,
    "librarySectionID": 2,
    "Metadata": [
      {
        "ratingKey": "4821",
        "key": "/library/metadata/4821",
        "type": "episode",
        "title": "Pilot",
        "grandparentTitle": "Some Show",
        "duration": 2700000,
        "viewOffset": 61000
      }
    ]
  }
}"#;

/// `/library/metadata/{id}` for an item the server no longer has.
pub const EMPTY_METADATA_RESPONSE: &str = r#"{ "MediaContainer": { "size": 0, "Metadata": [] } }"#;

/// `/` server root.
pub const IDENTITY_RESPONSE: &str = r#"{
  "MediaContainer": {
    "size": 0,
    "friendlyName": "basement",
    "machineIdentifier": "0f2a9c1b7d",
    "version": "1.40.0.7998"
  }
}"#;

/// Push notification with one complete and one stopped entry.
pub const PLAYING_NOTIFICATION: &str = r#"{
  "NotificationContainer": {
    "type": "playing",
    "size": 2,
    "PlaySessionStateNotification": [
      {
        "sessionKey": "12",
        "clientIdentifier": "abc",
        "guid": "",
        "ratingKey": "4821",
        "url": "",
        "key": "/library/metadata/4821",
        "viewOffset": 61000,
        "playQueueItemID": 3,
        "state": "playing"
      },
      {
        "sessionKey": 13,
        "clientIdentifier": "def",
        "viewOffset": 125000,
        "state": "stopped"
      }
    ]
  }
}"#;

/// Push notification of an unrelated category.
pub const TIMELINE_NOTIFICATION: &str = r#"{
  "NotificationContainer": {
    "type": "timeline",
    "size": 1,
    "TimelineEntry": [ { "identifier": "com.plexapp.plugins.library", "state": 5 } ]
  }
}"#;
