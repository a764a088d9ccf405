//! Plex media server access.
//!
//! # Module Structure
//!
//! - `types` - JSON wire types for API responses and push notifications
//! - `traits` - [`SessionSource`] abstraction for testability
//! - `client` - `PlexClientImpl` concrete trait implementation
//! - `http` - Low-level HTTP transport and [`SourceError`]

pub mod client;
pub mod http;
pub mod traits;
pub mod types;

#[cfg(test)]
pub(crate) mod test_fixtures;

// Re-export trait abstractions
pub use traits::SessionSource;

// Re-export concrete implementation
pub use client::{PlexClientImpl, ServerIdentity};
pub use http::{SourceError, SourceResult};
