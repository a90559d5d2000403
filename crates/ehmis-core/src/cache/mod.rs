//! Local cache of DHIS2 responses.
//!
//! Entries are JSON, sealed with ChaCha20-Poly1305 once the cache is
//! unlocked with the user's password. Each kind of entry has its own
//! freshness window:
//! - org units and data elements: 60 minutes
//! - indicator searches: 10 minutes
//! - analytics: 5 minutes

pub mod crypto;
pub mod manager;

pub use crypto::CacheCipher;
pub use manager::{CacheAges, CacheKind, CacheManager, CachedData};
