//! Vetrina cache layer.
//!
//! The campaign listing is cached as one serialized blob under a single
//! well-known key (cache-aside): reads check the store first and populate it
//! on a miss; every successful campaign write deletes the key wholesale so
//! the next read recomputes from the source of truth. The entry is never
//! patched in place.

mod keys;
mod store;

pub use keys::ListingKey;
pub use store::{CacheError, CacheStore};
