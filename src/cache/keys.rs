//! Cache key definitions.
//!
//! The campaign listing is cached under a single well-known key. The key is
//! derived once at startup from the configured namespace and handed to the
//! aggregation service explicitly; nothing recomputes it per request.

use std::fmt;

/// The well-known key for the serialized campaign listing blob.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListingKey(String);

impl ListingKey {
    /// Build the listing key for a cache namespace, e.g. `vetrina:campaigns`.
    pub fn new(namespace: &str) -> Self {
        Self(format!("{namespace}:campaigns"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ListingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
