//! In-process cache store backend.
//!
//! Implements the [`CacheStore`] contract over a string map behind an
//! `RwLock`. The contract is backend-agnostic; deployments that share the
//! listing cache across processes swap in an external key/value store.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tracing::warn;

use crate::cache::{CacheError, CacheStore};

const SOURCE: &str = "infra::memory::MemoryCacheStore";

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self, op: &'static str) -> RwLockReadGuard<'_, HashMap<String, String>> {
        match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    target_module = SOURCE,
                    result = "poisoned_recovered",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }

    fn write(&self, op: &'static str) -> RwLockWriteGuard<'_, HashMap<String, String>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    target_module = SOURCE,
                    result = "poisoned_recovered",
                    "Recovered from poisoned cache lock"
                );
                poisoned.into_inner()
            }
        }
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        Ok(self.read("get").get(key).cloned())
    }

    async fn set(&self, key: &str, payload: String) -> Result<(), CacheError> {
        self.write("set").insert(key.to_string(), payload);
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.write("del").remove(key);
        Ok(())
    }
}
