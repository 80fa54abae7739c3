use std::collections::BTreeMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};

use crate::store::ArtifactStore;

/// Keeps objects in a map, for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every stored object, ordered by key.
    pub fn objects(&self) -> BTreeMap<String, Vec<u8>> {
        match self.objects.lock() {
            Ok(objects) => objects.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait::async_trait]
impl ArtifactStore for MemoryStore {
    async fn put_object(&self, key: &str, payload: Vec<u8>) -> Result<String> {
        let mut objects = self
            .objects
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))?;
        objects.insert(key.to_owned(), payload);
        Ok(format!("memory://{key}"))
    }
}
