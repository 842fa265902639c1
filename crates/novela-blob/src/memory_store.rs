use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

use tracing::debug;

use crate::{
    BlobKind, BlobPath, BlobStore, parse_data_url,
    error::{BlobError, BlobResult},
};

const MEMORY_BASE_URL: &str = "memory://blobs";

#[derive(Default)]
struct MemoryInner {
    blobs: HashMap<String, Vec<u8>>,
    counter: u64,
    destroyed: Vec<String>,
}

/// Keeps images in memory, useful for tests and ephemeral setups
#[derive(Clone, Default)]
pub struct MemoryBlobStore {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_inner<T>(&self, f: impl FnOnce(&mut MemoryInner) -> T) -> T {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }

    pub fn contains(&self, url: &str) -> bool {
        self.with_inner(|inner| inner.blobs.contains_key(url))
    }

    pub fn len(&self) -> usize {
        self.with_inner(|inner| inner.blobs.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// URLs destroyed so far, in order
    pub fn destroyed(&self) -> Vec<String> {
        self.with_inner(|inner| inner.destroyed.clone())
    }
}

impl BlobStore for MemoryBlobStore {
    async fn upload(&self, kind: BlobKind, payload: &str) -> BlobResult<String> {
        let image = parse_data_url(payload)?;
        let url = self.with_inner(|inner| -> BlobResult<String> {
            inner.counter += 1;
            let name = format!("{}.{}", inner.counter, image.extension());
            let url = BlobPath::new(kind, name)?.url(MEMORY_BASE_URL);
            inner.blobs.insert(url.clone(), image.data);
            Ok(url)
        })?;
        debug!("Stored blob {url}");
        Ok(url)
    }

    async fn destroy(&self, url: &str) -> BlobResult<()> {
        BlobPath::from_url(url, MEMORY_BASE_URL)?;
        self.with_inner(|inner| {
            if inner.blobs.remove(url).is_some() {
                inner.destroyed.push(url.to_string());
                Ok(())
            } else {
                Err(BlobError::NotFound(url.to_string()))
            }
        })
    }
}
