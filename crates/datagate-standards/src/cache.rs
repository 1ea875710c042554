//! Process-lifetime standard cache keyed by resolved path.
//!
//! Reads are cheap (`Arc` clone); a miss parses under the lock, so two
//! threads racing on the same path at worst parse once each. Parsing is
//! idempotent and the second result replaces an identical first.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::error::StandardsError;
use crate::standard::{LoadedStandard, Standard};

#[derive(Debug, Default)]
pub struct StandardCache {
    inner: Mutex<HashMap<PathBuf, Arc<LoadedStandard>>>,
}

impl StandardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or fetch the cached parse of) the standard at `path`.
    pub fn load(&self, path: &Path) -> Result<Arc<LoadedStandard>, StandardsError> {
        let key = resolve_key(path);
        if let Ok(map) = self.inner.lock() {
            if let Some(found) = map.get(&key) {
                return Ok(Arc::clone(found));
            }
        }

        let loaded = Arc::new(Standard::from_path(path)?);
        if let Ok(mut map) = self.inner.lock() {
            map.insert(key, Arc::clone(&loaded));
        }
        Ok(loaded)
    }

    /// Drop every cached entry (test support and standard republishing).
    pub fn clear(&self) {
        if let Ok(mut map) = self.inner.lock() {
            map.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn resolve_key(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}
