use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use sha2::{Digest, Sha256};

use crate::catalog::CatalogView;
use crate::error::Result;
use crate::resolver::{ResolutionRequest, ResolutionResult, Resolver};

/// Thread-safe memo of resolution results.
///
/// Entries never go stale: the key covers the whole catalog content and
/// every request field, so a changed input is simply a different key.
pub struct ResolutionCache {
    entries: Mutex<HashMap<String, ResolutionResult>>,
    /// Directory for persisted `<key>.json` results
    dir: Option<PathBuf>,
    /// Read persisted results but never write new ones
    read_only: bool,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl Default for ResolutionCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResolutionCache {
    /// Create an in-memory cache
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            dir: None,
            read_only: false,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    /// Create a cache that also persists results under `dir`
    ///
    /// # Example
    /// ```no_run
    /// use featres_resolver::ResolutionCache;
    ///
    /// let cache = ResolutionCache::with_dir("/tmp/featres-cache");
    /// ```
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: Some(dir.into()),
            ..Self::new()
        }
    }

    /// Set the read-only mode
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Directory results are persisted to, if any
    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    /// Cache key for a request against a catalog
    pub fn key(catalog: &dyn CatalogView, request: &ResolutionRequest) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(catalog.fingerprint().as_bytes());
        hasher.update(b"\n");
        hasher.update(serde_json::to_vec(request)?);
        Ok(hex::encode(hasher.finalize()))
    }

    /// Resolve through the cache
    pub fn resolve(&self, catalog: &dyn CatalogView, request: &ResolutionRequest) -> Result<ResolutionResult> {
        let key = Self::key(catalog, request)?;

        if let Some(result) = self.get(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Resolution cache hit {}", key);
            return Ok(result);
        }

        if let Some(result) = self.read_persisted(&key) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            log::debug!("Resolution cache hit {} (persisted)", key);
            self.lock().insert(key, result.clone());
            return Ok(result);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        let result = Resolver::new(catalog).resolve(request)?;
        self.write_persisted(&key, &result)?;
        self.lock().insert(key, result.clone());
        Ok(result)
    }

    /// Look up a result by key
    pub fn get(&self, key: &str) -> Option<ResolutionResult> {
        self.lock().get(key).cloned()
    }

    /// Number of results held in memory
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.misses.load(Ordering::Relaxed)
    }

    /// Drop the in-memory results; persisted files are kept
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ResolutionResult>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn path(&self, key: &str) -> Option<PathBuf> {
        self.dir.as_ref().map(|dir| dir.join(format!("{}.json", key)))
    }

    fn read_persisted(&self, key: &str) -> Option<ResolutionResult> {
        let path = self.path(key)?;
        let content = fs::read(&path).ok()?;
        match serde_json::from_slice(&content) {
            Ok(result) => Some(result),
            Err(e) => {
                log::warn!("Ignoring unreadable cached result {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Write atomically: temp file first, then rename
    fn write_persisted(&self, key: &str, result: &ResolutionResult) -> Result<()> {
        let Some(path) = self.path(key) else {
            return Ok(());
        };
        if self.read_only {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let temp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&serde_json::to_vec_pretty(result)?)?;
            file.sync_all()?;
        }
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}
