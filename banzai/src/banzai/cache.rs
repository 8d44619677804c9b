use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::SystemTime;

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use walkdir::WalkDir;

use crate::banzai::config::{CacheBackend, CacheConfig};
use crate::banzai::error::BanzaiError;

/// An array-shaped cache key. Identity is the expanded `a/b/c` form.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey(Vec<String>);

impl CacheKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn expanded(&self) -> String {
        self.0.join("/")
    }
}

/// Key-value cache for rendered HTML.
pub trait CacheStore: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, BanzaiError>;

    fn multi_get(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, String>, BanzaiError> {
        let mut found = HashMap::new();
        for key in keys {
            if let Some(value) = self.get(key)? {
                found.insert(key.clone(), value);
            }
        }
        Ok(found)
    }

    fn set(&self, key: &CacheKey, value: &str) -> Result<(), BanzaiError>;
}

pub fn build_cache(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, BanzaiError> {
    let ttl = (config.ttl_seconds > 0).then(|| Duration::seconds(config.ttl_seconds as i64));
    Ok(match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCache::new(ttl)),
        CacheBackend::File => Arc::new(FileCache::new(&config.directory, ttl)?),
    })
}

#[derive(Clone, Debug)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

/// Process-local cache. Counts read round trips and writes.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Option<Duration>,
    reads: AtomicUsize,
    writes: AtomicUsize,
}

impl MemoryCache {
    pub fn new(ttl: Option<Duration>) -> Self {
        Self {
            ttl,
            ..Self::default()
        }
    }

    /// Number of `get`/`multi_get` round trips served.
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(entries: &HashMap<String, Entry>, key: &CacheKey) -> Option<String> {
        let now = Utc::now();
        entries
            .get(&key.expanded())
            .filter(|e| e.expires_at.is_none_or(|at| at > now))
            .map(|e| e.value.clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Entry>>, BanzaiError> {
        self.entries
            .lock()
            .map_err(|_| BanzaiError::Cache("memory cache lock poisoned".into()))
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, BanzaiError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let entries = self.lock()?;
        Ok(Self::lookup(&entries, key))
    }

    fn multi_get(&self, keys: &[CacheKey]) -> Result<HashMap<CacheKey, String>, BanzaiError> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        let entries = self.lock()?;
        Ok(keys
            .iter()
            .filter_map(|k| Self::lookup(&entries, k).map(|v| (k.clone(), v)))
            .collect())
    }

    fn set(&self, key: &CacheKey, value: &str) -> Result<(), BanzaiError> {
        self.writes.fetch_add(1, Ordering::Relaxed);
        let expires_at = self.ttl.map(|ttl| Utc::now() + ttl);
        self.lock()?.insert(
            key.expanded(),
            Entry {
                value: value.to_string(),
                expires_at,
            },
        );
        Ok(())
    }
}

/// Cache persisted as one HTML file per key under `root`, sharded by the
/// key digest. Entries older than the TTL count as misses.
#[derive(Debug, Clone)]
pub struct FileCache {
    root: PathBuf,
    ttl: Option<Duration>,
}

impl FileCache {
    pub fn new(root: impl AsRef<Path>, ttl: Option<Duration>) -> Result<Self, BanzaiError> {
        let root = root.as_ref().to_path_buf();
        ensure_cache_root(&root).map_err(|e| {
            BanzaiError::Cache(format!("creating cache root {}: {e}", root.display()))
        })?;
        Ok(Self { root, ttl })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of cached entries on disk.
    pub fn entries(&self) -> usize {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
            .filter(|e| e.path().extension().map(|ext| ext == "html").unwrap_or(false))
            .count()
    }

    /// Remove entries whose TTL has passed. Returns how many were removed.
    pub fn purge_expired(&self) -> io::Result<usize> {
        let mut removed = 0;
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.path().is_file())
        {
            if !self.is_fresh(entry.path())? {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    fn is_fresh(&self, path: &Path) -> io::Result<bool> {
        let Some(ttl) = self.ttl else {
            return Ok(true);
        };
        let modified: DateTime<Utc> = fs::metadata(path)?
            .modified()
            .unwrap_or(SystemTime::UNIX_EPOCH)
            .into();
        Ok(modified + ttl > Utc::now())
    }
}

impl CacheStore for FileCache {
    fn get(&self, key: &CacheKey) -> Result<Option<String>, BanzaiError> {
        let path = cache_path(&self.root, key);
        if !path.exists() {
            return Ok(None);
        }
        let fresh = self
            .is_fresh(&path)
            .map_err(|e| BanzaiError::Cache(e.to_string()))?;
        if !fresh {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| BanzaiError::Cache(format!("reading {}: {e}", path.display())))
    }

    fn set(&self, key: &CacheKey, value: &str) -> Result<(), BanzaiError> {
        let path = cache_path(&self.root, key);
        write_cache(&path, value)
            .map_err(|e| BanzaiError::Cache(format!("writing {}: {e}", path.display())))
    }
}

pub fn cache_path(cache_root: &Path, key: &CacheKey) -> PathBuf {
    let digest = format!("{:x}", Sha256::digest(key.expanded().as_bytes()));
    let (shard, rest) = digest.split_at(2);
    cache_root.join(shard).join(format!("{rest}.html"))
}

pub fn ensure_cache_root(cache_root: &Path) -> io::Result<()> {
    fs::create_dir_all(cache_root)
}

pub fn write_cache(path: &Path, html: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)
}
