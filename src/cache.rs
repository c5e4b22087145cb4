//! Response cache keyed by request fingerprint.
//!
//! Only raw response bodies are stored, never parsed rows, so changes to the
//! parsing code can't be masked by a stale cache.
//!
//! [`FileCache`] keeps one file per response in a cache directory and is the
//! default backend. Its storage errors are never fatal: an unreadable entry
//! is a miss and a failed write is logged and skipped, so a fetch then
//! behaves as if uncached.

use crate::config::CacheConfig;
use crate::models::CacheKey;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::NamedTempFile;

/// Key-value store for raw response bodies.
pub trait ResponseCache {
    fn get(&mut self, key: &CacheKey) -> Option<String>;
    fn set(&mut self, key: CacheKey, body: String);
}

impl<C: ResponseCache + ?Sized> ResponseCache for Box<C> {
    fn get(&mut self, key: &CacheKey) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: CacheKey, body: String) {
        (**self).set(key, body)
    }
}

/// Unbounded in-process cache. Useful for tests and short-lived programs.
#[derive(Debug, Clone, Default)]
pub struct MemoryCache {
    entries: HashMap<CacheKey, String>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up without going through the trait (no `&mut` needed).
    pub fn peek(&self, key: &CacheKey) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl ResponseCache for MemoryCache {
    fn get(&mut self, key: &CacheKey) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: CacheKey, body: String) {
        self.entries.insert(key, body);
    }
}

const ENTRY_EXT: &str = "json";

/// First line of an entry file. The raw body follows it verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryHeader {
    key: CacheKey,
    stored_at: DateTime<Utc>,
}

/// Durable cache with time-to-live expiry and a bound on the entry count.
///
/// Every response lives in its own file, named by a SHA-256 digest of its
/// [`CacheKey`] and replaced atomically (temp file + rename). A `set` only
/// writes its own entry, so processes sharing the directory keep each
/// other's responses.
///
/// An entry's modification time is its last use: reads touch it. When the
/// cache is over its bound the least recently used entries are evicted, and
/// that order carries over between runs.
#[derive(Debug)]
pub struct FileCache {
    dir: PathBuf,
    ttl: Duration,
    max_size: usize,
}

impl FileCache {
    /// Open the cache directory described by `config` and drop stale
    /// entries. The directory is created on the first write.
    pub fn open(config: &CacheConfig) -> Self {
        let mut cache = Self {
            dir: config.path.clone(),
            ttl: config.ttl(),
            max_size: config.max_size,
        };
        let expired = cache.expire();
        if expired > 0 {
            log::debug!("expired {expired} cached responses");
        }
        cache.enforce_size(None);
        cache
    }

    /// The cache directory.
    pub fn path(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.entry_files().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove entries older than the TTL, and unreadable ones. Returns how
    /// many were dropped.
    pub fn expire(&mut self) -> usize {
        let now = Utc::now();
        let mut removed = 0;
        for (path, _) in self.entry_files() {
            let stale = match read_header(&path) {
                Ok((header, _)) => is_stale(header.stored_at, now, self.ttl),
                Err(e) => {
                    log::warn!("dropping unreadable cache entry {}: {e}", path.display());
                    true
                }
            };
            if stale && remove(&path) {
                removed += 1;
            }
        }
        removed
    }

    /// Drop every entry.
    pub fn clear(&mut self) {
        for (path, _) in self.entry_files() {
            remove(&path);
        }
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(entry_name(key))
    }

    /// Entry files with their last use. A missing directory has none.
    fn entry_files(&self) -> Vec<(PathBuf, SystemTime)> {
        let listing = match fs::read_dir(&self.dir) {
            Ok(listing) => listing,
            Err(e) => {
                if e.kind() != io::ErrorKind::NotFound {
                    log::warn!("could not list cache at {}: {e}", self.dir.display());
                }
                return Vec::new();
            }
        };
        listing
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| p.extension().is_some_and(|ext| ext == ENTRY_EXT))
            .filter_map(|p| {
                let used = fs::metadata(&p).and_then(|m| m.modified()).ok()?;
                Some((p, used))
            })
            .collect()
    }

    /// Evict least recently used entries until the bound holds. `keep` is
    /// the entry just written; it is only evicted by a zero bound.
    fn enforce_size(&self, keep: Option<&Path>) {
        let mut files = self.entry_files();
        if files.len() <= self.max_size {
            return;
        }
        let keep = keep.filter(|_| self.max_size > 0);
        files.sort_by_key(|(_, used)| *used);
        let excess = files.len() - self.max_size;
        for (path, _) in files
            .iter()
            .filter(|(p, _)| Some(p.as_path()) != keep)
            .take(excess)
        {
            log::debug!("evicting cached response {}", path.display());
            remove(path);
        }
    }
}

impl ResponseCache for FileCache {
    fn get(&mut self, key: &CacheKey) -> Option<String> {
        let path = self.entry_path(key);
        let (header, mut reader) = match read_header(&path) {
            Ok(found) => found,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return None,
            Err(e) => {
                log::warn!("ignoring unreadable cache entry {}: {e}", path.display());
                return None;
            }
        };
        if header.key != *key {
            return None;
        }
        if is_stale(header.stored_at, Utc::now(), self.ttl) {
            drop(reader);
            remove(&path);
            return None;
        }
        let mut body = String::new();
        if let Err(e) = reader.read_to_string(&mut body) {
            log::warn!("ignoring unreadable cache entry {}: {e}", path.display());
            return None;
        }
        drop(reader);
        touch(&path);
        Some(body)
    }

    fn set(&mut self, key: CacheKey, body: String) {
        let path = self.entry_path(&key);
        let header = EntryHeader {
            key,
            stored_at: Utc::now(),
        };
        match write_entry(&self.dir, &path, &header, &body) {
            Ok(()) => self.enforce_size(Some(&path)),
            Err(e) => log::warn!("could not write cache entry {}: {e}", path.display()),
        }
    }
}

fn is_stale(stored_at: DateTime<Utc>, now: DateTime<Utc>, ttl: Duration) -> bool {
    // Entries from the future (clock changes) count as fresh.
    (now - stored_at)
        .to_std()
        .map(|age| age >= ttl)
        .unwrap_or(false)
}

/// Hex SHA-256 over the length-framed url and parameters.
fn entry_name(key: &CacheKey) -> String {
    let mut hasher = Sha256::new();
    write_framed(&mut hasher, key.url.as_bytes());
    for (name, value) in &key.params {
        write_framed(&mut hasher, name.as_bytes());
        write_framed(&mut hasher, value.as_bytes());
    }
    format!("{}.{ENTRY_EXT}", hex::encode(hasher.finalize()))
}

fn write_framed(hasher: &mut Sha256, bytes: &[u8]) {
    hasher.update((bytes.len() as u64).to_be_bytes());
    hasher.update(bytes);
}

fn read_header(path: &Path) -> io::Result<(EntryHeader, BufReader<File>)> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = String::new();
    reader.read_line(&mut line)?;
    let header = serde_json::from_str(&line).map_err(io::Error::other)?;
    Ok((header, reader))
}

fn write_entry(dir: &Path, path: &Path, header: &EntryHeader, body: &str) -> io::Result<()> {
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    serde_json::to_writer(&mut tmp, header).map_err(io::Error::other)?;
    tmp.write_all(b"\n")?;
    tmp.write_all(body.as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Record a use of the entry.
fn touch(path: &Path) {
    let touched = File::options()
        .write(true)
        .open(path)
        .and_then(|f| f.set_modified(SystemTime::now()));
    if let Err(e) = touched {
        log::debug!("could not mark {} as used: {e}", path.display());
    }
}

/// Whether a file was removed by this call.
fn remove(path: &Path) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(e) if e.kind() == io::ErrorKind::NotFound => false,
        Err(e) => {
            log::warn!("could not remove cache entry {}: {e}", path.display());
            false
        }
    }
}
