//! Expiring cache of fetched ancestor transactions.
//!
//! Entries are kept as raw serialized bytes and handed out as copies, so a
//! caller that deserializes a transaction never grows the shared store. The
//! cache is bounded three ways: entry count, total bytes and age. Count and
//! byte pressure evict least-recently-used entries; an entry past its TTL
//! reads as absent and is dropped on access.
//!
//! One cache is constructed per process and shared by reference among every
//! job and client that needs it.

use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use slp_primitives::hash::sha256d;
use slp_primitives::Hash;
use slp_transaction::Transaction;
use tracing::debug;

use crate::config::CacheConfig;

struct CacheEntry {
    raw: Vec<u8>,
    inserted: Instant,
}

struct CacheState {
    entries: LruCache<Hash, CacheEntry>,
    bytes: usize,
}

/// Process-wide store of raw ancestor transactions keyed by txid.
pub struct ExpiringTxCache {
    state: Mutex<CacheState>,
    max_bytes: usize,
    ttl: Duration,
}

impl ExpiringTxCache {
    /// Create an empty cache with the given bounds.
    pub fn new(config: &CacheConfig) -> Self {
        let cap = NonZeroUsize::new(config.max_entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(CacheState { entries: LruCache::new(cap), bytes: 0 }),
            max_bytes: config.max_bytes,
            ttl: config.ttl(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheState> {
        // A panic while holding the lock cannot leave an entry half-written,
        // so a poisoned state is still consistent.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Store raw transaction bytes, computing the txid from them.
    ///
    /// # Returns
    /// The txid the bytes were stored under.
    pub fn put(&self, raw: &[u8]) -> Hash {
        let txid = Hash::new(sha256d(raw));
        self.put_with_txid(txid, raw);
        txid
    }

    /// Store raw transaction bytes under a txid the caller already knows.
    ///
    /// Payloads larger than the byte bound are not stored.
    pub fn put_with_txid(&self, txid: Hash, raw: &[u8]) {
        if raw.len() > self.max_bytes {
            debug!(txid = %txid, size = raw.len(), "transaction larger than cache, not stored");
            return;
        }

        let mut state = self.lock();
        let entry = CacheEntry { raw: raw.to_vec(), inserted: Instant::now() };
        state.bytes += raw.len();
        if let Some((old_txid, old)) = state.entries.push(txid, entry) {
            state.bytes -= old.raw.len();
            if old_txid != txid {
                debug!(txid = %old_txid, "evicted from transaction cache");
            }
        }

        while state.bytes > self.max_bytes {
            match state.entries.pop_lru() {
                Some((old_txid, old)) => {
                    state.bytes -= old.raw.len();
                    debug!(txid = %old_txid, "evicted from transaction cache (size)");
                }
                None => break,
            }
        }
    }

    /// Store a transaction in serialized form.
    pub fn put_tx(&self, tx: &Transaction) -> Hash {
        self.put(&tx.to_bytes())
    }

    /// Fetch a copy of the raw bytes for `txid`.
    ///
    /// Returns `None` for absent, evicted, or expired entries.
    pub fn get(&self, txid: &Hash) -> Option<Vec<u8>> {
        let mut state = self.lock();
        let expired = match state.entries.peek(txid) {
            None => return None,
            Some(entry) => entry.inserted.elapsed() > self.ttl,
        };
        if expired {
            if let Some(old) = state.entries.pop(txid) {
                state.bytes -= old.raw.len();
            }
            debug!(txid = %txid, "transaction cache entry expired");
            return None;
        }
        state.entries.get(txid).map(|entry| entry.raw.clone())
    }

    /// Fetch and deserialize a fresh copy of the transaction for `txid`.
    ///
    /// An entry that no longer parses is treated as absent.
    pub fn get_tx(&self, txid: &Hash) -> Option<Transaction> {
        self.get(txid).and_then(|raw| Transaction::from_bytes(&raw).ok())
    }

    /// True if a live entry exists for `txid`. Does not touch LRU order.
    pub fn contains(&self, txid: &Hash) -> bool {
        let state = self.lock();
        state.entries.peek(txid).is_some_and(|e| e.inserted.elapsed() <= self.ttl)
    }

    /// Number of stored entries (including any not yet noticed as expired).
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// True when nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total raw bytes held.
    pub fn size_bytes(&self) -> usize {
        self.lock().bytes
    }

    /// Drop every entry.
    pub fn clear(&self) {
        let mut state = self.lock();
        state.entries.clear();
        state.bytes = 0;
    }
}

impl std::fmt::Debug for ExpiringTxCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("ExpiringTxCache")
            .field("entries", &state.entries.len())
            .field("bytes", &state.bytes)
            .field("max_bytes", &self.max_bytes)
            .field("ttl", &self.ttl)
            .finish()
    }
}
