//! The live key-value store shared by every connection.
//!
//! The data map and the expiry schedule sit behind one mutex. Expired keys are
//! removed lazily on read and by a single sweeper task that sleeps until the
//! earliest scheduled deadline.

use log::debug;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::rdb::{FieldValue, Rdb};
use crate::types::{KeyWithExpiry, ValueType};

/// Stale schedule entries tolerated on top of twice the live entry count.
const SCHEDULE_SLACK: usize = 32;

#[derive(Debug, Default)]
struct StoreInner {
    entries: HashMap<String, KeyWithExpiry>,
    expirations: BinaryHeap<Reverse<(Instant, String)>>,
    /// Keys of the snapshot's first database, as loaded at startup.
    snapshot_keys: Vec<String>,
}

impl StoreInner {
    fn insert(&mut self, key: String, value: ValueType, expiry: Option<Instant>) {
        if let Some(at) = expiry {
            self.expirations.push(Reverse((at, key.clone())));
        }
        self.entries.insert(key, KeyWithExpiry { value, expiry });
        if self.expirations.len() > 2 * self.entries.len() + SCHEDULE_SLACK {
            self.compact_schedule();
        }
    }

    /// Drops deadlines that no longer match the entry they were scheduled for.
    fn compact_schedule(&mut self) {
        let entries = &self.entries;
        let before = self.expirations.len();
        self.expirations.retain(|Reverse((at, key))| {
            entries
                .get(key)
                .is_some_and(|entry| entry.expiry == Some(*at))
        });
        debug!(
            "Compacted expiry schedule: {before} -> {}",
            self.expirations.len()
        );
    }

    /// Removes every entry whose deadline has passed and returns the next pending deadline.
    fn expire_due(&mut self, now: Instant) -> Option<Instant> {
        while let Some(Reverse((at, _))) = self.expirations.peek() {
            if *at > now {
                return Some(*at);
            }
            let Some(Reverse((at, key))) = self.expirations.pop() else {
                break;
            };
            // The key may have been overwritten since this deadline was scheduled.
            if self
                .entries
                .get(&key)
                .is_some_and(|entry| entry.expiry == Some(at))
            {
                self.entries.remove(&key);
                debug!("Key expired and removed: {key}");
            }
        }
        None
    }
}

#[derive(Debug, Clone, Default)]
pub struct Store {
    inner: Arc<Mutex<StoreInner>>,
    wakeup: Arc<Notify>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store from the first database of a decoded snapshot.
    /// Keys whose expiry already passed are not loaded.
    pub fn from_snapshot(rdb: &Rdb) -> Self {
        let mut inner = StoreInner::default();

        let now = Instant::now();
        let now_unix_ms = unix_millis(SystemTime::now());
        for field in rdb.first_database().map(|db| db.fields.as_slice()).unwrap_or_default() {
            let expiry = match field.expiry_ms() {
                None => None,
                Some(at_ms) if at_ms <= now_unix_ms => continue,
                Some(at_ms) => Some(now + Duration::from_millis(at_ms - now_unix_ms)),
            };
            let key = String::from_utf8_lossy(&field.key).into_owned();
            inner.snapshot_keys.push(key.clone());
            let value = match &field.value {
                FieldValue::String(s) => ValueType::String(String::from_utf8_lossy(s).into_owned()),
            };
            inner.insert(key, value, expiry);
        }

        Self {
            inner: Arc::new(Mutex::new(inner)),
            wakeup: Arc::new(Notify::new()),
        }
    }

    /// Inserts or overwrites `key`. With a ttl the key is scheduled for removal.
    pub async fn set(&self, key: String, value: String, ttl: Option<Duration>) {
        let expiry = ttl.map(|ttl| Instant::now() + ttl);
        {
            let mut inner = self.inner.lock().await;
            inner.insert(key, ValueType::String(value), expiry);
        }
        if expiry.is_some() {
            self.wakeup.notify_one();
        }
    }

    /// Returns the value of `key`, deleting it first if it has expired.
    pub async fn get(&self, key: &str) -> Option<String> {
        let mut inner = self.inner.lock().await;
        let expired = inner.entries.get(key)?.is_expired(Instant::now());
        if expired {
            inner.entries.remove(key);
            debug!("Key expired: {key}");
            return None;
        }
        inner.entries.get(key).map(|entry| match &entry.value {
            ValueType::String(s) => s.clone(),
        })
    }

    /// Only `*` is understood. Answers with the keys that were loaded from the
    /// snapshot (expired fields excluded), not the live key set.
    pub async fn keys(&self, pattern: &str) -> Vec<String> {
        if pattern != "*" {
            return Vec::new();
        }
        self.inner.lock().await.snapshot_keys.clone()
    }

    /// Number of stored entries, including expired ones not yet reaped.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Starts the task that removes keys at their expiry instant.
    pub fn spawn_expiry_sweeper(&self) -> JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            loop {
                let next = store.inner.lock().await.expire_due(Instant::now());
                match next {
                    Some(deadline) => {
                        tokio::select! {
                            _ = tokio::time::sleep_until(deadline.into()) => {}
                            _ = store.wakeup.notified() => {}
                        }
                    }
                    None => store.wakeup.notified().await,
                }
            }
        })
    }
}

fn unix_millis(at: SystemTime) -> u64 {
    at.duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}
