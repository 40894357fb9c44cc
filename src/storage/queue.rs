//! Durable offline queue
//!
//! An ordered list of records waiting for remote delivery, persisted as a
//! JSON array under one well-known key. Every mutation is written to the
//! store before the in-memory copy changes, so an `Ok` from [`DurableQueue::append`]
//! means the record survives a restart.
//!
//! # Example
//!
//! ```no_run
//! use rollcall::capture::capture;
//! use rollcall::storage::{DurableQueue, MemoryStore};
//!
//! # fn example() -> anyhow::Result<()> {
//! let store = MemoryStore::new();
//! let mut queue = DurableQueue::open(store.clone(), "offline_attendance")?;
//! queue.append(capture("04A1B2C3")?)?;
//!
//! // A fresh queue over the same store sees the record
//! let reopened = DurableQueue::open(store, "offline_attendance")?;
//! assert_eq!(reopened.count(), 1);
//! # Ok(())
//! # }
//! ```

use crate::models::AttendanceRecord;

use super::{KeyValueStore, StorageError, StorageResult};

/// Key used by default for the queue blob
pub const DEFAULT_QUEUE_KEY: &str = "offline_attendance";

/// Persisted FIFO of undelivered records
pub struct DurableQueue<S> {
    store: S,
    key: String,
    records: Vec<AttendanceRecord>,
}

impl<S: KeyValueStore> DurableQueue<S> {
    /// Load the queue persisted under `key`, or start empty
    pub fn open(store: S, key: impl Into<String>) -> StorageResult<Self> {
        let key = key.into();
        let records = match store.get(&key)? {
            Some(blob) => decode(&key, &blob)?,
            None => Vec::new(),
        };

        let queue = Self {
            store,
            key,
            records,
        };

        if !queue.records.is_empty() {
            // Rewrite so records from older blobs keep the id they were given on load
            queue.persist(&queue.records)?;
            tracing::info!(
                key = %queue.key,
                pending = queue.records.len(),
                "Recovered pending records from previous session"
            );
        }

        Ok(queue)
    }

    /// Add `record` at the tail; durable once this returns `Ok`
    pub fn append(&mut self, record: AttendanceRecord) -> StorageResult<()> {
        self.records.push(record);
        if let Err(e) = self.persist(&self.records) {
            self.records.pop();
            return Err(e);
        }

        tracing::debug!(key = %self.key, pending = self.records.len(), "Record queued");
        Ok(())
    }

    /// Full contents in insertion order; nothing is removed
    pub fn drain_all(&self) -> Vec<AttendanceRecord> {
        self.records.clone()
    }

    /// Empty the queue
    pub fn clear(&mut self) -> StorageResult<()> {
        self.store.remove(&self.key)?;
        self.records.clear();
        tracing::debug!(key = %self.key, "Queue cleared");
        Ok(())
    }

    /// Remove the first `n` records after the remote confirmed them
    ///
    /// Records appended after the confirmed batch was taken stay queued.
    pub fn acknowledge(&mut self, n: usize) -> StorageResult<()> {
        if n >= self.records.len() {
            return self.clear();
        }

        self.persist(&self.records[n..])?;
        self.records.drain(..n);
        tracing::debug!(
            key = %self.key,
            acknowledged = n,
            pending = self.records.len(),
            "Delivered prefix removed from queue"
        );
        Ok(())
    }

    /// Current number of queued records
    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Storage key of the queue blob
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Backing store
    pub fn store(&self) -> &S {
        &self.store
    }

    fn persist(&self, records: &[AttendanceRecord]) -> StorageResult<()> {
        if records.is_empty() {
            return self.store.remove(&self.key);
        }

        let blob = serde_json::to_string(records).map_err(|source| StorageError::Serialization {
            key: self.key.clone(),
            source,
        })?;
        self.store.set(&self.key, &blob)
    }
}

fn decode(key: &str, blob: &str) -> StorageResult<Vec<AttendanceRecord>> {
    serde_json::from_str(blob).map_err(|source| StorageError::Serialization {
        key: key.to_string(),
        source,
    })
}
