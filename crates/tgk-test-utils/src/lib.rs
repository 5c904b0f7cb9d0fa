//! Testing utilities for TGK workspace
//!
//! Shared storages, fixtures and tracing setup for tests.

#![allow(missing_docs)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use tgk_storage::{NamedStorage, ReadableStorage, Result, StorageError, StorageKey, WritableStorage};

struct Recorded<K, V> {
    values: HashMap<K, V>,
    reads: usize,
    writes: usize,
    read_failure: Option<StorageError>,
    write_failure: Option<StorageError>,
}

/// In-memory storage that counts calls and can be switched to fail
///
/// Clones share state, so a test can keep one handle while the other is
/// wrapped by combinators.
pub struct RecordingStorage<K, V> {
    name: Arc<str>,
    state: Arc<Mutex<Recorded<K, V>>>,
}

impl<K, V> Clone for RecordingStorage<K, V> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            state: Arc::clone(&self.state),
        }
    }
}

impl<K, V> std::fmt::Debug for RecordingStorage<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("RecordingStorage")
            .field("name", &self.name)
            .field("reads", &state.reads)
            .field("writes", &state.writes)
            .finish_non_exhaustive()
    }
}

impl<K: Hash + Eq, V: Clone> RecordingStorage<K, V> {
    pub fn new(name: &str) -> Self {
        Self {
            name: Arc::from(name),
            state: Arc::new(Mutex::new(Recorded {
                values: HashMap::new(),
                reads: 0,
                writes: 0,
                read_failure: None,
                write_failure: None,
            })),
        }
    }

    /// Store without counting a write
    pub fn seed(&self, key: K, value: V) {
        self.state.lock().values.insert(key, value);
    }

    /// Stored value, without counting a read
    pub fn peek(&self, key: &K) -> Option<V> {
        self.state.lock().values.get(key).cloned()
    }

    pub fn reads(&self) -> usize {
        self.state.lock().reads
    }

    pub fn writes(&self) -> usize {
        self.state.lock().writes
    }

    pub fn fail_reads(&self, error: StorageError) {
        self.state.lock().read_failure = Some(error);
    }

    pub fn fail_writes(&self, error: StorageError) {
        self.state.lock().write_failure = Some(error);
    }

    pub fn heal(&self) {
        let mut state = self.state.lock();
        state.read_failure = None;
        state.write_failure = None;
    }
}

impl<K: Send, V: Send> NamedStorage for RecordingStorage<K, V> {
    fn storage_name(&self) -> &str {
        &self.name
    }
}

#[async_trait]
impl<K, V> ReadableStorage<K, V> for RecordingStorage<K, V>
where
    K: StorageKey + Hash + Eq,
    V: Clone + Send + 'static,
{
    async fn retrieve(&self, key: K) -> Result<V> {
        let mut state = self.state.lock();
        state.reads += 1;
        if let Some(err) = &state.read_failure {
            return Err(err.clone());
        }
        state
            .values
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::not_found(&*self.name, &key))
    }
}

#[async_trait]
impl<K, V> WritableStorage<K, V> for RecordingStorage<K, V>
where
    K: StorageKey + Hash + Eq,
    V: Clone + Send + 'static,
{
    async fn set(&self, value: V, key: K) -> Result<()> {
        let mut state = self.state.lock();
        state.writes += 1;
        if let Some(err) = &state.write_failure {
            return Err(err.clone());
        }
        state.values.insert(key, value);
        Ok(())
    }
}

struct Attempts<V> {
    remaining_failures: usize,
    attempts: usize,
    written: Vec<V>,
}

/// Write-only storage failing a configured number of writes
pub struct FlakyWriter<V> {
    state: Arc<Mutex<Attempts<V>>>,
}

impl<V> Clone for FlakyWriter<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<V> std::fmt::Debug for FlakyWriter<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("FlakyWriter")
            .field("attempts", &state.attempts)
            .field("remaining_failures", &state.remaining_failures)
            .finish_non_exhaustive()
    }
}

impl<V: Clone> FlakyWriter<V> {
    /// Writer failing the first `failures` writes
    pub fn failing_first(failures: usize) -> Self {
        Self {
            state: Arc::new(Mutex::new(Attempts {
                remaining_failures: failures,
                attempts: 0,
                written: Vec::new(),
            })),
        }
    }

    pub fn reliable() -> Self {
        Self::failing_first(0)
    }

    pub fn fail_next(&self, failures: usize) {
        self.state.lock().remaining_failures = failures;
    }

    pub fn attempts(&self) -> usize {
        self.state.lock().attempts
    }

    /// Values of successful writes, in order
    pub fn written(&self) -> Vec<V> {
        self.state.lock().written.clone()
    }
}

impl<V: Send> NamedStorage for FlakyWriter<V> {
    fn storage_name(&self) -> &str {
        "flaky-writer"
    }
}

#[async_trait]
impl<K, V> WritableStorage<K, V> for FlakyWriter<V>
where
    K: StorageKey,
    V: Send + 'static,
{
    async fn set(&self, value: V, _key: K) -> Result<()> {
        let mut state = self.state.lock();
        state.attempts += 1;
        if state.remaining_failures > 0 {
            state.remaining_failures -= 1;
            return Err(StorageError::transport("flaky-writer", "connection reset"));
        }
        state.written.push(value);
        Ok(())
    }
}

pub fn ids(values: &[i64]) -> HashSet<i64> {
    values.iter().copied().collect()
}

pub fn temp_dir() -> tempfile::TempDir {
    tempfile::tempdir().unwrap()
}

/// Install a test-writer subscriber once; later calls are ignored
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
