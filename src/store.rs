use std::fmt::{Display, Formatter};
use std::sync::mpsc::{Receiver, Sender, channel};

use crate::domain::{Reading, ReadingPatch, ValidationError, normalize_record, now_ms};
use crate::storage::{StorageBackend, StorageError};

/// Lookup key for `RecordStore::update`. `Id` is the older name for the same timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKey {
    Timestamp(i64),
    Id(i64),
}

impl RecordKey {
    fn timestamp(self) -> i64 {
        match self {
            RecordKey::Timestamp(timestamp) | RecordKey::Id(timestamp) => timestamp,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Loaded { count: usize },
    Added { timestamp: i64 },
    Updated { timestamp: i64 },
    Removed { timestamp: i64 },
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Persistence {
    Durable,
    MemoryOnly { reason: String },
}

#[derive(Debug)]
pub enum StoreError {
    Validation(ValidationError),
    NotFound(i64),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Validation(err) => write!(f, "{err}"),
            StoreError::NotFound(timestamp) => write!(f, "no reading with timestamp {timestamp}"),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<ValidationError> for StoreError {
    fn from(err: ValidationError) -> Self {
        StoreError::Validation(err)
    }
}

enum LoadState {
    Pending,
    Loaded,
    Failed(String),
}

/// In-memory source of truth for readings, persisted best-effort through a backend.
pub struct RecordStore {
    backend: Box<dyn StorageBackend>,
    cache: Vec<Reading>,
    load_state: LoadState,
    persistence: Persistence,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl RecordStore {
    pub fn new(backend: Box<dyn StorageBackend>) -> Self {
        Self {
            backend,
            cache: Vec::new(),
            load_state: LoadState::Pending,
            persistence: Persistence::Durable,
            subscribers: Vec::new(),
        }
    }

    /// Loads the backend once. Later calls return the outcome of the first load.
    pub fn initialize(&mut self) -> Result<usize, StorageError> {
        match &self.load_state {
            LoadState::Loaded => return Ok(self.cache.len()),
            LoadState::Failed(reason) => {
                return Err(StorageError::Io(std::io::Error::other(reason.clone())));
            }
            LoadState::Pending => {}
        }

        match self.backend.load_all() {
            Ok(rows) => {
                let total = rows.len();
                let mut readings = rows.iter().filter_map(normalize_record).collect::<Vec<_>>();
                readings.sort_by_key(|reading| reading.timestamp);
                readings.dedup_by_key(|reading| reading.timestamp);
                if readings.len() < total {
                    log::info!(
                        "skipped {} unusable rows from {}",
                        total - readings.len(),
                        self.backend.describe()
                    );
                }

                self.cache = readings;
                self.load_state = LoadState::Loaded;
                log::info!(
                    "loaded {} readings from {}",
                    self.cache.len(),
                    self.backend.describe()
                );
                self.notify(StoreEvent::Loaded {
                    count: self.cache.len(),
                });
                Ok(self.cache.len())
            }
            Err(err) => {
                let reason = err.to_string();
                log::warn!(
                    "storage unavailable ({}), continuing in memory: {reason}",
                    self.backend.describe()
                );
                self.load_state = LoadState::Failed(reason.clone());
                self.persistence = Persistence::MemoryOnly { reason };
                Err(err)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        !matches!(self.load_state, LoadState::Pending)
    }

    pub fn get_all(&mut self) -> Vec<Reading> {
        if !self.is_initialized() {
            let _ = self.initialize();
        }
        self.cache.clone()
    }

    pub fn get(&mut self, timestamp: i64) -> Option<Reading> {
        if !self.is_initialized() {
            let _ = self.initialize();
        }
        self.cache
            .iter()
            .find(|reading| reading.timestamp == timestamp)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn persistence(&self) -> &Persistence {
        &self.persistence
    }

    pub fn backend_name(&self) -> String {
        self.backend.describe()
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (sender, receiver) = channel();
        self.subscribers.push(sender);
        receiver
    }

    /// Stores a new reading. A timestamp of `0` is replaced with the current time.
    pub fn add(&mut self, mut reading: Reading) -> Result<Reading, StoreError> {
        if !self.is_initialized() {
            let _ = self.initialize();
        }

        reading.validate()?;
        if reading.timestamp <= 0 {
            reading.timestamp = now_ms();
        }
        while self.position(reading.timestamp).is_some() {
            reading.timestamp += 1;
        }

        let index = self
            .cache
            .partition_point(|existing| existing.timestamp < reading.timestamp);
        self.cache.insert(index, reading.clone());
        self.persist(&reading);
        self.notify(StoreEvent::Added {
            timestamp: reading.timestamp,
        });
        Ok(reading)
    }

    /// Merges `patch` over the stored reading. The timestamp never changes.
    pub fn update(&mut self, key: RecordKey, patch: &ReadingPatch) -> Result<Reading, StoreError> {
        if !self.is_initialized() {
            let _ = self.initialize();
        }

        let timestamp = key.timestamp();
        let index = self.position(timestamp).ok_or(StoreError::NotFound(timestamp))?;

        let mut merged = self.cache[index].clone();
        merged.apply_patch(patch);
        merged.timestamp = timestamp;
        merged.validate()?;

        self.cache[index] = merged.clone();
        self.persist(&merged);
        self.notify(StoreEvent::Updated { timestamp });
        Ok(merged)
    }

    pub fn remove(&mut self, timestamp: i64) -> Result<Reading, StoreError> {
        if !self.is_initialized() {
            let _ = self.initialize();
        }

        let index = self.position(timestamp).ok_or(StoreError::NotFound(timestamp))?;
        let removed = self.cache.remove(index);
        if self.is_durable() {
            if let Err(err) = self.backend.delete(timestamp) {
                self.degrade("delete", err);
            }
        }
        self.notify(StoreEvent::Removed { timestamp });
        Ok(removed)
    }

    pub fn clear(&mut self) {
        self.cache.clear();
        if !matches!(self.load_state, LoadState::Failed(_)) {
            self.load_state = LoadState::Loaded;
        }
        if self.is_durable() {
            if let Err(err) = self.backend.clear() {
                self.degrade("clear", err);
            }
        }
        self.notify(StoreEvent::Cleared);
    }

    fn position(&self, timestamp: i64) -> Option<usize> {
        self.cache
            .iter()
            .position(|reading| reading.timestamp == timestamp)
    }

    fn is_durable(&self) -> bool {
        self.persistence == Persistence::Durable
    }

    fn persist(&mut self, reading: &Reading) {
        if !self.is_durable() {
            return;
        }
        if let Err(err) = self.backend.put(reading) {
            self.degrade("save", err);
        }
    }

    fn degrade(&mut self, operation: &str, err: StorageError) {
        let reason = format!("{operation} failed: {err}");
        log::warn!(
            "storage {} became unavailable, keeping readings in memory: {reason}",
            self.backend.describe()
        );
        self.persistence = Persistence::MemoryOnly { reason };
    }

    fn notify(&mut self, event: StoreEvent) {
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }
}
