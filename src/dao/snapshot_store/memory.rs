use std::sync::{
    Arc, Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use futures::future::BoxFuture;
use serde_json::Value;

use crate::{
    dao::{
        snapshot_store::SnapshotStore,
        storage::{StorageError, StorageResult},
    },
    state::match_state::{MatchState, Settings},
};

#[derive(Default)]
struct Slots {
    last_match: Mutex<Option<Value>>,
    settings: Mutex<Option<Value>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

/// Volatile store keeping records in memory, with switchable failure for tests.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    slots: Arc<Slots>,
}

impl InMemorySnapshotStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with raw records.
    pub fn with_records(last_match: Option<Value>, settings: Option<Value>) -> Self {
        let store = Self::new();
        *lock(&store.slots.last_match) = last_match;
        *lock(&store.slots.settings) = settings;
        store
    }

    /// Make every subsequent save fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.slots.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of successful match saves.
    pub fn match_saves(&self) -> usize {
        self.slots.saves.load(Ordering::SeqCst)
    }

    /// Last saved match record.
    pub fn last_match(&self) -> Option<Value> {
        lock(&self.slots.last_match).clone()
    }

    /// Last saved settings record.
    pub fn settings(&self) -> Option<Value> {
        lock(&self.slots.settings).clone()
    }

    fn check_available(&self) -> StorageResult<()> {
        if self.slots.failing.load(Ordering::SeqCst) {
            return Err(StorageError::unavailable(
                "in-memory store switched off".into(),
                std::io::Error::other("simulated outage"),
            ));
        }
        Ok(())
    }

    fn encode<T: serde::Serialize>(value: &T) -> StorageResult<Value> {
        serde_json::to_value(value)
            .map_err(|err| StorageError::malformed("failed to encode record".into(), err))
    }
}

fn lock<T>(slot: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    slot.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl SnapshotStore for InMemorySnapshotStore {
    fn load_last_match(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let record = lock(&self.slots.last_match).clone();
        Box::pin(async move { Ok(record) })
    }

    fn save_last_match(&self, state: MatchState) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.check_available().and_then(|()| Self::encode(&state)).map(|record| {
            *lock(&self.slots.last_match) = Some(record);
            self.slots.saves.fetch_add(1, Ordering::SeqCst);
        });
        Box::pin(async move { result })
    }

    fn load_settings(&self) -> BoxFuture<'static, StorageResult<Option<Value>>> {
        let record = lock(&self.slots.settings).clone();
        Box::pin(async move { Ok(record) })
    }

    fn save_settings(&self, settings: Settings) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.check_available().and_then(|()| Self::encode(&settings)).map(|record| {
            *lock(&self.slots.settings) = Some(record);
        });
        Box::pin(async move { result })
    }
}
