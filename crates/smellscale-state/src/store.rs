//! ScaleStore — locked load/save of the singleton `ScaleState`.
//!
//! Load never fails: a missing blob yields (and persists) a fresh default
//! state, an undecodable blob is stashed and replaced by a persisted
//! default, and a backend read error yields an unpersisted default with a
//! warning. `update` refuses to write when the read failed, so intact data
//! behind a flaky backend is never overwritten.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use smellscale_core::ScaleState;

use crate::backend::BlobStore;
use crate::error::{StateError, StateResult};
use crate::redb_store::RedbStore;

/// Shared handle to the persisted scale state.
#[derive(Clone)]
pub struct ScaleStore {
    backend: Arc<dyn BlobStore>,
    lock: Arc<Mutex<()>>,
}

impl ScaleStore {
    pub fn new(backend: Arc<dyn BlobStore>) -> Self {
        Self {
            backend,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// A store over an in-memory redb database (for testing).
    pub fn in_memory() -> StateResult<Self> {
        Ok(Self::new(Arc::new(RedbStore::open_in_memory()?)))
    }

    pub fn backend(&self) -> &Arc<dyn BlobStore> {
        &self.backend
    }

    /// Read the current state.
    pub fn load(&self) -> ScaleState {
        self.load_at(Utc::now())
    }

    /// Read the current state, using `now` as the creation time if a default
    /// has to be substituted.
    pub fn load_at(&self, now: DateTime<Utc>) -> ScaleState {
        let _guard = self.guard();
        match self.load_unlocked(now) {
            Ok(state) => state,
            Err(e) => {
                warn!(
                    backend = %self.backend.describe(),
                    error = %e,
                    "scale state unavailable, using default"
                );
                ScaleState::new(now)
            }
        }
    }

    /// Overwrite the persisted state. Last save wins.
    pub fn save(&self, state: &ScaleState) -> StateResult<()> {
        let _guard = self.guard();
        self.save_unlocked(state)
    }

    /// Load, mutate and save under the store lock.
    ///
    /// The closure's return value is passed through. If the backend cannot
    /// be read, the closure is not run and nothing is written.
    pub fn update<R>(&self, f: impl FnOnce(&mut ScaleState) -> R) -> StateResult<R> {
        self.update_at(Utc::now(), f)
    }

    pub fn update_at<R>(
        &self,
        now: DateTime<Utc>,
        f: impl FnOnce(&mut ScaleState) -> R,
    ) -> StateResult<R> {
        let _guard = self.guard();
        let mut state = self.load_unlocked(now)?;
        let out = f(&mut state);
        self.save_unlocked(&state)?;
        Ok(out)
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        // The mutex protects no data, so a poisoned lock is still usable.
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Only a backend read error is returned; absent and undecodable blobs
    /// are replaced by a persisted default.
    fn load_unlocked(&self, now: DateTime<Utc>) -> StateResult<ScaleState> {
        let Some(bytes) = self.backend.read_blob()? else {
            let state = ScaleState::new(now);
            match self.save_unlocked(&state) {
                Ok(()) => debug!(backend = %self.backend.describe(), "initialized default scale state"),
                Err(e) => error!(error = %e, "failed to persist default scale state"),
            }
            return Ok(state);
        };

        match serde_json::from_slice::<ScaleState>(&bytes) {
            Ok(mut state) => {
                let dropped = state.normalize();
                if dropped > 0 {
                    warn!(dropped, "discarded out-of-range votes from stored state");
                }
                Ok(state)
            }
            Err(e) => {
                let e = StateError::Deserialize(e.to_string());
                warn!(
                    backend = %self.backend.describe(),
                    error = %e,
                    "scale state unreadable, resetting to default"
                );
                let state = ScaleState::new(now);
                // Keep the bad blob in place unless a copy was preserved.
                match self.backend.stash_corrupt(&bytes) {
                    Ok(()) => {
                        if let Err(e) = self.save_unlocked(&state) {
                            error!(error = %e, "failed to persist default scale state");
                        }
                    }
                    Err(e) => error!(error = %e, "failed to preserve unreadable scale state"),
                }
                Ok(state)
            }
        }
    }

    fn save_unlocked(&self, state: &ScaleState) -> StateResult<()> {
        let bytes =
            serde_json::to_vec_pretty(state).map_err(|e| StateError::Serialize(e.to_string()))?;
        self.backend.write_blob(&bytes)?;
        debug!(base = state.base, votes = state.votes.len(), "scale state saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use smellscale_core::{DEFAULT_BASE, MIN_SCALE, Vote};

    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use crate::file_store::JsonFileStore;

    /// In-memory backend whose reads and stashes can be made to fail.
    struct FlakyBackend {
        blob: Mutex<Option<Vec<u8>>>,
        failing_reads: AtomicUsize,
        fail_stash: AtomicBool,
        stashed: AtomicUsize,
    }

    impl FlakyBackend {
        fn with_blob(bytes: &[u8]) -> Self {
            Self {
                blob: Mutex::new(Some(bytes.to_vec())),
                failing_reads: AtomicUsize::new(0),
                fail_stash: AtomicBool::new(false),
                stashed: AtomicUsize::new(0),
            }
        }

        fn blob(&self) -> Vec<u8> {
            self.blob.lock().unwrap().clone().unwrap_or_default()
        }
    }

    impl BlobStore for FlakyBackend {
        fn read_blob(&self) -> StateResult<Option<Vec<u8>>> {
            let pending = self.failing_reads.load(Ordering::SeqCst);
            if pending > 0 {
                self.failing_reads.store(pending - 1, Ordering::SeqCst);
                return Err(StateError::Read("backend offline".into()));
            }
            Ok(self.blob.lock().unwrap().clone())
        }

        fn write_blob(&self, bytes: &[u8]) -> StateResult<()> {
            *self.blob.lock().unwrap() = Some(bytes.to_vec());
            Ok(())
        }

        fn stash_corrupt(&self, _bytes: &[u8]) -> StateResult<()> {
            if self.fail_stash.load(Ordering::SeqCst) {
                return Err(StateError::Write("stash refused".into()));
            }
            self.stashed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        fn describe(&self) -> String {
            "flaky".into()
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 12, 0, 0).unwrap()
    }

    fn redb_backed() -> (ScaleStore, RedbStore) {
        let redb = RedbStore::open_in_memory().unwrap();
        (ScaleStore::new(Arc::new(redb.clone())), redb)
    }

    #[test]
    fn first_load_creates_and_persists_default() {
        let (store, redb) = redb_backed();
        let state = store.load_at(t0());

        assert_eq!(state, ScaleState::new(t0()));
        let raw = redb.read_blob().unwrap().unwrap();
        let persisted: ScaleState = serde_json::from_slice(&raw).unwrap();
        assert_eq!(persisted, state);
    }

    #[test]
    fn save_then_load() {
        let store = ScaleStore::in_memory().unwrap();
        let mut state = ScaleState::new(t0());
        state.record_vote(Vote::new(7.0, t0()));
        state.set_base(3.0, t0());
        store.save(&state).unwrap();

        assert_eq!(store.load(), state);
    }

    #[test]
    fn save_of_load_is_idempotent() {
        let (store, redb) = redb_backed();
        store
            .update_at(t0(), |s| s.record_vote(Vote::new(4.5, t0())))
            .unwrap();
        let before = redb.read_blob().unwrap().unwrap();

        store.save(&store.load()).unwrap();

        assert_eq!(redb.read_blob().unwrap().unwrap(), before);
    }

    #[test]
    fn update_appends_in_insertion_order() {
        let store = ScaleStore::in_memory().unwrap();
        for v in [3.0, 9.0, 1.0] {
            store.update(|s| s.record_vote(Vote::new(v, t0()))).unwrap();
        }
        let values: Vec<f64> = store.load().votes.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![3.0, 9.0, 1.0]);
    }

    #[test]
    fn update_returns_closure_value() {
        let store = ScaleStore::in_memory().unwrap();
        let base = store
            .update(|s| {
                s.adjust_base(-10.0, t0());
                s.base
            })
            .unwrap();
        assert_eq!(base, MIN_SCALE);
        assert_eq!(store.load().base, MIN_SCALE);
    }

    #[test]
    fn corrupt_blob_falls_back_and_is_stashed() {
        let (store, redb) = redb_backed();
        redb.write_blob(b"{ this is not json").unwrap();

        let state = store.load_at(t0());

        assert_eq!(state, ScaleState::new(t0()));
        let stashed = redb.corrupt_blobs().unwrap();
        assert_eq!(stashed.len(), 1);
        assert_eq!(stashed[0].1, b"{ this is not json");
    }

    #[test]
    fn corrupt_blob_is_replaced_after_one_stash() {
        let (store, redb) = redb_backed();
        redb.write_blob(b"{ not json").unwrap();

        store.load_at(t0());
        store.load_at(t0());

        assert_eq!(redb.corrupt_blobs().unwrap().len(), 1);
        let live = redb.read_blob().unwrap().unwrap();
        let persisted: ScaleState = serde_json::from_slice(&live).unwrap();
        assert_eq!(persisted, ScaleState::new(t0()));
    }

    #[test]
    fn corrupt_blob_is_left_alone_when_stash_fails() {
        let backend = Arc::new(FlakyBackend::with_blob(b"{ not json"));
        backend.fail_stash.store(true, Ordering::SeqCst);
        let store = ScaleStore::new(backend.clone());

        assert_eq!(store.load_at(t0()), ScaleState::new(t0()));
        assert_eq!(backend.blob(), b"{ not json");
    }

    #[test]
    fn update_refuses_to_write_after_read_error() {
        let (seed, _) = redb_backed();
        for v in [2.0, 4.0, 6.0] {
            seed.update_at(t0(), |s| s.record_vote(Vote::new(v, t0()))).unwrap();
        }
        let backend = Arc::new(FlakyBackend::with_blob(&serde_json::to_vec(&seed.load()).unwrap()));
        backend.failing_reads.store(1, Ordering::SeqCst);
        let store = ScaleStore::new(backend.clone());

        let mut ran = false;
        let err = store
            .update_at(t0(), |s| {
                ran = true;
                s.record_vote(Vote::new(9.0, t0()))
            })
            .unwrap_err();
        assert!(matches!(err, StateError::Read(_)));
        assert!(!ran);

        // Once the backend recovers the history is intact.
        store.update_at(t0(), |s| s.record_vote(Vote::new(9.0, t0()))).unwrap();
        let values: Vec<f64> = store.load().votes.iter().map(|v| v.value).collect();
        assert_eq!(values, vec![2.0, 4.0, 6.0, 9.0]);
        assert_eq!(backend.stashed.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn load_after_read_error_does_not_persist_default() {
        let backend = Arc::new(FlakyBackend::with_blob(br#"{"base": 3, "votes": []}"#));
        backend.failing_reads.store(1, Ordering::SeqCst);
        let store = ScaleStore::new(backend.clone());

        assert_eq!(store.load_at(t0()).base, DEFAULT_BASE);
        assert_eq!(store.load_at(t0()).base, 3.0);
    }

    #[test]
    fn legacy_file_is_migrated_on_next_save() {
        let dir = tempfile::tempdir().unwrap();
        let file = JsonFileStore::in_dir(dir.path());
        std::fs::write(
            file.path(),
            r#"{
  "scale_value": 6,
  "votes": [{ "value": 8, "timestamp": "2026-10-15T11:30:00.000Z" }],
  "last_updated": "2026-10-15T11:00:00.000Z"
}"#,
        )
        .unwrap();
        let store = ScaleStore::new(Arc::new(file.clone()));

        store.update(|s| s.record_vote(Vote::new(2.0, t0()))).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&file.read_blob().unwrap().unwrap()).unwrap();
        assert_eq!(raw["base"], 6.0);
        assert!(raw.get("scale_value").is_none());
        assert_eq!(raw["votes"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn out_of_range_stored_data_is_repaired() {
        let (store, redb) = redb_backed();
        redb.write_blob(
            br#"{"base": 15, "last_updated": "2026-10-15T12:00:00Z",
                 "votes": [{"value": 0, "timestamp": "2026-10-15T12:00:00Z"},
                           {"value": 5, "timestamp": "2026-10-15T12:00:00Z"}]}"#,
        )
        .unwrap();

        let state = store.load();
        assert_eq!(state.base, 10.0);
        assert_eq!(state.votes.len(), 1);
    }

    #[test]
    fn unavailable_backend_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        // A directory where the state file should be cannot be read.
        let store = ScaleStore::new(Arc::new(JsonFileStore::new(dir.path().to_path_buf())));
        let state = store.load_at(t0());
        assert_eq!(state.base, DEFAULT_BASE);
        assert!(state.votes.is_empty());
    }

    #[test]
    fn concurrent_updates_do_not_lose_votes() {
        let store = ScaleStore::in_memory().unwrap();
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for _ in 0..10 {
                        store
                            .update(|s| s.record_vote(Vote::new(1.0 + i as f64, Utc::now())))
                            .unwrap();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.load().votes.len(), 80);
    }
}
