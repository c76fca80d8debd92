// src/storage/refresh.rs
use log::{info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use crate::storage::loader::{self, LoadError};
use crate::storage::memory::{Snapshot, SnapshotStore};

type LoadFn = Box<dyn Fn(&Path) -> Result<Snapshot, LoadError> + Send + Sync>;

#[derive(Debug)]
pub enum RefreshError {
    Load(LoadError),
    TimedOut(Duration),
    Aborted(String),
}

impl fmt::Display for RefreshError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Load(e) => write!(f, "{}", e),
            Self::TimedOut(after) => write!(f, "Refresh did not finish within {:?}", after),
            Self::Aborted(reason) => write!(f, "Refresh task aborted: {}", reason),
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Load(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LoadError> for RefreshError {
    fn from(e: LoadError) -> Self {
        Self::Load(e)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    Published { records: usize, files: usize, skipped: usize },
    Skipped,
}

/// Reloads the snapshot directory and publishes the result.
///
/// Only one cycle runs at a time. A failed cycle leaves the published
/// snapshot untouched.
pub struct Refresher {
    store: Arc<SnapshotStore>,
    dir: PathBuf,
    load: LoadFn,
    in_flight: Mutex<()>,
}

impl Refresher {
    pub fn new(store: Arc<SnapshotStore>, dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            dir: dir.into(),
            load: Box::new(loader::load),
            in_flight: Mutex::new(()),
        }
    }

    #[cfg(test)]
    fn with_loader<F>(store: Arc<SnapshotStore>, dir: impl Into<PathBuf>, load: F) -> Self
    where
        F: Fn(&Path) -> Result<Snapshot, LoadError> + Send + Sync + 'static,
    {
        Self {
            load: Box::new(load),
            ..Self::new(store, dir)
        }
    }

    /// Runs one cycle on the calling thread. Blocks on file I/O.
    pub fn refresh(&self) -> Result<RefreshOutcome, RefreshError> {
        let Some(_guard) = self.in_flight.try_lock() else {
            warn!("Previous refresh of {} still running, skipping this cycle", self.dir.display());
            return Ok(RefreshOutcome::Skipped);
        };

        let snapshot = (self.load)(&self.dir)?;
        let outcome = RefreshOutcome::Published {
            records: snapshot.len(),
            files: snapshot.files_loaded(),
            skipped: snapshot.files_skipped().len(),
        };

        info!(
            "Published {} servers from {} files in {} ({} skipped, built at {:?})",
            snapshot.len(),
            snapshot.files_loaded(),
            self.dir.display(),
            snapshot.files_skipped().len(),
            snapshot.built_at()
        );
        self.store.publish(snapshot);
        Ok(outcome)
    }

    /// Runs one cycle on the blocking pool, giving up after `timeout`.
    ///
    /// A cycle that times out keeps running in the background and holds the
    /// in-flight guard, so the next tick is skipped rather than doubled up.
    pub async fn refresh_with_timeout(
        self: &Arc<Self>,
        timeout: Duration,
    ) -> Result<RefreshOutcome, RefreshError> {
        let refresher = Arc::clone(self);
        let task = tokio::task::spawn_blocking(move || refresher.refresh());

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(RefreshError::Aborted(e.to_string())),
            Err(_) => Err(RefreshError::TimedOut(timeout)),
        }
    }

    /// Refreshes every `period` until the runtime shuts down. The first
    /// cycle happens one period from now; the startup load is the caller's.
    pub async fn run(self: Arc<Self>, period: Duration, timeout: Duration) {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // First tick completes immediately
        timer.tick().await;

        loop {
            timer.tick().await;

            if let Err(e) = self.refresh_with_timeout(timeout).await {
                warn!("Refresh failed, keeping previous snapshot: {}", e);
            }
        }
    }
}

pub fn spawn(refresher: Arc<Refresher>, period: Duration, timeout: Duration) -> tokio::task::JoinHandle<()> {
    info!("Refreshing snapshots every {:?}", period);
    tokio::spawn(refresher.run(period, timeout))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write_file(dir: &std::path::Path, name: &str, game: &str, hostnames: &[&str]) {
        let entries: Vec<_> = hostnames
            .iter()
            .map(|h| json!({
                "ip": "192.168.0.10",
                "port": 28960,
                "game": game,
                "codInfo": format!("\\hostname\\{}", h),
            }))
            .collect();
        fs::write(dir.join(name), serde_json::to_vec(&entries).unwrap()).unwrap();
    }

    #[test]
    fn bad_file_does_not_block_publication() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "servers_iw4x.json", "iw4x", &["a", "b"]);
        fs::write(dir.path().join("servers_s1x.json"), "[{\"ip\": 5},").unwrap();

        let store = Arc::new(SnapshotStore::new());
        let refresher = Refresher::new(Arc::clone(&store), dir.path());

        let outcome = refresher.refresh().unwrap();
        assert_eq!(outcome, RefreshOutcome::Published { records: 2, files: 1, skipped: 1 });
        assert_eq!(store.query(None).len(), 2);
    }

    #[test]
    fn failed_cycle_keeps_previous_snapshot() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "servers_iw4x.json", "iw4x", &["a"]);

        let store = Arc::new(SnapshotStore::new());
        Refresher::new(Arc::clone(&store), dir.path()).refresh().unwrap();
        assert_eq!(store.query(None).len(), 1);

        // A regular file cannot be listed as a directory.
        let broken = Refresher::new(Arc::clone(&store), dir.path().join("servers_iw4x.json"));
        assert!(matches!(broken.refresh(), Err(RefreshError::Load(LoadError::Directory { .. }))));
        assert_eq!(store.query(None).len(), 1);
    }

    #[test]
    fn overlapping_cycle_is_skipped() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "servers_iw4x.json", "iw4x", &["a"]);

        let store = Arc::new(SnapshotStore::new());
        let refresher = Refresher::new(Arc::clone(&store), dir.path());

        let held = refresher.in_flight.lock();
        assert_eq!(refresher.refresh().unwrap(), RefreshOutcome::Skipped);
        assert!(store.query(None).is_empty());
        drop(held);

        assert!(matches!(refresher.refresh().unwrap(), RefreshOutcome::Published { records: 1, .. }));
    }

    #[tokio::test]
    async fn refresh_with_timeout_publishes() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "servers_iw6x.json", "iw6x", &["a", "b", "c"]);

        let store = Arc::new(SnapshotStore::new());
        let refresher = Arc::new(Refresher::new(Arc::clone(&store), dir.path()));

        let outcome = refresher.refresh_with_timeout(Duration::from_secs(5)).await.unwrap();
        assert!(matches!(outcome, RefreshOutcome::Published { records: 3, .. }));
        assert_eq!(store.query(Some("IW6X")).len(), 3);
    }

    #[tokio::test]
    async fn scheduled_cycles_pick_up_new_files() {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(SnapshotStore::new());
        let refresher = Arc::new(Refresher::new(Arc::clone(&store), dir.path()));

        let handle = spawn(Arc::clone(&refresher), Duration::from_millis(20), Duration::from_secs(5));
        write_file(dir.path(), "servers_iw4x.json", "iw4x", &["late"]);

        let mut seen = false;
        for _ in 0..100 {
            if store.query(None).len() == 1 {
                seen = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        handle.abort();

        assert!(seen, "scheduled refresh never published the new file");
        assert_eq!(store.query(None)[0].info.hostname, "late");
    }

    #[tokio::test]
    async fn timed_out_cycle_holds_off_later_cycles_until_it_finishes() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "servers_iw4x.json", "iw4x", &["before"]);

        let store = Arc::new(SnapshotStore::new());
        Refresher::new(Arc::clone(&store), dir.path()).refresh().unwrap();

        // The load blocks until the gate is released, like a read stuck on slow storage.
        let gate = Arc::new(Mutex::new(()));
        let held = gate.lock();
        let load_gate = Arc::clone(&gate);
        let refresher = Arc::new(Refresher::with_loader(Arc::clone(&store), dir.path(), move |path| {
            let _open = load_gate.lock();
            loader::load(path)
        }));
        write_file(dir.path(), "servers_iw4x.json", "iw4x", &["after"]);

        let timeout = Duration::from_millis(50);
        assert!(matches!(
            refresher.refresh_with_timeout(timeout).await,
            Err(RefreshError::TimedOut(after)) if after == timeout
        ));
        assert_eq!(refresher.refresh_with_timeout(timeout).await.unwrap(), RefreshOutcome::Skipped);
        assert_eq!(store.query(None)[0].info.hostname, "before");

        drop(held);

        let mut recovered = false;
        for _ in 0..100 {
            if let Ok(RefreshOutcome::Published { .. }) = refresher.refresh_with_timeout(Duration::from_secs(5)).await {
                recovered = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(recovered, "refresh never resumed after the stuck cycle finished");
        assert_eq!(store.query(None)[0].info.hostname, "after");
    }
}
