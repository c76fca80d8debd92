// src/storage/memory.rs
use arc_swap::ArcSwap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::SystemTime;
use crate::models::server::ServerRecord;

/// An immutable, point-in-time list of every known server.
#[derive(Debug, Clone)]
pub struct Snapshot {
    servers: Vec<ServerRecord>,
    files_loaded: usize,
    files_skipped: Vec<PathBuf>,
    built_at: SystemTime,
}

impl Snapshot {
    pub fn new(servers: Vec<ServerRecord>, files_loaded: usize, files_skipped: Vec<PathBuf>) -> Self {
        Self {
            servers,
            files_loaded,
            files_skipped,
            built_at: SystemTime::now(),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    pub fn servers(&self) -> &[ServerRecord] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn files_loaded(&self) -> usize {
        self.files_loaded
    }

    pub fn files_skipped(&self) -> &[PathBuf] {
        &self.files_skipped
    }

    pub fn built_at(&self) -> SystemTime {
        self.built_at
    }

    /// Servers whose game matches `game` case-insensitively, or all of them.
    pub fn filter(&self, game: Option<&str>) -> Vec<ServerRecord> {
        match game {
            Some(game) => {
                let wanted = game.to_lowercase();
                self.servers
                    .iter()
                    .filter(|server| server.is_game(&wanted))
                    .cloned()
                    .collect()
            }
            None => self.servers().to_vec(),
        }
    }
}

/// Holds the currently published snapshot.
///
/// The refresh task is the only writer and swaps in whole snapshots; readers
/// take a reference once per request and never see a half-built list.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::with_snapshot(Snapshot::empty())
    }

    pub fn with_snapshot(snapshot: Snapshot) -> Self {
        Self {
            current: ArcSwap::from_pointee(snapshot),
        }
    }

    pub fn publish(&self, snapshot: Snapshot) {
        self.current.store(Arc::new(snapshot));
    }

    pub fn current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    pub fn query(&self, game: Option<&str>) -> Vec<ServerRecord> {
        self.current.load().filter(game)
    }
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}
