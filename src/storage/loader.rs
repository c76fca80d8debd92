// src/storage/loader.rs
use log::{debug, warn};
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use crate::codinfo;
use crate::models::server::{RawServerEntry, ServerRecord};
use crate::storage::memory::Snapshot;

const FILE_PREFIX: &str = "servers_";
const FILE_SUFFIX: &str = ".json";

#[derive(Debug)]
pub enum LoadError {
    Directory { path: PathBuf, source: io::Error },
    ReadFile { path: PathBuf, source: io::Error },
    ParseFile { path: PathBuf, source: serde_json::Error },
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory { path, source } => {
                write!(f, "Failed to list snapshot directory {}: {}", path.display(), source)
            }
            Self::ReadFile { path, source } => {
                write!(f, "Failed to read snapshot file {}: {}", path.display(), source)
            }
            Self::ParseFile { path, source } => {
                write!(f, "Invalid snapshot file {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Directory { source, .. } | Self::ReadFile { source, .. } => Some(source),
            Self::ParseFile { source, .. } => Some(source),
        }
    }
}

pub fn is_snapshot_file(name: &str) -> bool {
    name.len() >= FILE_PREFIX.len() + FILE_SUFFIX.len()
        && name.starts_with(FILE_PREFIX)
        && name.ends_with(FILE_SUFFIX)
}

/// Snapshot files in `dir`, in lexical filename order.
///
/// A missing directory holds no files. Any other listing failure fails the
/// whole load.
pub fn snapshot_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            debug!("Snapshot directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(LoadError::Directory { path: dir.to_path_buf(), source: e });
        }
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| LoadError::Directory { path: dir.to_path_buf(), source: e })?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if !is_snapshot_file(name) {
            continue;
        }
        // Follows symlinks; pipes, sockets and devices would block or fail the read.
        let path = entry.path();
        match fs::metadata(&path) {
            Ok(meta) if meta.is_file() => files.push(path),
            Ok(_) => debug!("Ignoring {}: not a regular file", path.display()),
            Err(e) => warn!("Ignoring {}: {}", path.display(), e),
        }
    }

    files.sort();
    Ok(files)
}

/// Reads one snapshot file and decodes every entry in it.
///
/// The file must hold a JSON array. An entry missing `ip`, `port` or `game`
/// is logged and dropped without affecting its neighbours.
pub fn load_file(path: &Path) -> Result<Vec<ServerRecord>, LoadError> {
    let contents = fs::read(path)
        .map_err(|e| LoadError::ReadFile { path: path.to_path_buf(), source: e })?;
    let entries: Vec<serde_json::Value> = serde_json::from_slice(&contents)
        .map_err(|e| LoadError::ParseFile { path: path.to_path_buf(), source: e })?;

    let mut records = Vec::with_capacity(entries.len());
    for (index, value) in entries.into_iter().enumerate() {
        match serde_json::from_value::<RawServerEntry>(value) {
            Ok(entry) => records.push(to_record(entry)),
            Err(e) => warn!("Skipping entry {} of {}: {}", index, path.display(), e),
        }
    }
    Ok(records)
}

fn to_record(entry: RawServerEntry) -> ServerRecord {
    ServerRecord {
        info: codinfo::decode(&entry.cod_info),
        ip: entry.ip,
        port: entry.port,
        game: entry.game,
    }
}

/// Builds a fresh snapshot from every snapshot file in `dir`.
///
/// A file that cannot be read or parsed is logged and skipped; the remaining
/// files still make up the snapshot.
pub fn load(dir: &Path) -> Result<Snapshot, LoadError> {
    let files = snapshot_files(dir)?;

    let mut servers = Vec::new();
    let mut loaded = 0;
    let mut skipped = Vec::new();

    for path in files {
        match load_file(&path) {
            Ok(records) => {
                debug!("Loaded {} servers from {}", records.len(), path.display());
                servers.extend(records);
                loaded += 1;
            }
            Err(e) => {
                warn!("Skipping snapshot file: {}", e);
                skipped.push(path);
            }
        }
    }

    Ok(Snapshot::new(servers, loaded, skipped))
}
