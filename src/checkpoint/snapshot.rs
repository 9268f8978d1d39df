use std::fs;
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::ai::QLearningConfig;
use crate::checkpoint::atomic::write_atomic;
use crate::error::AgentError;

/// Version written into every value-table snapshot.
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

/// One persisted `(state, action) -> value` entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QEntry<S, A> {
    pub state: S,
    pub action: A,
    pub value: f64,
}

/// The on-disk form of a value table.
///
/// Encoded as MessagePack so every `f64` is stored with its exact bit pattern.
/// `config` and `saved_at` are informational and are not applied on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QTableSnapshot<S, A> {
    pub format_version: u32,
    pub saved_at: u64,
    pub total_updates: u64,
    pub config: QLearningConfig,
    pub entries: Vec<QEntry<S, A>>,
}

impl<S, A> QTableSnapshot<S, A> {
    pub fn new(config: QLearningConfig, total_updates: u64, entries: Vec<QEntry<S, A>>) -> Self {
        let saved_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        QTableSnapshot {
            format_version: SNAPSHOT_FORMAT_VERSION,
            saved_at,
            total_updates,
            config,
            entries,
        }
    }
}

impl<S: Serialize, A: Serialize> QTableSnapshot<S, A> {
    /// Encode and atomically write the snapshot to `path`.
    pub fn write(&self, path: &Path) -> Result<(), AgentError> {
        let bytes = rmp_serde::to_vec_named(self)?;
        write_atomic(path, &bytes).map_err(|source| AgentError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl<S: DeserializeOwned, A: DeserializeOwned> QTableSnapshot<S, A> {
    /// Read and decode a snapshot. A missing file maps to [`AgentError::NotFound`].
    pub fn read(path: &Path) -> Result<Self, AgentError> {
        let bytes = fs::read(path).map_err(|source| match source.kind() {
            io::ErrorKind::NotFound => AgentError::NotFound(path.to_path_buf()),
            _ => AgentError::Io {
                path: path.to_path_buf(),
                source,
            },
        })?;
        let snapshot: QTableSnapshot<S, A> =
            rmp_serde::from_slice(&bytes).map_err(|source| AgentError::Decode {
                path: path.to_path_buf(),
                source,
            })?;
        if snapshot.format_version != SNAPSHOT_FORMAT_VERSION {
            return Err(AgentError::UnsupportedVersion {
                path: path.to_path_buf(),
                found: snapshot.format_version,
            });
        }
        Ok(snapshot)
    }
}
