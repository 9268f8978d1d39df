//! Value-table persistence and atomic file writes shared with the converter.

pub mod atomic;
mod snapshot;

pub use atomic::{tmp_path, write_atomic};
pub use snapshot::{QEntry, QTableSnapshot, SNAPSHOT_FORMAT_VERSION};
