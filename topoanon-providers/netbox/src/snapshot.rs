//! Replay of exported NetBox record files.

use std::path::{Path, PathBuf};

use cap_std::{ambient_authority, fs::Dir};
use serde_json::Value;
use topoanon_core::{InventorySource, InventorySourceError, RecordKind};
use tracing::{debug, instrument};

use crate::{errors::NetboxConfigError, page::decode_page};

/// File name holding the records of `kind` inside a snapshot directory.
///
/// # Examples
/// ```
/// use topoanon_core::RecordKind;
/// use topoanon_providers_netbox::snapshot_file_name;
///
/// assert_eq!(snapshot_file_name(RecordKind::Device), "devices.json");
/// ```
#[must_use]
pub fn snapshot_file_name(kind: RecordKind) -> String {
    format!("{}.json", kind.category())
}

/// An [`InventorySource`] reading `devices.json`, `cables.json`,
/// `sites.json` and `circuits.json` from one directory.
///
/// Each file holds either a bare array of records or a single API page.
/// Lookups are confined to the opened directory.
#[derive(Debug)]
pub struct SnapshotDirectory {
    root: PathBuf,
    label: String,
    dir: Dir,
}

impl SnapshotDirectory {
    /// Opens `path` for reading.
    ///
    /// # Errors
    /// Returns [`NetboxConfigError::SnapshotDirectory`] when the directory
    /// cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, NetboxConfigError> {
        let root = path.as_ref().to_path_buf();
        let label = root.display().to_string();
        let dir = Dir::open_ambient_dir(&root, ambient_authority()).map_err(|error| {
            NetboxConfigError::SnapshotDirectory {
                path: label.clone(),
                message: error.to_string(),
            }
        })?;
        Ok(Self { root, label, dir })
    }

    /// Returns the directory the snapshot was opened from.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl InventorySource for SnapshotDirectory {
    fn name(&self) -> &str {
        &self.label
    }

    #[instrument(name = "netbox.snapshot.read", skip(self), fields(category = kind.category()), err)]
    fn fetch(&self, kind: RecordKind) -> Result<Vec<Value>, InventorySourceError> {
        let file_name = snapshot_file_name(kind);
        let origin = self.root.join(&file_name).display().to_string();
        let payload = self
            .dir
            .read(&file_name)
            .map_err(|error| InventorySourceError::Io {
                path: origin.clone(),
                message: error.to_string(),
            })?;
        let page = decode_page(&origin, &payload)?;
        debug!(path = %origin, records = page.results.len(), "read snapshot file");
        Ok(page.results)
    }
}
