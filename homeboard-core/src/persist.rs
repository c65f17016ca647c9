//! Small JSON file helpers shared by the stores and the durable cache.

use std::io::ErrorKind;
use std::path::Path;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{HomeboardError, HomeboardResult};

/// Read a file, treating "not found" as `None`.
pub(crate) fn read_if_exists(path: &Path) -> HomeboardResult<Option<String>> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Decode a JSON array, skipping elements that do not fit `T`.
///
/// Only a document that is not an array at all is an error.
pub(crate) fn decode_records<T: DeserializeOwned>(
    content: &str,
    what: &str,
) -> HomeboardResult<Vec<T>> {
    let items: Vec<serde_json::Value> = serde_json::from_str(content)
        .map_err(|e| HomeboardError::MalformedRecord(format!("{what} file: {e}")))?;

    let records = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(record) => Some(record),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed {} record", what);
                None
            }
        })
        .collect();

    Ok(records)
}

/// Write `contents` next to `path` and rename it into place, so readers see
/// either the old file or the new one.
pub(crate) fn write_atomically(path: &Path, contents: &str) -> HomeboardResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}
