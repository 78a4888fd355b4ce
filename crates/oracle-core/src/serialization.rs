//! JSON output files written at the end of a run.

use serde::Serialize;
use std::fs;
use std::path::Path;

/// Writes `value` as pretty-printed JSON terminated by a newline, creating
/// missing parent directories.
pub fn write_json_artifact<T: Serialize + ?Sized>(path: &Path, value: &T) -> std::io::Result<()> {
    let mut content = serde_json::to_vec_pretty(value).map_err(std::io::Error::other)?;
    content.push(b'\n');

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}
