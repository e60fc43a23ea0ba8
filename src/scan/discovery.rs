//! Log file discovery in simulation directories.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Marker before the QP in a log filename.
const QP_SEPARATOR: &str = "_QP";

/// List files directly inside `dir` whose name ends with `suffix`.
///
/// Subdirectories are not searched. Paths are sorted.
pub fn list_logs(dir: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    list_matching(dir, |name| name.ends_with(suffix))
}

/// List the logs next to `file` that belong to the same sequence.
///
/// The sequence prefix is the filename up to its last `_QP`, so
/// `RA-Kimono_QP22_enc.log` selects every `RA-Kimono*_enc.log` in the same
/// directory, `file` itself included.
pub fn list_logs_for_sequence(file: &Path, suffix: &str) -> Result<Vec<PathBuf>> {
    let Some(name) = file.file_name().and_then(|s| s.to_str()) else {
        return Ok(Vec::new());
    };
    let prefix = name.rsplit_once(QP_SEPARATOR).map_or(name, |(prefix, _)| prefix);
    let dir = match file.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    list_matching(dir, |candidate| {
        candidate.starts_with(prefix) && candidate.ends_with(suffix)
    })
}

fn list_matching(dir: &Path, matches: impl Fn(&str) -> bool) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::new();

    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Error reading entry in {}: {}", dir.display(), e);
                continue;
            }
        };

        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if path.file_name().and_then(|s| s.to_str()).is_some_and(&matches) {
            paths.push(path);
        }
    }

    paths.sort();
    tracing::debug!("{} log files in {}", paths.len(), dir.display());
    Ok(paths)
}
