//! Sequence, config and QP identity derived from a log's path.
//!
//! Logs are expected at `.../<simulation-dir>/log/<filename>` where the
//! filename reads `<config segments>-<sequence><qp marker><digits>_...`.
//! The simulation directory is prepended to the config so configs reused
//! across batch runs stay distinguishable.

use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::dialect::{Dialect, compiled};
use crate::error::{Error, Result};

/// Logical identity of a log inside the aggregation tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Encoded test sequence.
    pub sequence: String,
    /// Simulation directory followed by the encoder configuration.
    pub config: String,
    /// Quantization parameter digits.
    pub qp: String,
}

/// Resolve the identity of a log path under the naming convention of `dialect`.
pub fn resolve_identity(path: &Path, dialect: Dialect) -> Result<Identity> {
    let grammar = dialect.grammar();
    let malformed = || Error::MalformedPath { path: path.to_path_buf() };

    let path = normalize_lexically(path);

    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .ok_or_else(malformed)?;

    let directories: Vec<String> = path
        .parent()
        .map(|parent| {
            parent
                .components()
                .filter_map(|component| match component {
                    Component::Normal(name) => Some(name.to_string_lossy().into_owned()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default();

    // The simulation directory sits above the `log` directory.
    if directories.len() < 2 {
        return Err(malformed());
    }
    let simulation_dir = &directories[directories.len() - 2];

    let head = filename.split(grammar.qp_marker).next().unwrap_or_default();
    let segments: Vec<&str> = head.split(grammar.separator).collect();
    let Some((sequence, config_segments)) = segments.split_last() else {
        return Err(malformed_filename(&filename, grammar.separator));
    };
    if config_segments.is_empty() {
        return Err(malformed_filename(&filename, grammar.separator));
    }
    let config = config_segments.join(&grammar.separator.to_string());

    let qp = compiled(dialect)
        .qp
        .captures(&filename)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| Error::MissingQp {
            filename: filename.clone(),
            marker: grammar.qp_marker.to_string(),
        })?;

    Ok(Identity {
        sequence: (*sequence).to_string(),
        config: format!("{simulation_dir} {config}"),
        qp,
    })
}

/// Resolve `.` and `..` components without touching the filesystem.
///
/// `..` at the root stays at the root; leading `..` of a relative path is kept.
pub(crate) fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other),
        }
    }
    normalized
}

fn malformed_filename(filename: &str, separator: char) -> Error {
    Error::MalformedFilename {
        filename: filename.to_string(),
        separator,
    }
}
