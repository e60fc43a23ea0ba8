//! Error types for enclog operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for enclog operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing encoder logs or querying the tree.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// No registered dialect signature matched the file content.
    #[error("Unknown log dialect: {}", path.display())]
    UnknownDialect {
        /// Path of the unrecognized file.
        path: PathBuf,
    },

    /// The path has too few directory components to recover a simulation directory.
    #[error("Path {} can not be split into <simulation-dir>/log/<filename>", path.display())]
    MalformedPath {
        /// Offending path.
        path: PathBuf,
    },

    /// The filename can not be split into config and sequence.
    #[error("Filename {filename} can not be split into config and sequence on '{separator}'")]
    MalformedFilename {
        /// Offending filename.
        filename: String,
        /// Separator expected between name segments.
        separator: char,
    },

    /// The filename carries no QP value after the dialect's marker.
    #[error("Filename {filename} does not contain a valid qp after '{marker}'")]
    MissingQp {
        /// Offending filename.
        filename: String,
        /// QP marker token of the dialect.
        marker: String,
    },

    /// Two distinct files resolve to the same (sequence, config, qp).
    #[error(
        "Ambiguous encoder logs: {} and {} have the same sequence '{sequence}', config '{config}' and qp '{qp}'",
        existing.display(),
        incoming.display()
    )]
    AmbiguousIdentity {
        /// Path already stored under the key.
        existing: PathBuf,
        /// Path that was rejected.
        incoming: PathBuf,
        /// Sequence key.
        sequence: String,
        /// Config key.
        config: String,
        /// QP key.
        qp: String,
    },

    /// A lookup missed.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Tree traversal went deeper than the fixed schema allows.
    #[error("Maximal tree depth {max} exceeded")]
    DepthExceeded {
        /// Configured maximum depth.
        max: usize,
    },

    /// Summary extraction produced nothing where a summary was required.
    #[error("No summary data in {}", path.display())]
    EmptySummary {
        /// Path of the file.
        path: PathBuf,
    },

    /// A scan request produced no candidate log files.
    #[error("Could not find encoder logs at {}", url.display())]
    NoLogsFound {
        /// Requested location.
        url: PathBuf,
    },

    /// I/O error wrapper.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The parsing worker pool could not be started.
    #[error("Worker pool error: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl Error {
    /// Whether this error belongs to a single file and must not abort a batch.
    #[must_use]
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            Self::UnknownDialect { .. }
                | Self::MalformedPath { .. }
                | Self::MalformedFilename { .. }
                | Self::MissingQp { .. }
                | Self::EmptySummary { .. }
                | Self::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_file_classification() {
        let unknown = Error::UnknownDialect { path: PathBuf::from("/a/log/x_enc.log") };
        assert!(unknown.is_per_file());

        let missing = Error::MissingQp { filename: "x_enc.log".into(), marker: "_QP".into() };
        assert!(missing.is_per_file());

        assert!(!Error::NotFound("seq".into()).is_per_file());
        assert!(!Error::DepthExceeded { max: 3 }.is_per_file());
    }

    #[test]
    fn test_ambiguous_message_names_both_paths() {
        let err = Error::AmbiguousIdentity {
            existing: PathBuf::from("/a/run1/log/c-s_QP22_enc.log"),
            incoming: PathBuf::from("/b/run1/log/c-s_QP22_enc.log"),
            sequence: "s".into(),
            config: "run1 c".into(),
            qp: "22".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/a/run1/log"));
        assert!(msg.contains("/b/run1/log"));
        assert!(msg.contains("qp '22'"));
    }
}
