//! Parallel discovery and parsing of encoder logs.
//!
//! A scan resolves a URL to candidate files, parses them on a rayon pool and
//! either collects the records ([`Scanner::scan`]) or feeds them to a single
//! coordinator that owns every tree mutation ([`Scanner::scan_into`]).
//!
//! Per-file failures never abort a scan. They are collected as
//! [`ScanFailure`]s next to the successes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use enclog::{CancellationToken, ScanConfig, Scanner, SharedTree};
//!
//! let scanner = Scanner::new(ScanConfig::builder().threads(4).build());
//! let tree = SharedTree::new();
//! let report = scanner.scan_into("sims/anchor", &tree, &CancellationToken::new())?;
//! println!("{} inserted, {} failed", report.inserted, report.failures.len());
//! ```

mod discovery;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use chrono::{DateTime, Utc};
use rayon::prelude::*;

pub use discovery::{list_logs, list_logs_for_sequence};

use crate::error::{Error, Result};
use crate::record::LogRecord;
use crate::tree::{SharedTree, Upsert};

/// Default filename suffix of encoder logs.
pub const DEFAULT_SUFFIX: &str = "_enc.log";

/// Subdirectory searched when a simulation directory holds no logs itself.
pub const LOG_SUBDIR: &str = "log";

/// Configuration for a [`Scanner`].
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// Worker threads; `None` uses the rayon default.
    pub threads: Option<usize>,

    /// Filename suffix of candidate logs.
    pub suffix: String,

    /// Retry a directory's `log` subdirectory when the directory has no logs.
    pub search_log_subdir: bool,

    /// Report logs without a summary block as failures.
    pub require_summary: bool,
}

impl ScanConfig {
    /// Create a new configuration builder.
    #[must_use]
    pub fn builder() -> ScanConfigBuilder {
        ScanConfigBuilder::default()
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Builder for [`ScanConfig`].
#[derive(Debug, Default)]
pub struct ScanConfigBuilder {
    threads: Option<usize>,
    suffix: Option<String>,
    search_log_subdir: Option<bool>,
    require_summary: Option<bool>,
}

impl ScanConfigBuilder {
    /// Set the number of worker threads.
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Set the filename suffix of candidate logs.
    #[must_use]
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Enable or disable the `log` subdirectory fallback.
    #[must_use]
    pub fn search_log_subdir(mut self, enabled: bool) -> Self {
        self.search_log_subdir = Some(enabled);
        self
    }

    /// Report logs without a summary block as [`Error::EmptySummary`].
    #[must_use]
    pub fn require_summary(mut self, enabled: bool) -> Self {
        self.require_summary = Some(enabled);
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> ScanConfig {
        ScanConfig {
            threads: self.threads,
            suffix: self.suffix.unwrap_or_else(|| DEFAULT_SUFFIX.to_string()),
            search_log_subdir: self.search_log_subdir.unwrap_or(true),
            require_summary: self.require_summary.unwrap_or(false),
        }
    }
}

/// Cooperative cancellation flag shared between a caller and a scan.
///
/// Cancelling stops new parse work and further ingestion. Records already
/// ingested stay in the tree.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// Create a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Every clone observes it.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Check if cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A file that could not be parsed or ingested.
#[derive(Debug)]
pub struct ScanFailure {
    /// Path of the file.
    pub path: PathBuf,

    /// Why it was not stored.
    pub error: Error,
}

/// Result of [`Scanner::scan`] and [`Scanner::parse_paths`].
#[derive(Debug)]
pub struct ScanReport {
    /// Parsed records in discovery order.
    pub records: Vec<LogRecord>,

    /// Per-file failures in discovery order.
    pub failures: Vec<ScanFailure>,

    /// Whether the scan stopped early.
    pub cancelled: bool,

    /// When the scan started.
    pub started: DateTime<Utc>,
}

/// Result of [`Scanner::scan_into`].
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Records stored under a previously empty key.
    pub inserted: usize,

    /// Records that replaced their path-equal predecessor.
    pub replaced: usize,

    /// Parse failures and rejected upserts, in completion order.
    pub failures: Vec<ScanFailure>,

    /// Whether ingestion stopped early.
    pub cancelled: bool,
}

impl IngestReport {
    /// Records stored in the tree by this ingestion.
    #[must_use]
    pub fn ingested(&self) -> usize {
        self.inserted + self.replaced
    }
}

/// Discovers and parses encoder logs.
#[derive(Debug, Clone, Default)]
pub struct Scanner {
    config: ScanConfig,
}

impl Scanner {
    /// Create a scanner with the given configuration.
    #[must_use]
    pub fn new(config: ScanConfig) -> Self {
        Self { config }
    }

    /// The scanner's configuration.
    #[must_use]
    pub fn config(&self) -> &ScanConfig {
        &self.config
    }

    /// Resolve a URL to candidate log files.
    ///
    /// - A directory is listed; if it holds no logs and
    ///   [`ScanConfig::search_log_subdir`] is set, its `log` subdirectory is
    ///   listed instead.
    /// - A file selects the logs of the same sequence next to it.
    ///
    /// Fails with [`Error::NoLogsFound`] when nothing matches.
    pub fn discover(&self, url: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
        let url = url.as_ref();
        let suffix = self.config.suffix.as_str();

        let paths = if url.is_dir() {
            let mut paths = list_logs(url, suffix)?;
            let subdir = url.join(LOG_SUBDIR);
            if paths.is_empty() && self.config.search_log_subdir && subdir.is_dir() {
                tracing::debug!("No logs in {}, trying {}", url.display(), subdir.display());
                paths = list_logs(&subdir, suffix)?;
            }
            paths
        } else if url.is_file() {
            list_logs_for_sequence(url, suffix)?
        } else {
            Vec::new()
        };

        if paths.is_empty() {
            return Err(Error::NoLogsFound { url: url.to_path_buf() });
        }
        Ok(paths)
    }

    /// Discover and parse every log at `url`.
    pub fn scan(&self, url: impl AsRef<Path>) -> Result<ScanReport> {
        let paths = self.discover(url)?;
        self.parse_paths(&paths, &CancellationToken::new())
    }

    /// Parse `paths` in parallel.
    ///
    /// Records and failures keep the order of `paths`. Files not yet started
    /// when `cancel` fires are left out of both.
    pub fn parse_paths(&self, paths: &[PathBuf], cancel: &CancellationToken) -> Result<ScanReport> {
        let started = Utc::now();
        let pool = self.pool()?;

        let outcomes: Vec<Option<Result<LogRecord>>> = pool.install(|| {
            paths
                .par_iter()
                .map(|path| (!cancel.is_cancelled()).then(|| self.parse_file(path)))
                .collect()
        });

        let mut report = ScanReport {
            records: Vec::with_capacity(paths.len()),
            failures: Vec::new(),
            cancelled: false,
            started,
        };

        for (path, outcome) in paths.iter().zip(outcomes) {
            match outcome {
                Some(Ok(record)) => report.records.push(record),
                Some(Err(error)) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), error);
                    report.failures.push(ScanFailure { path: path.clone(), error });
                }
                None => report.cancelled = true,
            }
        }

        tracing::info!(
            "Parsed {} of {} logs ({} failed{})",
            report.records.len(),
            paths.len(),
            report.failures.len(),
            if report.cancelled { ", cancelled" } else { "" }
        );

        Ok(report)
    }

    /// Discover logs at `url`, parse them in parallel and upsert each into
    /// `tree` from a single coordinator.
    ///
    /// Rejected upserts are reported as failures and leave the tree as it
    /// was. Cancellation stops both parsing and ingestion; records ingested
    /// before it stay.
    pub fn scan_into(
        &self,
        url: impl AsRef<Path>,
        tree: &SharedTree,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let paths = self.discover(url)?;
        let pool = self.pool()?;
        let (tx, rx) = mpsc::channel::<(PathBuf, Result<LogRecord>)>();
        let mut report = IngestReport::default();

        std::thread::scope(|scope| {
            scope.spawn(|| {
                pool.install(|| {
                    paths.par_iter().for_each_with(tx, |tx, path| {
                        if cancel.is_cancelled() {
                            return;
                        }
                        // The coordinator may have stopped listening.
                        let _ = tx.send((path.clone(), self.parse_file(path)));
                    });
                });
            });

            ingest_parsed(rx, tree, cancel, &mut report);
        });

        if cancel.is_cancelled() {
            report.cancelled = true;
        }

        tracing::info!(
            "Ingested {} of {} logs ({} inserted, {} replaced, {} failed)",
            report.ingested(),
            paths.len(),
            report.inserted,
            report.replaced,
            report.failures.len()
        );

        Ok(report)
    }

    fn parse_file(&self, path: &Path) -> Result<LogRecord> {
        let record = LogRecord::open(path)?;
        if self.config.require_summary {
            record.require_summary()?;
        }
        Ok(record)
    }

    fn pool(&self) -> Result<rayon::ThreadPool> {
        let mut builder = rayon::ThreadPoolBuilder::new();
        if let Some(threads) = self.config.threads {
            builder = builder.num_threads(threads);
        }
        Ok(builder.build()?)
    }
}

/// Coordinator loop: upsert parsed files one at a time until the input ends
/// or `cancel` fires.
fn ingest_parsed<I>(parsed: I, tree: &SharedTree, cancel: &CancellationToken, report: &mut IngestReport)
where
    I: IntoIterator<Item = (PathBuf, Result<LogRecord>)>,
{
    for (path, outcome) in parsed {
        if cancel.is_cancelled() {
            report.cancelled = true;
            break;
        }
        match outcome.and_then(|record| tree.upsert(record)) {
            Ok(Upsert::Inserted) => report.inserted += 1,
            Ok(Upsert::Replaced) => report.replaced += 1,
            Err(error) => {
                tracing::warn!("Failed to ingest {}: {}", path.display(), error);
                report.failures.push(ScanFailure { path, error });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::tests::HM_LOG;
    use crate::tree::TreeEvent;
    use std::fs;

    const SHM_LOG: &str = "\
SHM software: Encoder Version [12.4]
POC   0 LId:  0 TId: 0 ( I-SLICE, QP  22 )     308872 bits [Y 42.1380 dB    U 44.3812 dB    V 45.6230 dB]
SUMMARY --------------------------------------------------------
\tTotal Frames |   Bitrate     Y-PSNR    U-PSNR    V-PSNR    YUV-PSNR
 L0     1    a     812.3360   38.1020   41.0021   42.1140   39.0007
";

    /// `<root>/<run>/log/` with the given files.
    fn sim_dir(root: &Path, run: &str, files: &[(&str, &str)]) -> PathBuf {
        let log_dir = root.join(run).join(LOG_SUBDIR);
        fs::create_dir_all(&log_dir).unwrap();
        for (name, text) in files {
            fs::write(log_dir.join(name), text).unwrap();
        }
        root.join(run)
    }

    fn scanner() -> Scanner {
        Scanner::new(ScanConfig::builder().threads(2).build())
    }

    #[test]
    fn test_config_defaults() {
        let config = ScanConfig::default();
        assert_eq!(config.threads, None);
        assert_eq!(config.suffix, "_enc.log");
        assert!(config.search_log_subdir);
        assert!(!config.require_summary);
    }

    #[test]
    fn test_discover_falls_back_to_log_subdir() {
        let root = tempfile::tempdir().unwrap();
        let run = sim_dir(root.path(), "run1", &[("cfg-Seq_QP22_enc.log", HM_LOG)]);

        let paths = scanner().discover(&run).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("log/cfg-Seq_QP22_enc.log"));

        let strict = Scanner::new(ScanConfig::builder().search_log_subdir(false).build());
        assert!(matches!(strict.discover(&run), Err(Error::NoLogsFound { .. })));
    }

    #[test]
    fn test_discover_same_sequence_file() {
        let root = tempfile::tempdir().unwrap();
        let run = sim_dir(
            root.path(),
            "run1",
            &[
                ("cfg-Seq_QP22_enc.log", HM_LOG),
                ("cfg-Seq_QP27_enc.log", HM_LOG),
                ("cfg-Other_QP22_enc.log", HM_LOG),
            ],
        );

        let paths = scanner().discover(run.join("log/cfg-Seq_QP27_enc.log")).unwrap();
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn test_discover_nothing() {
        let root = tempfile::tempdir().unwrap();
        assert!(matches!(scanner().discover(root.path()), Err(Error::NoLogsFound { .. })));
        assert!(matches!(
            scanner().discover(root.path().join("missing")),
            Err(Error::NoLogsFound { .. })
        ));
    }

    #[test]
    fn test_scan_collects_failures_without_aborting() {
        let root = tempfile::tempdir().unwrap();
        let run = sim_dir(
            root.path(),
            "run1",
            &[
                ("cfg-Seq_QP22_enc.log", HM_LOG),
                ("cfg-Seq_QP27_enc.log", "x265 [info]: HEVC encoder version 3.5\n"),
                ("cfg-Seq_QPL1022_enc.log", SHM_LOG),
                ("cfg-Seq_QP32_enc.log", HM_LOG),
            ],
        );

        let report = scanner().scan(&run).unwrap();
        assert!(!report.cancelled);
        assert_eq!(report.records.len(), 3);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, Error::UnknownDialect { .. }));
        assert!(report.failures[0].error.is_per_file());

        let qps: Vec<&str> = report.records.iter().map(LogRecord::qp).collect();
        assert_eq!(qps, ["22", "32", "22"]);
    }

    #[test]
    fn test_require_summary() {
        let root = tempfile::tempdir().unwrap();
        let run = sim_dir(
            root.path(),
            "run1",
            &[
                ("cfg-Seq_QP22_enc.log", HM_LOG),
                ("cfg-Seq_QP27_enc.log", "HM software: Encoder Version [16.20]\n"),
            ],
        );

        assert!(scanner().scan(&run).unwrap().failures.is_empty());

        let strict = Scanner::new(ScanConfig::builder().require_summary(true).build());
        let report = strict.scan(&run).unwrap();
        assert_eq!(report.records.len(), 1);
        assert!(matches!(report.failures[0].error, Error::EmptySummary { .. }));
    }

    #[test]
    fn test_scan_into_tree() {
        let root = tempfile::tempdir().unwrap();
        let run1 = sim_dir(
            root.path(),
            "run1",
            &[("cfg-Seq_QP22_enc.log", HM_LOG), ("cfg-Seq_QP27_enc.log", HM_LOG)],
        );
        let run2 = sim_dir(root.path(), "run2", &[("cfg-Seq_QP22_enc.log", HM_LOG)]);

        let tree = SharedTree::new();
        let cancel = CancellationToken::new();

        let first = scanner().scan_into(&run1, &tree, &cancel).unwrap();
        assert_eq!(first.inserted, 2);
        assert!(first.failures.is_empty());

        let second = scanner().scan_into(&run2, &tree, &cancel).unwrap();
        assert_eq!(second.inserted, 1);

        let again = scanner().scan_into(&run1, &tree, &cancel).unwrap();
        assert_eq!(again.replaced, 2);
        assert_eq!(again.inserted, 0);

        assert_eq!(tree.len(), 3);
        let configs = tree.read().configs("Seq").unwrap().len();
        assert_eq!(configs, 2);
    }

    #[test]
    fn test_scan_into_reports_ambiguity() {
        let root = tempfile::tempdir().unwrap();
        let a = sim_dir(&root.path().join("a"), "run1", &[("cfg-Seq_QP22_enc.log", HM_LOG)]);
        let b = sim_dir(&root.path().join("b"), "run1", &[("cfg-Seq_QP22_enc.log", HM_LOG)]);

        let tree = SharedTree::new();
        let cancel = CancellationToken::new();
        scanner().scan_into(&a, &tree, &cancel).unwrap();
        let report = scanner().scan_into(&b, &tree, &cancel).unwrap();

        assert_eq!(report.ingested(), 0);
        assert!(matches!(report.failures[0].error, Error::AmbiguousIdentity { .. }));
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_cancelled_before_start() {
        let root = tempfile::tempdir().unwrap();
        let run = sim_dir(root.path(), "run1", &[("cfg-Seq_QP22_enc.log", HM_LOG)]);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let tree = SharedTree::new();
        let report = scanner().scan_into(&run, &tree, &cancel).unwrap();
        assert!(report.cancelled);
        assert!(tree.is_empty());

        let paths = scanner().discover(&run).unwrap();
        let parsed = scanner().parse_paths(&paths, &cancel).unwrap();
        assert!(parsed.cancelled);
        assert!(parsed.records.is_empty());
        assert!(parsed.failures.is_empty());
    }

    #[test]
    fn test_cancelled_during_ingestion() {
        let tree = SharedTree::new();
        let events = tree.subscribe();
        let cancel = CancellationToken::new();

        let parsed = (22..26).map(|qp| {
            let path = PathBuf::from(format!("/sims/run1/log/cfg-Seq_QP{qp}_enc.log"));
            let record = LogRecord::from_text(&path, HM_LOG);
            (path, record)
        });
        // Cancel as soon as the first insert is observed.
        let observed = parsed.inspect(|_| {
            if matches!(events.try_recv(), Ok(TreeEvent::Inserted(_))) {
                cancel.cancel();
            }
        });

        let mut report = IngestReport::default();
        ingest_parsed(observed, &tree, &cancel, &mut report);

        assert!(report.cancelled);
        assert_eq!(report.inserted, 1);
        assert!(report.failures.is_empty());
        assert_eq!(tree.len(), 1);
        assert!(tree.get_by_keys("Seq", "run1 cfg", "22").is_ok());
    }
}
