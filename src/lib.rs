//! # enclog
//!
//! Ingestion of video-encoder log files for rate-distortion analysis.
//!
//! Encoder logs from several reference-encoder families are recognized by
//! their content, named by their location on disk and reduced to numeric
//! series: per-frame-type summaries paired with bitrate, and per-frame
//! temporal data. Parsed logs are assembled into a three-level tree keyed by
//! sequence, config and QP, which rejects two files claiming the same key.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use enclog::{AggregationTree, Scanner, ScanConfig};
//!
//! let scanner = Scanner::new(ScanConfig::builder().threads(8).build());
//! let report = scanner.scan("sims/anchor")?;
//!
//! let mut tree = AggregationTree::new();
//! tree.update(report.records)?;
//!
//! let merged = tree.merged_series()?;
//! for (key, summary) in &merged {
//!     println!("{key}: {} frame types", summary.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`dialect`]: Log dialects and their grammars
//! - [`identity`]: Sequence/config/QP from file paths
//! - [`extract`]: Summary and temporal data extraction
//! - [`record`]: Parsed log records
//! - [`scan`]: Directory scanning and parallel ingestion
//! - [`tree`]: Aggregation tree with collision checking
//! - [`merge`]: Cross-run merging of summary data
//! - [`error`]: Error types for the library

pub mod dialect;
pub mod error;
pub mod extract;
pub mod identity;
pub mod merge;
pub mod record;
pub mod scan;
pub mod tree;

// Re-export commonly used types
pub use dialect::Dialect;
pub use error::{Error, Result};
pub use extract::{SummaryData, TemporalData, TemporalExtraction, extract_summary, extract_temporal};
pub use identity::{Identity, resolve_identity};
pub use merge::{MergedSeries, SeriesKey, merge_records};
pub use record::LogRecord;
pub use scan::{CancellationToken, IngestReport, ScanConfig, ScanFailure, ScanReport, Scanner};
pub use tree::{AggregationTree, SharedTree, TreeEvent, Upsert};
