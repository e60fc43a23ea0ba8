//! Rate-distortion extraction from encoder log text.
//!
//! Both extractors are pure functions of the text and the dialect's
//! [`Grammar`](crate::dialect::Grammar), so files can be processed on any
//! worker thread.
//!
//! - [`extract_summary`]: aggregate per-frame-type `(bitrate, value)` pairs
//! - [`extract_temporal`]: per-frame `(frame index, value)` sequences

mod summary;
mod temporal;

use std::collections::BTreeMap;

pub use summary::extract_summary;
pub use temporal::{TemporalExtraction, extract_temporal};

/// Metric name to ordered `(bitrate, value)` pairs.
pub type RateSeries = BTreeMap<String, Vec<(f64, f64)>>;

/// Frame-type label to its rate series.
pub type SummaryData = BTreeMap<String, RateSeries>;

/// Metric name to ordered `(frame index, value)` pairs.
pub type TemporalSeries = BTreeMap<String, Vec<(usize, f64)>>;

/// QP to the temporal series of the log encoded at that QP.
pub type TemporalData = BTreeMap<String, TemporalSeries>;

/// Name of the rate column every other summary metric is paired with.
pub const BITRATE: &str = "Bitrate";

/// Temporal metric carrying the picture order count of each frame.
pub const FRAMES: &str = "Frames";

/// Temporal metric carrying the bit count of each frame.
pub const BITS: &str = "Bits";
