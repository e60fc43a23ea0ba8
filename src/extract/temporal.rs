//! Per-frame report extraction.
//!
//! Each encoded picture is reported on one line:
//!
//! ```text
//! POC    8 TId: 0 ( B-SLICE, nQP 33 QP 33 )      18856 bits [Y 36.7917 dB    U 40.2052 dB    V 41.1010 dB] [ET    12 ]
//! ```
//!
//! Frames are indexed by emission order, not by POC: POC values are neither
//! contiguous nor monotonic across dialects.

use crate::dialect::{Dialect, compiled, shared};
use crate::extract::{BITS, FRAMES, TemporalSeries};

/// Per-frame series together with match diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemporalExtraction {
    /// Metric name to `(frame index, value)` pairs in file order.
    pub series: TemporalSeries,
    /// Report lines that matched the full pattern.
    pub matched: usize,
    /// Lines that started a report but did not match the full pattern.
    pub skipped: usize,
}

/// Extract per-frame data from log text.
///
/// Partial report lines are skipped without producing partial records;
/// their count is returned in [`TemporalExtraction::skipped`].
#[must_use]
pub fn extract_temporal(text: &str, dialect: Dialect) -> TemporalExtraction {
    let grammar = dialect.grammar();
    let frame = &compiled(dialect).frame;
    let candidate = &shared().frame_candidate;

    let names: Vec<&str> = [FRAMES, BITS]
        .into_iter()
        .chain(grammar.channels.iter().map(|(name, _)| *name))
        .collect();

    let mut extraction = TemporalExtraction {
        series: names.iter().map(|name| ((*name).to_string(), Vec::new())).collect(),
        ..TemporalExtraction::default()
    };

    for line in text.lines() {
        if !candidate.is_match(line) {
            continue;
        }

        let values: Option<Vec<f64>> = frame.captures(line).and_then(|caps| {
            caps.iter()
                .skip(1)
                .map(|group| group.and_then(|m| m.as_str().parse().ok()))
                .collect()
        });

        let Some(values) = values else {
            extraction.skipped += 1;
            continue;
        };

        let index = extraction.matched;
        for (name, value) in names.iter().zip(values) {
            if let Some(series) = extraction.series.get_mut(*name) {
                series.push((index, value));
            }
        }
        extraction.matched += 1;
    }

    extraction
}
