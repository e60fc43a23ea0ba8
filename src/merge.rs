//! Cross-run merging of summary data.
//!
//! Records sharing a (sequence, config) pair are folded into one series set so
//! several runs of the same configuration can be compared as a single curve.

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

use crate::extract::SummaryData;
use crate::record::LogRecord;

/// Merge key: a sequence encoded with one configuration.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeriesKey {
    /// Encoded test sequence.
    pub sequence: String,
    /// Simulation directory followed by the encoder configuration.
    pub config: String,
}

impl SeriesKey {
    /// Create a key from its parts.
    #[must_use]
    pub fn new(sequence: impl Into<String>, config: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            config: config.into(),
        }
    }
}

impl fmt::Display for SeriesKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.sequence, self.config)
    }
}

/// Summary data concatenated across records, keyed by (sequence, config).
///
/// Value lists keep the order in which records were merged. They are neither
/// sorted nor deduplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedSeries {
    series: BTreeMap<SeriesKey, SummaryData>,
}

impl MergedSeries {
    /// Merged summary for one (sequence, config) pair.
    #[must_use]
    pub fn get(&self, sequence: &str, config: &str) -> Option<&SummaryData> {
        self.series.get(&SeriesKey::new(sequence, config))
    }

    /// Entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&SeriesKey, &SummaryData)> {
        self.series.iter()
    }

    /// Keys in order of sequence, then config.
    pub fn keys(&self) -> impl Iterator<Item = &SeriesKey> {
        self.series.keys()
    }

    /// Number of (sequence, config) pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.series.len()
    }

    /// Check if nothing was merged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    fn append(&mut self, record: &LogRecord) {
        let merged = self
            .series
            .entry(SeriesKey::new(record.sequence(), record.config()))
            .or_default();

        for (frame_type, metrics) in record.summary_data() {
            let target = merged.entry(frame_type.clone()).or_default();
            for (metric, values) in metrics {
                target.entry(metric.clone()).or_default().extend_from_slice(values);
            }
        }
    }
}

// Struct keys are not valid JSON object keys, so entries are written as a list.
impl Serialize for MergedSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Entry<'a> {
            sequence: &'a str,
            config: &'a str,
            summary: &'a SummaryData,
        }

        serializer.collect_seq(self.series.iter().map(|(key, summary)| Entry {
            sequence: &key.sequence,
            config: &key.config,
            summary,
        }))
    }
}

impl<'a> IntoIterator for &'a MergedSeries {
    type Item = (&'a SeriesKey, &'a SummaryData);
    type IntoIter = std::collections::btree_map::Iter<'a, SeriesKey, SummaryData>;

    fn into_iter(self) -> Self::IntoIter {
        self.series.iter()
    }
}

/// Merge the summary data of `records` by (sequence, config).
///
/// For every (frame type, metric) the value lists of all contributing records
/// are concatenated in iteration order. The inputs are not modified.
pub fn merge_records<I>(records: I) -> MergedSeries
where
    I: IntoIterator,
    I::Item: Borrow<LogRecord>,
{
    let mut merged = MergedSeries::default();
    for record in records {
        merged.append(record.borrow());
    }
    merged
}
