//! Summary block extraction.
//!
//! A summary block is a section title, a header line listing metric names
//! to the right of `|`, and one or more value rows:
//!
//! ```text
//! I Slices--------------------------------------------------------
//!         Total Frames |   Bitrate     Y-PSNR    U-PSNR    V-PSNR    YUV-PSNR
//!                 3    i    5212.4960   39.0779   41.6214   42.6123   39.9413
//! ```
//!
//! Layered dialects prefix each row with a layer token (`L0`, `L1`) which
//! replaces the section title as the group label.

use crate::dialect::{Dialect, RowLabel, compiled, shared};
use crate::extract::{BITRATE, SummaryData};

/// Extract per-frame-type summary data from log text.
///
/// Repeated frame-type groups accumulate in encounter order. Rows whose value
/// count does not match the header are skipped. A text without summary
/// blocks yields an empty map.
#[must_use]
pub fn extract_summary(text: &str, dialect: Dialect) -> SummaryData {
    let grammar = dialect.grammar();
    let patterns = compiled(dialect);
    let section = &shared().section;

    let mut data = SummaryData::new();
    let mut label: Option<String> = None;
    let mut names: Option<Vec<String>> = None;

    for line in text.lines() {
        if let Some(caps) = section.captures(line) {
            label = Some(caps[1].to_string());
            names = None;
            continue;
        }

        let Some(section_label) = label.as_deref() else {
            continue;
        };

        let Some(header) = names.as_ref() else {
            if let Some((_, right)) = line.rsplit_once('|') {
                names = Some(right.split_whitespace().map(String::from).collect());
            }
            continue;
        };

        let Some(caps) = patterns.value_row.captures(line) else {
            continue;
        };

        let Some(values) = parse_values(&caps["values"], header.len()) else {
            continue;
        };

        let group = match grammar.row_label {
            RowLabel::Section => section_label.to_string(),
            RowLabel::Layer => format!("L{}", &caps["layer"]),
        };

        push_row(&mut data, group, header, &values);
    }

    data
}

fn parse_values(raw: &str, expected: usize) -> Option<Vec<f64>> {
    let values: Vec<f64> = raw
        .split_whitespace()
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    (values.len() == expected).then_some(values)
}

fn push_row(data: &mut SummaryData, group: String, names: &[String], values: &[f64]) {
    let Some(rate_idx) = names.iter().position(|name| name == BITRATE) else {
        return;
    };
    let rate = values[rate_idx];

    let series = data.entry(group).or_default();
    for (idx, name) in names.iter().enumerate() {
        if idx == rate_idx {
            continue;
        }
        series.entry(name.clone()).or_default().push((rate, values[idx]));
    }
}
