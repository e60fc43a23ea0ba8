//! Cross-run merge command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use enclog::{MergedSeries, ScanConfig};

pub fn run(
    urls: &[PathBuf],
    config: ScanConfig,
    output: Option<PathBuf>,
    csv_path: Option<PathBuf>,
    verbose: bool,
) -> Result<()> {
    let tree = super::ingest(urls, config, verbose)?;
    let merged = tree.read().merged_series()?;

    if verbose {
        eprintln!("Merged {} records into {} series", tree.len(), merged.len());
    }

    let json = serde_json::to_string_pretty(&merged).context("Failed to serialize merged series")?;
    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("Wrote {} series to {}", merged.len(), path.display());
        }
        None => println!("{json}"),
    }

    if let Some(path) = csv_path {
        let rows = write_csv(&merged, &path)
            .with_context(|| format!("Failed to write CSV to {}", path.display()))?;
        println!("Wrote {} rows to {}", rows, path.display());
    }

    Ok(())
}

fn write_csv(merged: &MergedSeries, path: &Path) -> Result<usize> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record(["sequence", "config", "frame_type", "metric", "bitrate", "value"])?;

    let mut rows = 0;
    for (key, summary) in merged {
        for (frame_type, metrics) in summary {
            for (metric, points) in metrics {
                for (rate, value) in points {
                    let rate = format!("{rate:.4}");
                    let value = format!("{value:.4}");
                    wtr.write_record([
                        key.sequence.as_str(),
                        key.config.as_str(),
                        frame_type.as_str(),
                        metric.as_str(),
                        rate.as_str(),
                        value.as_str(),
                    ])?;
                    rows += 1;
                }
            }
        }
    }

    wtr.flush()?;
    Ok(rows)
}
