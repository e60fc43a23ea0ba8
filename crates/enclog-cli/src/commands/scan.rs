//! Scan command.

use std::path::PathBuf;

use anyhow::{Context, Result};
use enclog::{LogRecord, ScanConfig};

pub fn run(urls: &[PathBuf], config: ScanConfig, json: bool, verbose: bool) -> Result<()> {
    let tree = super::ingest(urls, config, verbose)?;
    let tree = tree.read();

    if json {
        let records = tree.records()?;
        let records: Vec<&LogRecord> = records.iter().map(|record| &**record).collect();
        let out = serde_json::to_string_pretty(&records).context("Failed to serialize records")?;
        println!("{out}");
        return Ok(());
    }

    println!("Encoder logs: {}", tree.len());
    println!();

    for sequence in tree.sequences() {
        println!("{sequence}");
        for config in tree.configs(sequence)? {
            println!("  {config}");
            for record in tree.get_by_config(sequence, config)? {
                let frames = record
                    .temporal_data()
                    .get(record.qp())
                    .and_then(|series| series.get(enclog::extract::FRAMES))
                    .map_or(0, Vec::len);
                println!(
                    "    QP {:>3}  {:<14} {:>2} summary groups  {:>4} frames",
                    record.qp(),
                    record.dialect().to_string(),
                    record.summary_data().len(),
                    frames
                );
            }
        }
    }

    Ok(())
}
