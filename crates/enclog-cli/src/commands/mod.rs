pub mod merge;
pub mod scan;

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use enclog::{CancellationToken, ScanConfig, Scanner, SharedTree};

/// Scan every URL into one tree, reporting per-file failures on stderr.
fn ingest(urls: &[PathBuf], config: ScanConfig, verbose: bool) -> Result<SharedTree> {
    let scanner = Scanner::new(config);
    let tree = SharedTree::new();
    let cancel = CancellationToken::new();
    let mut failed = 0;

    for url in urls {
        if verbose {
            eprintln!("Scanning: {}", url.display());
        }

        let report = scanner
            .scan_into(url, &tree, &cancel)
            .with_context(|| format!("Failed to scan {}", url.display()))?;

        for failure in &report.failures {
            eprintln!("  skipped {}: {}", failure.path.display(), failure.error);
        }
        failed += report.failures.len();

        if verbose {
            eprintln!(
                "  {} inserted, {} replaced, {} failed",
                report.inserted,
                report.replaced,
                report.failures.len()
            );
        }
    }

    if tree.is_empty() {
        bail!("No encoder log could be parsed ({} failed)", failed);
    }

    Ok(tree)
}
