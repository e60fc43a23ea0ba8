//! Parsed representation of one encoder log.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::dialect::Dialect;
use crate::error::{Error, Result};
use crate::extract::{SummaryData, TemporalData, extract_summary, extract_temporal};
use crate::identity::{Identity, normalize_lexically, resolve_identity};

/// Immutable parsed encoder log.
///
/// Two records are equal iff their paths are equal; content is not compared.
#[derive(Debug, Clone, Serialize)]
pub struct LogRecord {
    path: PathBuf,
    dialect: Dialect,
    sequence: String,
    config: String,
    qp: String,
    summary_data: SummaryData,
    temporal_data: TemporalData,
    skipped_frames: usize,
}

impl LogRecord {
    /// Read and parse the log at `path`.
    ///
    /// The path is canonicalized, so the file must exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = std::fs::canonicalize(path.as_ref())?;
        let bytes = std::fs::read(&path)?;
        Self::parse(path, &decode_text(bytes))
    }

    /// Parse log text that was read from `path`.
    ///
    /// The path is made absolute and its `.`/`..` components are resolved
    /// lexically, without touching the filesystem.
    pub fn from_text(path: impl AsRef<Path>, text: &str) -> Result<Self> {
        let path = normalize_lexically(&std::path::absolute(path.as_ref())?);
        Self::parse(path, text)
    }

    fn parse(path: PathBuf, text: &str) -> Result<Self> {
        let dialect = Dialect::detect(text).ok_or_else(|| Error::UnknownDialect { path: path.clone() })?;
        let Identity { sequence, config, qp } = resolve_identity(&path, dialect)?;

        let summary_data = extract_summary(text, dialect);
        let temporal = extract_temporal(text, dialect);

        if temporal.skipped > 0 {
            tracing::warn!(
                "{}: skipped {} of {} per-frame reports",
                path.display(),
                temporal.skipped,
                temporal.skipped + temporal.matched
            );
        }
        tracing::debug!(
            "Parsed {} as {}: {} summary groups, {} frames",
            path.display(),
            dialect,
            summary_data.len(),
            temporal.matched
        );

        let mut temporal_data = TemporalData::new();
        temporal_data.insert(qp.clone(), temporal.series);

        Ok(Self {
            path,
            dialect,
            sequence,
            config,
            qp,
            summary_data,
            temporal_data,
            skipped_frames: temporal.skipped,
        })
    }

    /// Absolute path, the unique identifier of the record.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Dialect the log was parsed with.
    #[must_use]
    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Encoded test sequence.
    #[must_use]
    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    /// Simulation directory and encoder configuration.
    #[must_use]
    pub fn config(&self) -> &str {
        &self.config
    }

    /// Quantization parameter.
    #[must_use]
    pub fn qp(&self) -> &str {
        &self.qp
    }

    /// Owned copy of the (sequence, config, qp) identity.
    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            sequence: self.sequence.clone(),
            config: self.config.clone(),
            qp: self.qp.clone(),
        }
    }

    /// Per-frame-type `(bitrate, value)` series.
    #[must_use]
    pub fn summary_data(&self) -> &SummaryData {
        &self.summary_data
    }

    /// Per-frame series keyed by this record's QP.
    #[must_use]
    pub fn temporal_data(&self) -> &TemporalData {
        &self.temporal_data
    }

    /// Per-frame report lines that did not match the dialect's pattern.
    #[must_use]
    pub fn skipped_frames(&self) -> usize {
        self.skipped_frames
    }

    /// Fail with [`Error::EmptySummary`] if no summary block was found.
    pub fn require_summary(&self) -> Result<&SummaryData> {
        if self.summary_data.is_empty() {
            return Err(Error::EmptySummary { path: self.path.clone() });
        }
        Ok(&self.summary_data)
    }
}

impl PartialEq for LogRecord {
    fn eq(&self, other: &Self) -> bool {
        self.path == other.path
    }
}

impl Eq for LogRecord {}

impl Hash for LogRecord {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.path.hash(state);
    }
}

impl AsRef<Path> for LogRecord {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

impl fmt::Display for LogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Encoder log of sequence '{}' from config '{}' with qp '{}' at path {}",
            self.sequence,
            self.config,
            self.qp,
            self.path.display()
        )
    }
}

/// Decode log bytes as UTF-8, falling back to a single-byte mapping.
fn decode_text(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes)
        .unwrap_or_else(|err| err.into_bytes().into_iter().map(char::from).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::extract::FRAMES;

    pub(crate) const HM_LOG: &str = "\
HM software: Encoder Version [16.20] (including RExt)[Linux][GCC 7.5.0][64 bit]

POC    0 TId: 0 ( I-SLICE, nQP 32 QP 32 )     181264 bits [Y 39.2150 dB    U 41.3411 dB    V 42.4517 dB] [ET     3 ]
POC    8 TId: 0 ( B-SLICE, nQP 33 QP 33 )      18856 bits [Y 36.7917 dB    U 40.2052 dB    V 41.1010 dB] [ET    12 ]

SUMMARY --------------------------------------------------------
\tTotal Frames |   Bitrate     Y-PSNR    U-PSNR    V-PSNR    YUV-PSNR
\t        2    a    2091.9224   37.2036   40.6142   41.6213   38.2745

I Slices--------------------------------------------------------
\tTotal Frames |   Bitrate     Y-PSNR    U-PSNR    V-PSNR    YUV-PSNR
\t        1    i    5212.4960   39.0779   41.6214   42.6123   39.9413
";

    /// Build a record for `/sims/<run>/log/<config>-<sequence>_QP<qp>_enc.log`.
    pub(crate) fn record(run: &str, config: &str, sequence: &str, qp: u32) -> LogRecord {
        let path = format!("/sims/{run}/log/{config}-{sequence}_QP{qp}_enc.log");
        LogRecord::from_text(path, HM_LOG).unwrap()
    }

    #[test]
    fn test_from_text() {
        let rec = record("run7", "Campaign", "ClassA", 32);
        assert_eq!(rec.dialect(), Dialect::Hm);
        assert_eq!(rec.sequence(), "ClassA");
        assert_eq!(rec.config(), "run7 Campaign");
        assert_eq!(rec.qp(), "32");
        assert_eq!(rec.summary_data()["I"]["Y-PSNR"], vec![(5212.4960, 39.0779)]);
        assert_eq!(rec.skipped_frames(), 0);
    }

    #[test]
    fn test_temporal_keyed_by_qp() {
        let rec = record("run1", "cfg", "Seq", 27);
        assert_eq!(rec.temporal_data().len(), 1);
        assert_eq!(rec.temporal_data()["27"][FRAMES], vec![(0, 0.0), (1, 8.0)]);
    }

    #[test]
    fn test_equality_is_path_identity() {
        let a = record("run1", "cfg", "Seq", 22);
        let b = LogRecord::from_text("/sims/run1/log/cfg-Seq_QP22_enc.log", &HM_LOG.replace("37.2036", "30.0")).unwrap();
        let c = record("run2", "cfg", "Seq", 22);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_from_text_normalizes_path() {
        let plain = record("run1", "cfg", "Seq", 22);
        let dotted = LogRecord::from_text("/sims/run1/log/../log/./cfg-Seq_QP22_enc.log", HM_LOG).unwrap();
        assert_eq!(dotted.path(), Path::new("/sims/run1/log/cfg-Seq_QP22_enc.log"));
        assert_eq!(dotted, plain);
        assert_eq!(dotted.identity(), plain.identity());
    }

    #[test]
    fn test_unknown_dialect() {
        let err = LogRecord::from_text("/sims/run1/log/cfg-Seq_QP22_enc.log", "x265 [info]: HEVC encoder").unwrap_err();
        assert!(matches!(err, Error::UnknownDialect { .. }));
    }

    #[test]
    fn test_require_summary() {
        let text = "HM software: Encoder Version [16.20]\n";
        let rec = LogRecord::from_text("/sims/run1/log/cfg-Seq_QP22_enc.log", text).unwrap();
        assert!(rec.summary_data().is_empty());
        assert!(matches!(rec.require_summary(), Err(Error::EmptySummary { .. })));
        assert!(record("run1", "cfg", "Seq", 22).require_summary().is_ok());
    }

    #[test]
    fn test_open_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("run3").join("log");
        std::fs::create_dir_all(&log_dir).unwrap();
        let file = log_dir.join("lowdelay-Johnny_QP37_enc.log");
        std::fs::write(&file, HM_LOG).unwrap();

        let rec = LogRecord::open(&file).unwrap();
        assert!(rec.path().is_absolute());
        assert_eq!(rec.config(), "run3 lowdelay");
        assert_eq!(rec.qp(), "37");
    }

    #[test]
    fn test_latin1_fallback() {
        let mut bytes = HM_LOG.as_bytes().to_vec();
        bytes.extend_from_slice(b"Input File : /data/s\xe9quence.yuv\n");
        let text = decode_text(bytes);
        assert!(text.contains("s\u{e9}quence"));
        assert!(Dialect::detect(&text).is_some());
    }

    #[test]
    fn test_display() {
        let rec = record("run1", "cfg", "Seq", 22);
        let shown = rec.to_string();
        assert!(shown.starts_with("Encoder log of sequence 'Seq' from config 'run1 cfg' with qp '22'"));
    }
}
