//! Encoder log dialects and content-based detection.
//!
//! Every supported tool family is described by a [`Grammar`] entry: its
//! detection signature, the token that marks the QP in filenames, the
//! separator between name segments and the shape of its summary and
//! per-frame reports. One generic engine in [`crate::extract`] interprets
//! these entries, so adding a dialect means adding a table row.
//!
//! ## Detection order
//!
//! Signatures are not mutually exclusive: a 360Lib log is also an HM log.
//! [`Dialect::all`] lists dialects in priority order and [`Dialect::detect`]
//! returns the first one whose signature matches.

mod patterns;

use serde::{Deserialize, Serialize};

pub(crate) use patterns::{compiled, shared};

/// One of the recognized encoder-log text formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    /// HM with 360Lib, reporting viewport PSNR (`Y-PSNR_VP0`).
    Hm360Lib,
    /// Older 360Lib builds announcing a 360 video parameter block.
    Hm360LibOld,
    /// SHM scalable HEVC encoder, summaries reported per layer.
    Shm,
    /// HM reference HEVC encoder.
    Hm,
}

/// How rows of a summary block are labelled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowLabel {
    /// Rows take the label of the enclosing section title (`SUMMARY`, `I`, ...).
    Section,
    /// Rows carry their own layer token (`L0`, `L1`, ...).
    Layer,
}

/// Data description of a dialect.
#[derive(Debug, Clone, Copy)]
pub struct Grammar {
    /// Regex matched against the whole file text (multi-line mode).
    pub signature: &'static str,
    /// Literal token preceding the QP digits in filenames.
    pub qp_marker: &'static str,
    /// Separator joining config and sequence segments in filenames.
    pub separator: char,
    /// Labelling of summary rows.
    pub row_label: RowLabel,
    /// Per-frame distortion channels as (metric name, label token).
    pub channels: [(&'static str, &'static str); 3],
}

const PSNR_CHANNELS: [(&str, &str); 3] = [("Y-PSNR", "Y"), ("U-PSNR", "U"), ("V-PSNR", "V")];

// Indexed by `Dialect::index`.
static GRAMMARS: [Grammar; 4] = [
    Grammar {
        signature: r"Y-PSNR_VP0",
        qp_marker: "_QP",
        separator: '-',
        row_label: RowLabel::Section,
        channels: PSNR_CHANNELS,
    },
    Grammar {
        signature: r"^-----360\svideo\sparameters----",
        qp_marker: "_QP",
        separator: '-',
        row_label: RowLabel::Section,
        channels: PSNR_CHANNELS,
    },
    Grammar {
        signature: r"^SHM\ssoftware",
        qp_marker: "_QPL10",
        separator: '-',
        row_label: RowLabel::Layer,
        channels: PSNR_CHANNELS,
    },
    Grammar {
        signature: r"^HM\ssoftware",
        qp_marker: "_QP",
        separator: '-',
        row_label: RowLabel::Section,
        channels: PSNR_CHANNELS,
    },
];

impl Dialect {
    /// All dialects in detection priority order.
    #[must_use]
    pub fn all() -> &'static [Self] {
        &[Self::Hm360Lib, Self::Hm360LibOld, Self::Shm, Self::Hm]
    }

    /// Detect the dialect of a log from its text. First matching signature wins.
    #[must_use]
    pub fn detect(text: &str) -> Option<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|dialect| compiled(*dialect).signature.is_match(text))
    }

    /// The grammar describing this dialect.
    #[must_use]
    pub fn grammar(self) -> &'static Grammar {
        &GRAMMARS[self.index()]
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Self::Hm360Lib => 0,
            Self::Hm360LibOld => 1,
            Self::Shm => 2,
            Self::Hm => 3,
        }
    }

    /// Parse from string (case-insensitive).
    #[must_use]
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "hm360lib" | "hm_360lib" | "360lib" => Some(Self::Hm360Lib),
            "hm360libold" | "hm_360lib_old" | "360lib_old" => Some(Self::Hm360LibOld),
            "shm" => Some(Self::Shm),
            "hm" => Some(Self::Hm),
            _ => None,
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hm360Lib => write!(f, "hm_360lib"),
            Self::Hm360LibOld => write!(f, "hm_360lib_old"),
            Self::Shm => write!(f, "shm"),
            Self::Hm => write!(f, "hm"),
        }
    }
}

impl std::str::FromStr for Dialect {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::from_str_loose(s).ok_or_else(|| format!("Unknown dialect: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_plain_hm() {
        let text = "\nHM software: Encoder Version [16.20] (including RExt)\n";
        assert_eq!(Dialect::detect(text), Some(Dialect::Hm));
    }

    #[test]
    fn test_detect_shm() {
        let text = "SHM software: Encoder Version [12.4]\n";
        assert_eq!(Dialect::detect(text), Some(Dialect::Shm));
    }

    #[test]
    fn test_360_signature_wins_over_base_codec() {
        let text = "HM software: Encoder Version [16.16]\n\
                    \tTotal Frames |   Bitrate     Y-PSNR    Y-PSNR_VP0\n";
        assert_eq!(Dialect::detect(text), Some(Dialect::Hm360Lib));

        let old = "HM software: Encoder Version [16.14]\n-----360 video parameters----\n";
        assert_eq!(Dialect::detect(old), Some(Dialect::Hm360LibOld));
    }

    #[test]
    fn test_signature_anchored_to_line_start() {
        // "HM software" only counts at the start of a line
        let text = "built with SHM software tooling\nnothing else\n";
        assert_eq!(Dialect::detect(text), None);
    }

    #[test]
    fn test_unknown_text() {
        assert_eq!(Dialect::detect("x264 [info]: frame I:1"), None);
        assert_eq!(Dialect::detect(""), None);
    }

    #[test]
    fn test_dialect_roundtrip() {
        for dialect in Dialect::all() {
            let parsed: Dialect = dialect.to_string().parse().unwrap();
            assert_eq!(*dialect, parsed);
        }
    }

    #[test]
    fn test_grammar_table_order_matches_index() {
        assert_eq!(Dialect::Shm.grammar().qp_marker, "_QPL10");
        assert_eq!(Dialect::Shm.grammar().row_label, RowLabel::Layer);
        assert_eq!(Dialect::Hm.grammar().qp_marker, "_QP");
        assert!(Dialect::Hm360Lib.grammar().signature.contains("VP0"));
    }
}
