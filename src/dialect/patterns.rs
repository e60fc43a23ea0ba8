//! Compiled regular expressions for each grammar entry.

use std::sync::OnceLock;

use regex::Regex;

use super::{Dialect, Grammar, RowLabel};

/// Patterns compiled from one [`Grammar`].
pub(crate) struct CompiledGrammar {
    pub signature: Regex,
    /// QP marker, digits, trailing `_`.
    pub qp: Regex,
    /// Summary value row; named groups `layer` (layer rows only) and `values`.
    pub value_row: Regex,
    /// Full per-frame report; groups: poc, bits, then one per channel.
    pub frame: Regex,
}

impl CompiledGrammar {
    fn new(grammar: &Grammar) -> Self {
        let value_row = match grammar.row_label {
            RowLabel::Section => r"^\s*\d+\s+[A-Za-z]\s+(?P<values>.+?)\s*$",
            RowLabel::Layer => r"^\s*L(?P<layer>\d+)\s+\d+\s+[A-Za-z]\s+(?P<values>.+?)\s*$",
        };

        let channels: String = grammar
            .channels
            .iter()
            .map(|(_, token)| format!(r"\s*{}\s+(\S+)\s+dB", regex::escape(token)))
            .collect();

        Self {
            signature: Regex::new(&format!("(?m){}", grammar.signature))
                .expect("dialect signature is a valid regex"),
            qp: Regex::new(&format!(r"{}(\d+)_", regex::escape(grammar.qp_marker)))
                .expect("qp pattern is a valid regex"),
            value_row: Regex::new(value_row).expect("value row pattern is a valid regex"),
            frame: Regex::new(&format!(r"^\s*POC\s+(\d+)\b.*?\)\s+(\d+)\s+bits\s+\[{channels}"))
                .expect("frame pattern is a valid regex"),
        }
    }
}

/// Patterns shared by every dialect.
pub(crate) struct Shared {
    /// Section title such as `SUMMARY -----` or `I Slices-----`; group 1 is the label.
    pub section: Regex,
    /// Any line that starts a per-frame report.
    pub frame_candidate: Regex,
}

pub(crate) fn compiled(dialect: Dialect) -> &'static CompiledGrammar {
    static COMPILED: OnceLock<Vec<CompiledGrammar>> = OnceLock::new();
    let all = COMPILED.get_or_init(|| {
        Dialect::all()
            .iter()
            .map(|dialect| CompiledGrammar::new(dialect.grammar()))
            .collect()
    });
    &all[dialect.index()]
}

pub(crate) fn shared() -> &'static Shared {
    static SHARED: OnceLock<Shared> = OnceLock::new();
    SHARED.get_or_init(|| Shared {
        section: Regex::new(r"^\s*(\w+)(?:\s+\w+)?\s*-{3,}\s*$")
            .expect("section pattern is a valid regex"),
        frame_candidate: Regex::new(r"^\s*POC\s+\d+").expect("candidate pattern is a valid regex"),
    })
}
