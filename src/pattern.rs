//! Line matchers used by the Response Router.
//!
//! The wire protocol only ever needs to recognize a handful of fixed shapes
//! (`OK`, `READY`, a `+SBDIX:` prefix, `+CIEV:0,` followed by a non-zero
//! digit, ...). Rather than pull in a general regex engine for a rule set
//! this small and this static, a line matcher is just a predicate.

use std::fmt;

/// A predicate over a single framed line (CR included, LF stripped).
#[derive(Clone)]
pub(crate) enum Pattern {
    /// Matches a line equal to `s`.
    Exact(&'static str),
    /// Matches a line starting with `s`.
    Prefix(&'static str),
    /// Matches `+CIEV:0,` followed by any digit other than `0`.
    SignalQualityNonZero,
    /// Matches a line whose first non-numeric-prefix byte sequence starts
    /// with `ERROR` (case sensitive, per the wire spec).
    Error,
}

impl Pattern {
    pub(crate) fn matches(&self, line: &str) -> bool {
        let line = line.trim_end_matches(['\r', '\n']);
        match self {
            Pattern::Exact(s) => line == *s,
            Pattern::Prefix(s) => line.starts_with(s),
            Pattern::SignalQualityNonZero => match line.strip_prefix("+CIEV:0,") {
                Some(rest) => rest.chars().next().is_some_and(|c| c.is_ascii_digit() && c != '0'),
                None => false,
            },
            Pattern::Error => line.starts_with("ERROR"),
        }
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Exact(s) => write!(f, "Exact({s:?})"),
            Pattern::Prefix(s) => write!(f, "Prefix({s:?})"),
            Pattern::SignalQualityNonZero => write!(f, "SignalQualityNonZero"),
            Pattern::Error => write!(f, "Error"),
        }
    }
}

/// Unsolicited lines the router recognizes whenever no command is inflight
/// (and, per §9, checked *before* the inflight terminator so a `SBDRING`
/// can never be confused with a command's own terminator).
pub(crate) struct UnsolicitedRule {
    pub(crate) pattern: Pattern,
    pub(crate) kind: UnsolicitedKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UnsolicitedKind {
    RingAlert,
    Areg,
}

pub(crate) fn unsolicited_table() -> Vec<UnsolicitedRule> {
    vec![
        UnsolicitedRule {
            pattern: Pattern::Exact("SBDRING"),
            kind: UnsolicitedKind::RingAlert,
        },
        UnsolicitedRule {
            pattern: Pattern::Prefix("+AREG:"),
            kind: UnsolicitedKind::Areg,
        },
    ]
}
