//! Syntax errors raised while tokenizing or parsing a fragment.
//!
//! Positions are always reported in the coordinate space of the full source
//! file, never relative to the fragment the error came from.

use std::fmt;

/// What went wrong.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CssSyntaxErrorKind {
    #[error("Unclosed string")]
    UnclosedString,
    #[error("Unclosed comment")]
    UnclosedComment,
    #[error("Unclosed bracket")]
    UnclosedBracket,
    #[error("Unclosed block")]
    UnclosedBlock,
    #[error("Unexpected }}")]
    UnexpectedClose,
    /// Carries the text of the offending token.
    #[error("Unknown word {0}")]
    UnknownWord(String),
    #[error("Missed semicolon")]
    MissedSemicolon,
    #[error("Double colon")]
    DoubleColon,
    #[error("At-rule without name")]
    UnnamedAtRule,
}

/// A CSS syntax error at a known position.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}:{line}:{column}: {kind}", FileName(.file.as_deref()))]
pub struct CssSyntaxError {
    pub kind: CssSyntaxErrorKind,
    /// Byte offset into the full source.
    pub offset: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
    /// Logical filename from `ParseOptions::from`.
    pub file: Option<String>,
}

impl CssSyntaxError {
    /// The message without location, e.g. `Unclosed string`.
    pub fn reason(&self) -> String {
        self.kind.to_string()
    }
}

struct FileName<'a>(Option<&'a str>);

impl fmt::Display for FileName<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.unwrap_or("<css input>"))
    }
}
