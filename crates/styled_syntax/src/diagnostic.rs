//! Diagnostics about the host JavaScript/TypeScript source.
//!
//! A host file that oxc can't parse yields no fragments. The reasons are
//! reported here instead of being lost, in the same shape as CSS syntax
//! errors so callers can show both side by side.

use crate::error::CssSyntaxError;

/// Severity level for a diagnostic message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticSeverity {
    Error,
    Warning,
    Hint,
}

/// A labeled source span within a diagnostic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticLabel {
    pub text: Option<String>,
    /// Byte offset of the span start.
    pub start: usize,
    /// Byte offset of the span end (exclusive).
    pub end: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, counted in characters.
    pub column: usize,
}

impl DiagnosticLabel {
    /// Create a label from byte offsets, computing line/column from source text.
    pub fn new(text: Option<String>, start: usize, end: usize, source_text: &str) -> Self {
        let (line, column) = line_column(source_text, start);
        Self {
            text,
            start,
            end,
            line,
            column,
        }
    }
}

/// A problem found in the host source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: DiagnosticSeverity,
    pub text: String,
    /// Suggestion for fixing the issue, empty when there is none.
    pub hint: String,
    pub labels: Vec<DiagnosticLabel>,
}

impl Diagnostic {
    /// Map an oxc parse error.
    pub fn from_oxc(source_text: &str, diag: &oxc_diagnostics::OxcDiagnostic) -> Self {
        let severity = match diag.severity {
            oxc_diagnostics::Severity::Error => DiagnosticSeverity::Error,
            oxc_diagnostics::Severity::Warning => DiagnosticSeverity::Warning,
            oxc_diagnostics::Severity::Advice => DiagnosticSeverity::Hint,
        };

        let hint = diag
            .help
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();

        let labels = diag
            .labels
            .as_ref()
            .map(|labels| {
                labels
                    .iter()
                    .map(|label| {
                        DiagnosticLabel::new(
                            label.label().map(ToString::to_string),
                            label.offset(),
                            label.offset() + label.len(),
                            source_text,
                        )
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self {
            severity,
            text: diag.message.to_string(),
            hint,
            labels,
        }
    }

    pub fn from_oxc_list(
        source_text: &str,
        diagnostics: &[oxc_diagnostics::OxcDiagnostic],
    ) -> Vec<Self> {
        diagnostics
            .iter()
            .map(|d| Self::from_oxc(source_text, d))
            .collect()
    }

    /// Wrap a CSS syntax error so it can be reported next to host errors.
    pub fn from_css_error(error: &CssSyntaxError) -> Self {
        Self {
            severity: DiagnosticSeverity::Error,
            text: error.reason(),
            hint: String::new(),
            labels: vec![DiagnosticLabel {
                text: None,
                start: error.offset,
                end: error.offset,
                line: error.line,
                column: error.column,
            }],
        }
    }
}

/// 1-based line and column of a byte offset.
fn line_column(source: &str, offset: usize) -> (usize, usize) {
    let mut line = 1;
    let mut column = 1;
    for (i, ch) in source.char_indices() {
        if i >= offset {
            break;
        }
        if ch == '\n' {
            line += 1;
            column = 1;
        } else {
            column += 1;
        }
    }
    (line, column)
}
