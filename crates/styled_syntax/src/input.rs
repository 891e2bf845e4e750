//! Fragment text together with where it sits in the full source.
//!
//! Tokens and parser state work with offsets relative to the fragment. Every
//! position that leaves the parser (node sources, errors) goes through
//! [`Input::position`], which shifts it into the full source: the offset moves
//! by the fragment start, line 1 becomes the fragment's real line, and only
//! columns on that first line are shifted.

use crate::{
    error::{CssSyntaxError, CssSyntaxErrorKind},
    node::Position,
};

/// Text of one fragment and its origin.
#[derive(Debug)]
pub struct Input<'a> {
    css: &'a str,
    /// Byte offsets where each line starts.
    line_starts: Vec<usize>,
    origin: Position,
    file: Option<&'a str>,
}

impl<'a> Input<'a> {
    pub fn new(css: &'a str, origin: Position, file: Option<&'a str>) -> Self {
        let line_starts = std::iter::once(0)
            .chain(css.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            css,
            line_starts,
            origin,
            file,
        }
    }

    /// Input for standalone CSS starting at the top of a file.
    pub fn standalone(css: &'a str) -> Self {
        Self::new(css, Position::new(0, 1, 1), None)
    }

    pub fn css(&self) -> &'a str {
        self.css
    }

    pub fn origin(&self) -> Position {
        self.origin
    }

    /// 1-based line and column of a fragment-relative offset.
    fn relative_line_column(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.css.len());
        let index = self.line_starts.partition_point(|&start| start <= offset) - 1;
        let line_start = self.line_starts[index];
        let column = self
            .css
            .get(line_start..offset)
            .map_or(offset - line_start, |prefix| prefix.chars().count());
        (index + 1, column + 1)
    }

    /// Absolute position of a fragment-relative offset.
    pub fn position(&self, offset: usize) -> Position {
        let (line, column) = self.relative_line_column(offset);
        Position {
            offset: self.origin.offset + offset,
            line: self.origin.line + line - 1,
            column: if line == 1 {
                self.origin.column + column - 1
            } else {
                column
            },
        }
    }

    /// Error at a fragment-relative offset, translated into the full source.
    pub fn error(&self, kind: CssSyntaxErrorKind, offset: usize) -> CssSyntaxError {
        self.error_at(kind, self.position(offset))
    }

    /// Error at an already translated position.
    pub fn error_at(&self, kind: CssSyntaxErrorKind, position: Position) -> CssSyntaxError {
        CssSyntaxError {
            kind,
            offset: position.offset,
            line: position.line,
            column: position.column,
            file: self.file.map(ToString::to_string),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_on_first_line_is_shifted() {
        let input = Input::new("color: red;", Position::new(27, 1, 28), None);
        assert_eq!(input.position(0), Position::new(27, 1, 28));
        assert_eq!(input.position(10), Position::new(37, 1, 38));
    }

    #[test]
    fn test_position_on_later_lines_keeps_column() {
        let input = Input::new("\n\tcolor: red;\n", Position::new(27, 1, 28), None);
        assert_eq!(input.position(2), Position::new(29, 2, 2));
        assert_eq!(input.position(12), Position::new(39, 2, 12));
    }

    #[test]
    fn test_fragment_on_later_source_line() {
        let input = Input::new("a\nb", Position::new(68, 2, 28), None);
        assert_eq!(input.position(0), Position::new(68, 2, 28));
        assert_eq!(input.position(2), Position::new(70, 3, 1));
    }

    #[test]
    fn test_columns_count_characters() {
        let input = Input::standalone("content: \"é\"; a");
        assert_eq!(input.position(15).column, 15);
    }

    #[test]
    fn test_error_uses_file_name() {
        let input = Input::new(" \"", Position::new(0, 1, 1), Some("a.ts"));
        let err = input.error(CssSyntaxErrorKind::UnclosedString, 1);
        assert_eq!(err.to_string(), "a.ts:1:2: Unclosed string");
    }
}
