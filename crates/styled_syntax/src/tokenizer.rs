//! Pull tokenizer for CSS fragments with `${...}` holes.
//!
//! Lexes the usual CSS classes (words, strings, comments, at-words, bracket
//! groups, punctuation, whitespace) and treats every declared interpolation as
//! opaque: a token that starts on an interpolation is exactly that
//! interpolation, and any scan that runs into one (word, at-word, string,
//! comment or bracket bodies) jumps over it without looking inside.
//!
//! Concatenating the text of every token reproduces the input.

use smallvec::SmallVec;

use crate::{
    error::{CssSyntaxError, CssSyntaxErrorKind},
    input::Input,
};

/// Kind of a [`Token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Word,
    Space,
    String,
    Comment,
    AtWord,
    /// A whole `(...)` group, e.g. the argument of `url(...)`.
    Brackets,
    OpenParen,
    CloseParen,
    OpenSquare,
    CloseSquare,
    OpenCurly,
    CloseCurly,
    Colon,
    Semicolon,
}

/// One lexical token. `text` borrows from the fragment.
///
/// Whitespace carries no position. Punctuation carries only `start`. Every
/// other kind carries an inclusive `[start, end]` range where `end` is the
/// offset of the last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    pub text: &'a str,
    pub start: Option<usize>,
    pub end: Option<usize>,
}

impl<'a> Token<'a> {
    pub const fn space(text: &'a str) -> Self {
        Self {
            kind: TokenKind::Space,
            text,
            start: None,
            end: None,
        }
    }

    pub const fn punctuation(kind: TokenKind, text: &'a str, start: usize) -> Self {
        Self {
            kind,
            text,
            start: Some(start),
            end: None,
        }
    }

    pub const fn ranged(kind: TokenKind, text: &'a str, start: usize, end: usize) -> Self {
        Self {
            kind,
            text,
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Whitespace or comment.
    pub fn is_trivia(&self) -> bool {
        matches!(self.kind, TokenKind::Space | TokenKind::Comment)
    }
}

/// A `${...}` hole, relative to the fragment.
///
/// `start` is the offset of `$`, `end` the offset of the closing `}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Interpolation {
    pub start: usize,
    pub end: usize,
}

impl Interpolation {
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Options for [`Tokenizer`].
#[derive(Debug, Clone, Default)]
pub struct TokenizerOptions {
    pub interpolations: Vec<Interpolation>,
    /// Close unterminated strings, comments and `url(` at the end of input
    /// instead of failing.
    pub ignore_errors: bool,
}

impl TokenizerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_interpolations(mut self, interpolations: Vec<Interpolation>) -> Self {
        self.interpolations = interpolations;
        self
    }

    #[must_use]
    pub fn with_ignore_errors(mut self, ignore_errors: bool) -> Self {
        self.ignore_errors = ignore_errors;
        self
    }
}

const fn is_space(b: u8) -> bool {
    matches!(b, b' ' | b'\n' | b'\t' | b'\r' | b'\x0c')
}

const fn is_word_end(b: u8) -> bool {
    matches!(
        b,
        b'\t'
            | b'\n'
            | b'\x0c'
            | b'\r'
            | b' '
            | b'!'
            | b'"'
            | b'#'
            | b'\''
            | b'('
            | b')'
            | b':'
            | b';'
            | b'@'
            | b'['
            | b'\\'
            | b']'
            | b'{'
            | b'}'
    )
}

const fn is_at_end(b: u8) -> bool {
    matches!(
        b,
        b'\t'
            | b'\n'
            | b'\x0c'
            | b'\r'
            | b' '
            | b'"'
            | b'#'
            | b'\''
            | b'('
            | b')'
            | b'/'
            | b';'
            | b'['
            | b'\\'
            | b']'
            | b'{'
            | b'}'
    )
}

const fn is_bad_bracket_char(c: char) -> bool {
    matches!(c, '\n' | '\r' | '"' | '\'' | '(' | '/' | '\\')
}

const fn is_line_terminator(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Interpolation-aware CSS tokenizer.
pub struct Tokenizer<'a> {
    input: Input<'a>,
    css: &'a str,
    /// Sorted by `start`, non-overlapping, all inside `css`.
    interpolations: Vec<Interpolation>,
    ignore_errors: bool,
    pos: usize,
    /// Words seen so far, consulted to recognize `url(`.
    words: Vec<&'a str>,
    returned: SmallVec<[Token<'a>; 4]>,
}

impl<'a> Tokenizer<'a> {
    pub fn new(input: Input<'a>, options: TokenizerOptions) -> Self {
        let css = input.css();
        let mut interpolations = options.interpolations;
        interpolations.retain(|i| i.start <= i.end && i.end < css.len());
        interpolations.sort_unstable();
        interpolations.dedup_by_key(|i| i.start);
        Self {
            input,
            css,
            interpolations,
            ignore_errors: options.ignore_errors,
            pos: 0,
            words: Vec::new(),
            returned: SmallVec::new(),
        }
    }

    /// Tokenizer over standalone CSS text.
    pub fn from_css(css: &'a str, options: TokenizerOptions) -> Self {
        Self::new(Input::standalone(css), options)
    }

    pub fn input(&self) -> &Input<'a> {
        &self.input
    }

    /// Current offset into the fragment.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn end_of_file(&self) -> bool {
        self.returned.is_empty() && self.pos >= self.css.len()
    }

    /// Push a token back; it is returned by the next call to `next_token`.
    pub fn back(&mut self, token: Token<'a>) {
        self.returned.push(token);
    }

    /// Whether `token` is exactly one declared interpolation.
    pub fn is_interpolation(&self, token: &Token<'_>) -> bool {
        token.kind == TokenKind::Word
            && token.start.is_some_and(|start| {
                self.interpolation_at(start)
                    .is_some_and(|i| token.end == Some(i.end))
            })
    }

    pub fn next_token(&mut self) -> Result<Option<Token<'a>>, CssSyntaxError> {
        self.next_token_with(false)
    }

    /// Like [`Tokenizer::next_token`], optionally closing an unterminated
    /// token at the end of input for this one call.
    pub fn next_token_with(
        &mut self,
        ignore_unclosed: bool,
    ) -> Result<Option<Token<'a>>, CssSyntaxError> {
        if let Some(token) = self.returned.pop() {
            return Ok(Some(token));
        }
        let css = self.css;
        let bytes = css.as_bytes();
        let pos = self.pos;
        let Some(&code) = bytes.get(pos) else {
            return Ok(None);
        };
        let ignore = self.ignore_errors || ignore_unclosed;

        let (token, next) = match code {
            b' ' | b'\n' | b'\t' | b'\r' | b'\x0c' => {
                let end = bytes[pos..]
                    .iter()
                    .position(|&b| !is_space(b))
                    .map_or(bytes.len(), |n| pos + n);
                (Token::space(&css[pos..end]), end)
            }
            b'[' | b']' | b'{' | b'}' | b':' | b';' | b')' => {
                let kind = match code {
                    b'[' => TokenKind::OpenSquare,
                    b']' => TokenKind::CloseSquare,
                    b'{' => TokenKind::OpenCurly,
                    b'}' => TokenKind::CloseCurly,
                    b':' => TokenKind::Colon,
                    b';' => TokenKind::Semicolon,
                    _ => TokenKind::CloseParen,
                };
                (Token::punctuation(kind, &css[pos..=pos], pos), pos + 1)
            }
            b'(' => self.read_paren(pos, ignore)?,
            b'\'' | b'"' => self.read_string(pos, code, ignore)?,
            b'@' => {
                let end = self.find_from(pos + 1, |b, _| is_at_end(b));
                (self.ranged(TokenKind::AtWord, pos, end), end)
            }
            b'\\' => {
                let end = self.read_escape(pos);
                let token = self.ranged(TokenKind::Word, pos, end);
                self.words.push(token.text);
                (token, end)
            }
            b'/' if bytes.get(pos + 1) == Some(&b'*') => self.read_comment(pos, ignore)?,
            _ => {
                let end = match self.interpolation_at(pos) {
                    Some(interpolation) => interpolation.end + 1,
                    None => self.find_from(pos + 1, |b, i| {
                        is_word_end(b) || (b == b'/' && bytes.get(i + 1) == Some(&b'*'))
                    }),
                };
                let end = end.max(self.char_end(pos));
                let token = self.ranged(TokenKind::Word, pos, end);
                self.words.push(token.text);
                (token, end)
            }
        };

        self.pos = next;
        Ok(Some(token))
    }

    fn read_paren(
        &mut self,
        pos: usize,
        ignore: bool,
    ) -> Result<(Token<'a>, usize), CssSyntaxError> {
        let css = self.css;
        let bytes = css.as_bytes();
        let prev = self.words.pop().unwrap_or_default();
        let after = bytes.get(pos + 1).copied();

        if prev == "url" && after.is_none_or(|b| b != b'\'' && b != b'"' && !is_space(b)) {
            let mut search = pos + 1;
            let close = loop {
                let found = self.find_from(search, |b, _| b == b')');
                if found >= bytes.len() {
                    if ignore {
                        break None;
                    }
                    return Err(self
                        .input
                        .error(CssSyntaxErrorKind::UnclosedBracket, pos));
                }
                if self.is_escaped(found) {
                    search = found + 1;
                } else {
                    break Some(found);
                }
            };
            return Ok(match close {
                Some(close) => (self.ranged(TokenKind::Brackets, pos, close + 1), close + 1),
                None => (self.ranged(TokenKind::Brackets, pos, pos + 1), pos + 1),
            });
        }

        let close = self.find_from(pos + 1, |b, _| b == b')');
        if close >= bytes.len() || self.has_bad_bracket(pos, close + 1) {
            Ok((
                Token::punctuation(TokenKind::OpenParen, &css[pos..=pos], pos),
                pos + 1,
            ))
        } else {
            Ok((self.ranged(TokenKind::Brackets, pos, close + 1), close + 1))
        }
    }

    fn read_string(
        &self,
        pos: usize,
        quote: u8,
        ignore: bool,
    ) -> Result<(Token<'a>, usize), CssSyntaxError> {
        let len = self.css.len();
        let mut search = pos + 1;
        loop {
            let found = self.find_from(search, |b, _| b == quote);
            if found >= len {
                if ignore {
                    let end = self.char_end(pos + 1);
                    return Ok((self.ranged(TokenKind::String, pos, end), end));
                }
                return Err(self.input.error(CssSyntaxErrorKind::UnclosedString, pos));
            }
            if self.is_escaped(found) {
                search = found + 1;
            } else {
                return Ok((self.ranged(TokenKind::String, pos, found + 1), found + 1));
            }
        }
    }

    fn read_comment(
        &self,
        pos: usize,
        ignore: bool,
    ) -> Result<(Token<'a>, usize), CssSyntaxError> {
        let bytes = self.css.as_bytes();
        let close = self.find_from(pos + 2, |b, i| {
            b == b'*' && bytes.get(i + 1) == Some(&b'/')
        });
        if close >= bytes.len() {
            if ignore {
                let end = bytes.len();
                return Ok((self.ranged(TokenKind::Comment, pos, end), end));
            }
            return Err(self.input.error(CssSyntaxErrorKind::UnclosedComment, pos));
        }
        Ok((self.ranged(TokenKind::Comment, pos, close + 2), close + 2))
    }

    /// Exclusive end of a backslash escape starting at `pos`.
    fn read_escape(&self, pos: usize) -> usize {
        let bytes = self.css.as_bytes();
        let mut next = pos;
        let mut escape = true;
        while bytes.get(next + 1) == Some(&b'\\') {
            next += 1;
            escape = !escape;
        }
        let Some(&code) = bytes.get(next + 1) else {
            return next + 1;
        };
        if !escape || code == b'/' || is_space(code) {
            return next + 1;
        }
        next += 1;
        if code.is_ascii_hexdigit() {
            while bytes.get(next + 1).is_some_and(u8::is_ascii_hexdigit) {
                next += 1;
            }
            if bytes.get(next + 1) == Some(&b' ') {
                next += 1;
            }
            return next + 1;
        }
        self.char_end(next)
    }

    /// First index at or after `from` where `pred` holds, jumping over
    /// interpolations. Returns the input length when nothing matches.
    fn find_from(&self, from: usize, pred: impl Fn(u8, usize) -> bool) -> usize {
        let bytes = self.css.as_bytes();
        let mut i = from;
        while i < bytes.len() {
            if let Some(interpolation) = self.interpolation_at(i) {
                i = interpolation.end + 1;
                continue;
            }
            if pred(bytes[i], i) {
                return i;
            }
            i += 1;
        }
        bytes.len()
    }

    /// Whether the character at `index` is preceded by an odd run of backslashes.
    fn is_escaped(&self, index: usize) -> bool {
        let backslashes = self.css.as_bytes()[..index]
            .iter()
            .rev()
            .take_while(|&&b| b == b'\\')
            .count();
        backslashes % 2 == 1
    }

    /// A `(` group can't be a single `brackets` token if it contains a quote,
    /// slash, backslash, newline or nested `(` (ignoring interpolation bodies).
    fn has_bad_bracket(&self, start: usize, end: usize) -> bool {
        let mut prev: Option<char> = None;
        let mut skip_until = start;
        for (i, c) in self.css[start..end].char_indices() {
            let i = start + i;
            if i < skip_until {
                continue;
            }
            if let Some(interpolation) = self.interpolation_at(i) {
                skip_until = interpolation.end + 1;
                prev = Some('}');
                continue;
            }
            if let Some(p) = prev
                && is_bad_bracket_char(c)
                && !is_line_terminator(p)
            {
                return true;
            }
            prev = Some(c);
        }
        false
    }

    fn interpolation_at(&self, offset: usize) -> Option<&Interpolation> {
        self.interpolations
            .binary_search_by_key(&offset, |i| i.start)
            .ok()
            .map(|index| &self.interpolations[index])
    }

    /// Exclusive end of the character starting at `index`, clamped to the input.
    fn char_end(&self, index: usize) -> usize {
        self.css
            .get(index..)
            .and_then(|rest| rest.chars().next())
            .map_or(self.css.len(), |c| index + c.len_utf8())
    }

    /// Ranged token over `[start, end)`; the reported end is the start of
    /// the last character.
    fn ranged(&self, kind: TokenKind, start: usize, end: usize) -> Token<'a> {
        let end = end.min(self.css.len());
        let text = &self.css[start..end];
        let last = text.char_indices().next_back().map_or(0, |(i, _)| i);
        Token::ranged(kind, text, start, start + last)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Result<Token<'a>, CssSyntaxError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token().transpose()
    }
}
