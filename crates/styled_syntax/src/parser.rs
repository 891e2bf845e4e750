//! Structural parser: token stream to style tree.
//!
//! Works like a permissive CSS parser, with the twists needed for
//! interpolations:
//!
//! - A run of tokens that ends without forming a declaration or a rule may
//!   still be valid if it only holds interpolations, whitespace, semicolons
//!   and comments. Such runs become raw text (`before` of the next node, or
//!   `after` of the container).
//! - Leading interpolations followed by whitespace (or by another
//!   interpolation) are pulled off a declaration into its `before`.
//! - Interpolations on their own lines above a selector are pulled off the
//!   rule into its `before`.
//! - An at-word always ends the current run so `${mixin} @media ...` works.
//!
//! Open rules and at-rules are kept on an explicit stack. Closing `}` pops the
//! top and appends it to the container below.

use cow_utils::CowUtils;

use crate::{
    error::{CssSyntaxError, CssSyntaxErrorKind},
    input::Input,
    node::{
        AtRule, Comment, Declaration, FragmentKind, Node, Position, RawEnds, RawValue, Raws,
        Root, RootRaws, Rule, Source,
    },
    tokenizer::{Interpolation, Token, TokenKind, Tokenizer, TokenizerOptions},
};

/// How to parse one fragment on its own.
#[derive(Debug, Clone)]
pub struct FragmentOptions {
    /// `${...}` holes, relative to the fragment.
    pub interpolations: Vec<Interpolation>,
    /// Where the fragment starts in the full source.
    pub origin: Position,
    /// Logical filename for error messages.
    pub from: Option<String>,
    pub fragment: FragmentKind,
}

impl Default for FragmentOptions {
    fn default() -> Self {
        Self {
            interpolations: Vec::new(),
            origin: Position::new(0, 1, 1),
            from: None,
            fragment: FragmentKind::Component {
                code_before: String::new(),
                code_after: None,
            },
        }
    }
}

impl FragmentOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_interpolations(mut self, interpolations: Vec<Interpolation>) -> Self {
        self.interpolations = interpolations;
        self
    }

    #[must_use]
    pub fn with_origin(mut self, origin: Position) -> Self {
        self.origin = origin;
        self
    }

    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    #[must_use]
    pub fn with_fragment(mut self, fragment: FragmentKind) -> Self {
        self.fragment = fragment;
        self
    }
}

/// Parse one fragment into a [`Root`].
///
/// # Errors
///
/// Returns a [`CssSyntaxError`] positioned in the full source when the
/// fragment is not valid styled CSS.
pub fn parse_fragment(css: &str, options: &FragmentOptions) -> Result<Root, CssSyntaxError> {
    let input = Input::new(css, options.origin, options.from.as_deref());
    let tokenizer = Tokenizer::new(
        input,
        TokenizerOptions::new().with_interpolations(options.interpolations.clone()),
    );
    let root = Root {
        nodes: Vec::new(),
        raws: RootRaws {
            after: String::new(),
            semicolon: None,
            is_rule_like: true,
            range_start: options.origin.offset,
            range_end: options.origin.offset + css.len(),
            fragment: options.fragment.clone(),
        },
        source: Source::new(options.origin),
    };
    Parser::new(tokenizer, root).parse()
}

struct Parser<'a> {
    tokenizer: Tokenizer<'a>,
    root: Root,
    /// Rules and at-rules whose `}` hasn't been seen yet, innermost last.
    open: Vec<Node>,
    /// Raw text waiting to become the next node's `before` (or an `after`).
    spaces: String,
    /// Whether the last declaration in the current container ended with `;`.
    semicolon: bool,
}

type ParseResult<T = ()> = Result<T, CssSyntaxError>;

impl<'a> Parser<'a> {
    fn new(tokenizer: Tokenizer<'a>, root: Root) -> Self {
        Self {
            tokenizer,
            root,
            open: Vec::new(),
            spaces: String::new(),
            semicolon: false,
        }
    }

    fn parse(mut self) -> ParseResult<Root> {
        while !self.tokenizer.end_of_file() {
            let Some(token) = self.tokenizer.next_token()? else {
                break;
            };
            match token.kind {
                TokenKind::Space => self.spaces.push_str(token.text),
                TokenKind::Semicolon => self.free_semicolon(token),
                TokenKind::CloseCurly => self.end(token)?,
                TokenKind::Comment => self.comment(token),
                TokenKind::AtWord => self.at_rule(token)?,
                TokenKind::OpenCurly => self.empty_rule(token),
                _ => self.other(token)?,
            }
        }
        self.end_file()
    }

    fn other(&mut self, start: Token<'a>) -> ParseResult {
        let custom_property = start.text.starts_with("--");
        let mut end = false;
        let mut colon = false;
        let mut bracket: Option<Token<'a>> = None;
        let mut brackets: Vec<TokenKind> = Vec::new();
        let mut tokens: Vec<Token<'a>> = Vec::new();

        let mut next = Some(start);
        while let Some(token) = next {
            tokens.push(token);
            match token.kind {
                TokenKind::OpenParen | TokenKind::OpenSquare => {
                    bracket.get_or_insert(token);
                    brackets.push(if token.is(TokenKind::OpenParen) {
                        TokenKind::CloseParen
                    } else {
                        TokenKind::CloseSquare
                    });
                }
                TokenKind::OpenCurly if custom_property && colon => {
                    bracket.get_or_insert(token);
                    brackets.push(TokenKind::CloseCurly);
                }
                kind if brackets.is_empty() => match kind {
                    TokenKind::Semicolon => {
                        if colon {
                            return self.decl(tokens, custom_property);
                        }
                        break;
                    }
                    TokenKind::OpenCurly => {
                        self.rule(tokens);
                        return Ok(());
                    }
                    TokenKind::CloseCurly | TokenKind::AtWord => {
                        tokens.pop();
                        self.tokenizer.back(token);
                        end = true;
                        break;
                    }
                    TokenKind::Colon => colon = true,
                    _ => {}
                },
                kind if brackets.last() == Some(&kind) => {
                    brackets.pop();
                    if brackets.is_empty() {
                        bracket = None;
                    }
                }
                _ => {}
            }
            next = self.tokenizer.next_token()?;
        }

        if self.tokenizer.end_of_file() {
            end = true;
        }

        if let Some(bracket) = bracket
            && !brackets.is_empty()
        {
            return Err(self.error(
                CssSyntaxErrorKind::UnclosedBracket,
                bracket.start.unwrap_or_default(),
            ));
        }

        if end && colon {
            if !custom_property {
                while let Some(last) = tokens.last().copied()
                    && last.is_trivia()
                {
                    tokens.pop();
                    self.tokenizer.back(last);
                }
            }
            return self.decl(tokens, custom_property);
        }

        // Nothing structural was found: the run is only valid as filler.
        for token in tokens {
            if token.is(TokenKind::Space)
                || token.is(TokenKind::Semicolon)
                || self.tokenizer.is_interpolation(&token)
            {
                self.spaces.push_str(token.text);
            } else if token.is(TokenKind::Comment) {
                self.comment(token);
            } else {
                return Err(self.unknown_word(token));
            }
        }
        Ok(())
    }

    fn rule(&mut self, mut tokens: Vec<Token<'a>>) {
        tokens.pop();

        let interpolations = self.spaces_and_interpolations_from_start(&mut tokens);
        self.spaces.push_str(&interpolations);

        let start = tokens.first().and_then(|t| t.start).unwrap_or_default();
        let before = self.take_before(false);
        let between = spaces_and_comments_from_end(&mut tokens);
        let (selector, raw) = raw_value(&tokens, false);

        let source = Source::new(self.position(start));
        self.open.push(Node::Rule(Rule {
            selector,
            nodes: Vec::new(),
            raws: Raws {
                before: Some(before),
                between: Some(between),
                selector: raw,
                ends: RawEnds {
                    before: Some(source.start.offset),
                    ..RawEnds::default()
                },
                ..Raws::default()
            },
            source: Some(source),
        }));
    }

    fn decl(&mut self, mut tokens: Vec<Token<'a>>, custom_property: bool) -> ParseResult {
        let mut before = self.take_before(false);

        let Some(&last) = tokens.last() else {
            return Ok(());
        };
        if last.is(TokenKind::Semicolon) {
            self.semicolon = true;
            tokens.pop();
        }
        let end_offset = last
            .end
            .or(last.start)
            .or_else(|| find_last_with_position(&tokens));

        let mut rest: &[Token<'a>] = &tokens;

        // Interpolations standing on their own are not part of the property.
        while let [first, tail @ ..] = rest {
            let standalone = self.tokenizer.is_interpolation(first)
                && tail
                    .first()
                    .is_some_and(|t| t.is(TokenKind::Space) || self.tokenizer.is_interpolation(t));
            if first.is(TokenKind::Word) && !standalone {
                break;
            }
            if tail.is_empty() {
                return Err(self.unknown_word(*first));
            }
            before.push_str(first.text);
            rest = tail;
        }

        let start_offset = rest.first().and_then(|t| t.start).unwrap_or_default();

        let mut prop = String::new();
        while let [first, tail @ ..] = rest {
            if matches!(
                first.kind,
                TokenKind::Colon | TokenKind::Space | TokenKind::Comment
            ) {
                break;
            }
            prop.push_str(first.text);
            rest = tail;
        }

        let mut between = String::new();
        while let [first, tail @ ..] = rest {
            rest = tail;
            between.push_str(first.text);
            if first.is(TokenKind::Colon) {
                break;
            }
            if first.is(TokenKind::Word) && first.text.chars().any(is_word_char) {
                return Err(self.unknown_word(*first));
            }
        }

        let start = self.position(start_offset);
        let mut before_end = start.offset;
        if let Some(hack @ ('_' | '*')) = prop.chars().next() {
            before.push(hack);
            prop.remove(0);
            before_end += hack.len_utf8();
        }

        let leading = rest.iter().take_while(|t| t.is_trivia()).count();
        let (mut first_spaces, mut rest) = rest.split_at(leading);

        let mut important = false;
        let mut important_raw = None;
        for i in (0..rest.len()).rev() {
            let token = rest[i];
            let lower = token.text.cow_to_lowercase();
            if lower == "!important" {
                important = true;
                let mut string: String = rest[i..].iter().map(|t| t.text).collect();
                rest = &rest[..i];
                string.insert_str(0, &spaces_from_end(&mut rest));
                if string != " !important" {
                    important_raw = Some(string);
                }
                break;
            } else if lower == "important" {
                let mut cache = rest;
                let mut string = String::new();
                for j in (1..=i).rev() {
                    let kind = cache[j].kind;
                    if string.trim().starts_with('!') && kind != TokenKind::Space {
                        break;
                    }
                    if let [init @ .., popped] = cache {
                        string.insert_str(0, popped.text);
                        cache = init;
                    }
                }
                if string.trim().starts_with('!') {
                    important = true;
                    important_raw = Some(string);
                    rest = cache;
                }
            }
            if !token.is_trivia() {
                break;
            }
        }

        if rest.iter().any(|t| !t.is_trivia()) {
            for token in first_spaces {
                between.push_str(token.text);
            }
            first_spaces = &[];
        }

        let value_tokens: Vec<Token<'a>> = first_spaces.iter().chain(rest).copied().collect();
        let (value, raw) = raw_value(&value_tokens, custom_property);

        if value.contains(':') && !custom_property {
            self.check_missed_semicolon(rest)?;
        }

        let node = Declaration {
            prop,
            value,
            important,
            raws: Raws {
                before: Some(before),
                between: Some(between),
                important: important_raw,
                value: raw,
                ends: RawEnds {
                    before: Some(before_end),
                    ..RawEnds::default()
                },
                ..Raws::default()
            },
            source: Some(Source {
                start,
                end: end_offset.map(|offset| self.position(offset)),
            }),
        };
        self.current_nodes().push(node.into());
        Ok(())
    }

    fn comment(&mut self, token: Token<'a>) {
        let start = token.start.unwrap_or_default();
        let before = self.take_before(true);
        let end = self.end_position(token.end.unwrap_or(start));

        let inner = token
            .text
            .get(2..token.text.len().saturating_sub(2))
            .unwrap_or_default();
        let (text, left, right) = if inner.trim().is_empty() {
            (String::new(), inner.to_string(), String::new())
        } else {
            let trimmed_start = inner.trim_start();
            let text = trimmed_start.trim_end();
            let left = &inner[..inner.len() - trimmed_start.len()];
            let right = &trimmed_start[text.len()..];
            (text.to_string(), left.to_string(), right.to_string())
        };

        let start = self.position(start);
        let node = Comment {
            text,
            raws: Raws {
                before: Some(before),
                left: Some(left),
                right: Some(right),
                ends: RawEnds {
                    before: Some(start.offset),
                    ..RawEnds::default()
                },
                ..Raws::default()
            },
            source: Some(Source {
                start,
                end: Some(end),
            }),
        };
        self.current_nodes().push(node.into());
    }

    fn empty_rule(&mut self, token: Token<'a>) {
        let before = self.take_before(false);
        let source = Source::new(self.position(token.start.unwrap_or_default()));
        self.open.push(Node::Rule(Rule {
            selector: String::new(),
            nodes: Vec::new(),
            raws: Raws {
                before: Some(before),
                between: Some(String::new()),
                ends: RawEnds {
                    before: Some(source.start.offset),
                    ..RawEnds::default()
                },
                ..Raws::default()
            },
            source: Some(source),
        }));
    }

    fn at_rule(&mut self, token: Token<'a>) -> ParseResult {
        let start = token.start.unwrap_or_default();
        let name = token.text.get(1..).unwrap_or_default();
        if name.is_empty() {
            return Err(self.error(CssSyntaxErrorKind::UnnamedAtRule, start));
        }
        let before = self.take_before(false);
        let mut source = Source::new(self.position(start));

        let mut params: Vec<Token<'a>> = Vec::new();
        let mut brackets: Vec<TokenKind> = Vec::new();
        let mut open = false;
        let mut last = false;
        let mut close: Option<Token<'a>> = None;

        while !self.tokenizer.end_of_file() {
            let Some(token) = self.tokenizer.next_token()? else {
                break;
            };
            match token.kind {
                TokenKind::OpenParen => brackets.push(TokenKind::CloseParen),
                TokenKind::OpenSquare => brackets.push(TokenKind::CloseSquare),
                TokenKind::OpenCurly if !brackets.is_empty() => {
                    brackets.push(TokenKind::CloseCurly);
                }
                kind if brackets.last() == Some(&kind) => {
                    brackets.pop();
                }
                _ => {}
            }

            if brackets.is_empty() {
                match token.kind {
                    TokenKind::Semicolon => {
                        source.end = Some(self.end_position(token.start.unwrap_or_default()));
                        self.semicolon = true;
                        break;
                    }
                    TokenKind::OpenCurly => {
                        open = true;
                        break;
                    }
                    TokenKind::CloseCurly => {
                        if let Some(prev) = params.iter().rev().find(|t| !t.is(TokenKind::Space))
                            && let Some(offset) = prev.end.or(prev.start)
                        {
                            source.end = Some(self.end_position(offset));
                        }
                        close = Some(token);
                        break;
                    }
                    _ => params.push(token),
                }
            } else {
                params.push(token);
            }

            if self.tokenizer.end_of_file() {
                last = true;
                break;
            }
        }

        let mut between = spaces_and_comments_from_end(&mut params);
        let (params_value, after_name, raw) = if params.is_empty() {
            (String::new(), String::new(), None)
        } else {
            let after_name = spaces_and_comments_from_start(&mut params);
            let (value, raw) = raw_value(&params, false);
            if last {
                if let Some(offset) = params.last().and_then(|t| t.end.or(t.start)) {
                    source.end = Some(self.end_position(offset));
                }
                self.spaces = std::mem::take(&mut between);
            }
            (value, after_name, raw)
        };

        let node = Node::AtRule(AtRule {
            name: name.to_string(),
            params: params_value,
            nodes: open.then(Vec::new),
            raws: Raws {
                before: Some(before),
                between: Some(between),
                after_name: Some(after_name),
                params: raw,
                ends: RawEnds {
                    before: Some(source.start.offset),
                    ..RawEnds::default()
                },
                ..Raws::default()
            },
            source: Some(source),
        });
        if open {
            self.open.push(node);
        } else {
            self.current_nodes().push(node);
        }

        match close {
            Some(token) => self.end(token),
            None => Ok(()),
        }
    }

    fn free_semicolon(&mut self, token: Token<'a>) {
        self.spaces.push_str(token.text);
        let end = self.end_position(token.start.unwrap_or_default());
        let spaces = std::mem::take(&mut self.spaces);
        match self.current_nodes().last_mut() {
            Some(Node::Rule(rule)) if rule.raws.own_semicolon.is_none() => {
                rule.raws.own_semicolon = Some(spaces);
                rule.raws.ends.own_semicolon = Some(end.offset);
                if let Some(source) = &mut rule.source {
                    source.end = Some(end);
                }
            }
            _ => self.spaces = spaces,
        }
    }

    fn end(&mut self, token: Token<'a>) -> ParseResult {
        let Some(mut node) = self.open.pop() else {
            return Err(self.error(
                CssSyntaxErrorKind::UnexpectedClose,
                token.start.unwrap_or_default(),
            ));
        };
        let semicolon = std::mem::take(&mut self.semicolon);
        let spaces = std::mem::take(&mut self.spaces);
        let close = self.position(token.start.unwrap_or_default());
        let end = self.end_position(token.start.unwrap_or_default());

        if node.nodes().is_some_and(|nodes| !nodes.is_empty()) {
            node.raws_mut().semicolon = Some(semicolon);
        }
        node.raws_mut().ends.after = Some(close.offset);
        node.raws_mut()
            .after
            .get_or_insert_with(String::new)
            .push_str(&spaces);
        if let Some(source) = node.source_mut() {
            source.end = Some(end);
        }
        self.current_nodes().push(node);
        Ok(())
    }

    fn end_file(mut self) -> ParseResult<Root> {
        if let Some(node) = self.open.last() {
            let start = node.source().map(|s| s.start).unwrap_or(self.root.source.start);
            return Err(self
                .tokenizer
                .input()
                .error_at(CssSyntaxErrorKind::UnclosedBlock, start));
        }
        if !self.root.nodes.is_empty() {
            self.root.raws.semicolon = Some(self.semicolon);
        }
        self.root.raws.after.push_str(&self.spaces);
        self.root.source.end = Some(self.position(self.tokenizer.position()));
        Ok(self.root)
    }

    // Helpers

    fn current_nodes(&mut self) -> &mut Vec<Node> {
        match self.open.last_mut() {
            Some(Node::Rule(rule)) => &mut rule.nodes,
            Some(Node::AtRule(at_rule)) => at_rule.nodes.get_or_insert_with(Vec::new),
            _ => &mut self.root.nodes,
        }
    }

    /// Hand the pending raw text to a new node.
    fn take_before(&mut self, is_comment: bool) -> String {
        if !is_comment {
            self.semicolon = false;
        }
        std::mem::take(&mut self.spaces)
    }

    fn position(&self, offset: usize) -> Position {
        self.tokenizer.input().position(offset)
    }

    /// Position just past the character at `offset`.
    fn end_position(&self, offset: usize) -> Position {
        let mut position = self.position(offset);
        position.offset += 1;
        position
    }

    /// Interpolations that stand on their own lines in front of a selector.
    ///
    /// Only applies when the run starts with an interpolation. Consumes
    /// interpolations and whitespace up to the last newline that is followed
    /// by something other than an interpolation.
    fn spaces_and_interpolations_from_start(&self, tokens: &mut Vec<Token<'a>>) -> String {
        if !tokens
            .first()
            .is_some_and(|t| self.tokenizer.is_interpolation(t))
        {
            return String::new();
        }

        let mut cut = None;
        for (i, token) in tokens.iter().enumerate() {
            if token.is(TokenKind::Space) {
                if token.text.contains('\n') {
                    cut = Some(i + 1);
                    if !tokens
                        .get(i + 1)
                        .is_some_and(|t| self.tokenizer.is_interpolation(t))
                    {
                        break;
                    }
                }
            } else if !self.tokenizer.is_interpolation(token) {
                break;
            }
        }

        match cut {
            Some(cut) if cut < tokens.len() => tokens.drain(..cut).map(|t| t.text).collect(),
            _ => String::new(),
        }
    }

    fn check_missed_semicolon(&self, tokens: &[Token<'a>]) -> ParseResult {
        let Some(colon) = self.colon(tokens)? else {
            return Ok(());
        };
        let mut founded = 0;
        let mut culprit = None;
        for token in tokens[..colon].iter().rev() {
            culprit = Some(token);
            if !token.is(TokenKind::Space) {
                founded += 1;
                if founded == 2 {
                    break;
                }
            }
        }
        let Some(token) = culprit else {
            return Ok(());
        };
        let offset = if token.is(TokenKind::Word) {
            token.end.map_or(0, |end| end + 1)
        } else {
            token.start.unwrap_or_default()
        };
        Err(self.error(CssSyntaxErrorKind::MissedSemicolon, offset))
    }

    /// Index of the first top-level `:` in a value.
    fn colon(&self, tokens: &[Token<'a>]) -> ParseResult<Option<usize>> {
        let mut depth = 0usize;
        let mut prev: Option<&Token<'a>> = None;
        for (i, token) in tokens.iter().enumerate() {
            match token.kind {
                TokenKind::OpenParen => depth += 1,
                TokenKind::CloseParen => depth = depth.saturating_sub(1),
                _ => {}
            }
            if depth == 0 && token.is(TokenKind::Colon) {
                match prev {
                    None => {
                        return Err(self.error(
                            CssSyntaxErrorKind::DoubleColon,
                            token.start.unwrap_or_default(),
                        ));
                    }
                    Some(p) if p.is(TokenKind::Word) && p.text == "progid" => continue,
                    Some(_) => return Ok(Some(i)),
                }
            }
            prev = Some(token);
        }
        Ok(None)
    }

    fn error(&self, kind: CssSyntaxErrorKind, offset: usize) -> CssSyntaxError {
        self.tokenizer.input().error(kind, offset)
    }

    fn unknown_word(&self, token: Token<'a>) -> CssSyntaxError {
        let offset = token.start.unwrap_or_else(|| self.tokenizer.position());
        self.error(CssSyntaxErrorKind::UnknownWord(token.text.to_string()), offset)
    }
}

/// `\w` in the regex sense.
fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn find_last_with_position(tokens: &[Token<'_>]) -> Option<usize> {
    tokens.iter().rev().find_map(|t| t.end.or(t.start))
}

fn spaces_and_comments_from_end(tokens: &mut Vec<Token<'_>>) -> String {
    let keep = tokens.iter().rposition(|t| !t.is_trivia()).map_or(0, |i| i + 1);
    tokens.drain(keep..).map(|t| t.text).collect()
}

fn spaces_and_comments_from_start(tokens: &mut Vec<Token<'_>>) -> String {
    let skip = tokens.iter().take_while(|t| t.is_trivia()).count();
    tokens.drain(..skip).map(|t| t.text).collect()
}

/// Trailing whitespace (not comments) split off the end of `tokens`.
fn spaces_from_end(tokens: &mut &[Token<'_>]) -> String {
    let keep = tokens
        .iter()
        .rposition(|t| !t.is(TokenKind::Space))
        .map_or(0, |i| i + 1);
    let (kept, spaces) = tokens.split_at(keep);
    *tokens = kept;
    spaces.iter().map(|t| t.text).collect()
}

/// Clean value of a token run, plus the raw text when they differ.
///
/// Comments are dropped from the clean value unless they sit between two
/// non-space tokens. A trailing space (outside custom properties) is dropped
/// too.
fn raw_value(tokens: &[Token<'_>], custom_property: bool) -> (String, Option<RawValue>) {
    let safe_neighbor = |token: Option<&Token<'_>>| token.is_none_or(|t| t.is(TokenKind::Space));
    let mut value = String::new();
    let mut clean = true;

    for (i, token) in tokens.iter().enumerate() {
        if token.is(TokenKind::Space) && i + 1 == tokens.len() && !custom_property {
            clean = false;
        } else if token.is(TokenKind::Comment) {
            let prev = i.checked_sub(1).and_then(|p| tokens.get(p));
            let next = tokens.get(i + 1);
            if !safe_neighbor(prev) && !safe_neighbor(next) {
                if value.ends_with(',') {
                    clean = false;
                } else {
                    value.push_str(token.text);
                }
            } else {
                clean = false;
            }
        } else {
            value.push_str(token.text);
        }
    }

    let raw = (!clean).then(|| RawValue {
        value: value.clone(),
        raw: tokens.iter().map(|t| t.text).collect(),
    });
    (value, raw)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Container;

    fn parse(css: &str) -> Root {
        parse_fragment(css, &FragmentOptions::default()).unwrap()
    }

    fn parse_with(css: &str, interpolations: &[(usize, usize)]) -> Root {
        let interpolations = interpolations
            .iter()
            .map(|&(start, end)| Interpolation::new(start, end))
            .collect();
        parse_fragment(
            css,
            &FragmentOptions::new().with_interpolations(interpolations),
        )
        .unwrap()
    }

    fn parse_err(css: &str) -> String {
        parse_fragment(css, &FragmentOptions::default())
            .unwrap_err()
            .to_string()
    }

    fn decl(node: &Node) -> &Declaration {
        node.as_declaration().unwrap()
    }

    #[test]
    fn test_declaration() {
        let root = parse("color: red;");
        assert_eq!(root.nodes.len(), 1);
        let d = decl(&root.nodes[0]);
        assert_eq!(d.prop, "color");
        assert_eq!(d.value, "red");
        assert_eq!(d.raws.between.as_deref(), Some(": "));
        assert_eq!(d.raws.before.as_deref(), Some(""));
        assert_eq!(root.raws.semicolon, Some(true));
        assert_eq!(root.raws.after, "");
        assert_eq!(
            d.source,
            Some(Source {
                start: Position::new(0, 1, 1),
                end: Some(Position::new(10, 1, 11)),
            })
        );
    }

    #[test]
    fn test_declaration_at_end_of_input() {
        let root = parse("color: red \n");
        let d = decl(&root.nodes[0]);
        assert_eq!(d.value, "red");
        assert_eq!(root.raws.after, " \n");
        assert_eq!(root.raws.semicolon, Some(false));
    }

    #[test]
    fn test_important() {
        let d = parse("color: red !important;").nodes[0].clone();
        let d = decl(&d);
        assert!(d.important);
        assert_eq!(d.value, "red");
        assert_eq!(d.raws.important, None);

        let root = parse("color: red!IMPORTANT");
        let d = decl(&root.nodes[0]);
        assert!(d.important);
        assert_eq!(d.raws.important.as_deref(), Some("!IMPORTANT"));

        let root = parse("color: red ! important");
        let d = decl(&root.nodes[0]);
        assert!(d.important);
        assert_eq!(d.value, "red");
        assert_eq!(d.raws.important.as_deref(), Some(" ! important"));
    }

    #[test]
    fn test_hack_prefix_moves_to_before() {
        let root = parse("*zoom: 1");
        let d = decl(&root.nodes[0]);
        assert_eq!(d.prop, "zoom");
        assert_eq!(d.raws.before.as_deref(), Some("*"));
        assert_eq!(d.source.map(|s| s.start.offset), Some(0));
        assert_eq!(d.raws.ends.before, Some(1));
    }

    #[test]
    fn test_custom_property_keeps_braces() {
        let root = parse("--x: { a: b };");
        let d = decl(&root.nodes[0]);
        assert_eq!(d.prop, "--x");
        assert_eq!(d.value, "{ a: b }");
    }

    #[test]
    fn test_comment_in_value_is_raw() {
        let root = parse("a: b /* c */ d;");
        let d = decl(&root.nodes[0]);
        assert_eq!(d.value, "b  d");
        assert_eq!(
            d.raws.value,
            Some(RawValue {
                value: "b  d".to_string(),
                raw: "b /* c */ d".to_string(),
            })
        );
    }

    #[test]
    fn test_rule_and_nested_rule() {
        let root = parse("a { b { color: red } }");
        let rule = root.nodes[0].as_rule().unwrap();
        assert_eq!(rule.selector, "a");
        assert_eq!(rule.raws.between.as_deref(), Some(" "));
        assert_eq!(rule.raws.after.as_deref(), Some(" "));
        let inner = rule.nodes[0].as_rule().unwrap();
        assert_eq!(inner.selector, "b");
        assert_eq!(inner.raws.semicolon, Some(false));
        assert_eq!(decl(&inner.nodes[0]).value, "red");
        assert_eq!(
            rule.source.and_then(|s| s.end),
            Some(Position::new(22, 1, 22))
        );
    }

    #[test]
    fn test_empty_rule() {
        let root = parse("{}");
        let rule = root.nodes[0].as_rule().unwrap();
        assert_eq!(rule.selector, "");
        assert_eq!(rule.raws.between.as_deref(), Some(""));
        assert_eq!(rule.raws.after.as_deref(), Some(""));
    }

    #[test]
    fn test_own_semicolon_after_rule() {
        let root = parse("a {} ;");
        let rule = root.nodes[0].as_rule().unwrap();
        assert_eq!(rule.raws.own_semicolon.as_deref(), Some(" ;"));
        assert_eq!(root.raws.after, "");
        assert_eq!(rule.raws.ends.after, Some(3));
        assert_eq!(rule.raws.ends.own_semicolon, Some(6));
        assert_eq!(rule.source.and_then(|s| s.end).map(|end| end.offset), Some(6));
    }

    #[test]
    fn test_at_rules() {
        let root = parse("@import url(a.css);\n@media screen and (min-width: 1px) { a {} }");
        let import = root.nodes[0].as_at_rule().unwrap();
        assert_eq!(import.name, "import");
        assert_eq!(import.params, "url(a.css)");
        assert!(import.nodes.is_none());
        assert_eq!(import.raws.after_name.as_deref(), Some(" "));

        let media = root.nodes[1].as_at_rule().unwrap();
        assert_eq!(media.name, "media");
        assert_eq!(media.params, "screen and (min-width: 1px)");
        assert_eq!(media.raws.between.as_deref(), Some(" "));
        assert_eq!(media.first().and_then(Node::as_rule).map(|r| r.selector.as_str()), Some("a"));
    }

    #[test]
    fn test_at_rule_at_end_returns_spaces() {
        let root = parse("@charset 'utf-8'  ");
        let at_rule = root.nodes[0].as_at_rule().unwrap();
        assert_eq!(at_rule.params, "'utf-8'");
        assert_eq!(at_rule.raws.between.as_deref(), Some(""));
        assert_eq!(root.raws.after, "  ");
    }

    #[test]
    fn test_at_rule_closed_by_parent() {
        let root = parse("a { @include b }");
        let rule = root.nodes[0].as_rule().unwrap();
        let at_rule = rule.nodes[0].as_at_rule().unwrap();
        assert_eq!(at_rule.params, "b");
        assert_eq!(at_rule.raws.between.as_deref(), Some(" "));
        assert_eq!(rule.raws.after.as_deref(), Some(""));
    }

    #[test]
    fn test_comments() {
        let root = parse("/* hello */\n/*   */");
        let first = root.nodes[0].as_comment().unwrap();
        assert_eq!(first.text, "hello");
        assert_eq!(first.raws.left.as_deref(), Some(" "));
        assert_eq!(first.raws.right.as_deref(), Some(" "));
        let second = root.nodes[1].as_comment().unwrap();
        assert_eq!(second.text, "");
        assert_eq!(second.raws.left.as_deref(), Some("   "));
        assert_eq!(second.raws.before.as_deref(), Some("\n"));
    }

    #[test]
    fn test_interpolation_value() {
        let root = parse_with("color: ${red}", &[(7, 12)]);
        let d = decl(&root.nodes[0]);
        assert_eq!(d.value, "${red}");
    }

    #[test]
    fn test_standalone_interpolation_before_declaration() {
        let root = parse_with("${a} ${b} color: red", &[(0, 3), (5, 8)]);
        let d = decl(&root.nodes[0]);
        assert_eq!(d.prop, "color");
        assert_eq!(d.raws.before.as_deref(), Some("${a} ${b} "));
    }

    #[test]
    fn test_interpolation_glued_to_property() {
        let root = parse_with("${a}${b}color: red", &[(0, 3), (4, 7)]);
        let d = decl(&root.nodes[0]);
        assert_eq!(d.prop, "${b}color");
        assert_eq!(d.raws.before.as_deref(), Some("${a}"));
    }

    #[test]
    fn test_standalone_interpolations_as_only_content() {
        let root = parse_with("${a}${b};", &[(0, 3), (4, 7)]);
        assert!(root.nodes.is_empty());
        assert_eq!(root.raws.after, "${a}${b};");
        assert_eq!(root.raws.semicolon, None);
    }

    #[test]
    fn test_interpolation_before_at_rule() {
        let root = parse_with("${mixin} @media print {}", &[(0, 7)]);
        let media = root.nodes[0].as_at_rule().unwrap();
        assert_eq!(media.raws.before.as_deref(), Some("${mixin} "));
    }

    #[test]
    fn test_interpolation_lines_before_selector() {
        let root = parse_with("${a}\n  .b { }", &[(0, 3)]);
        let rule = root.nodes[0].as_rule().unwrap();
        assert_eq!(rule.selector, ".b");
        assert_eq!(rule.raws.before.as_deref(), Some("${a}\n  "));
    }

    #[test]
    fn test_interpolation_in_selector_on_same_line() {
        let root = parse_with("${a} .b { }", &[(0, 3)]);
        let rule = root.nodes[0].as_rule().unwrap();
        assert_eq!(rule.selector, "${a} .b");
        assert_eq!(rule.raws.before.as_deref(), Some(""));
    }

    #[test]
    fn test_positions_are_translated() {
        let root = parse_fragment(
            "\n  color: red;",
            &FragmentOptions::new().with_origin(Position::new(27, 3, 28)),
        )
        .unwrap();
        let source = root.nodes[0].source().unwrap();
        assert_eq!(source.start, Position::new(30, 4, 3));
        assert_eq!(root.raws.range_start, 27);
        assert_eq!(root.raws.range_end, 41);
        assert_eq!(root.source.end, Some(Position::new(41, 4, 14)));
    }

    #[test]
    fn test_unknown_word() {
        assert_eq!(parse_err("a b"), "<css input>:1:1: Unknown word a");
        let err = parse_fragment(
            "color: red; ${a} oops",
            &FragmentOptions::new()
                .with_interpolations(vec![Interpolation::new(12, 15)])
                .with_origin(Position::new(27, 1, 28)),
        )
        .unwrap_err();
        assert_eq!(err.kind, CssSyntaxErrorKind::UnknownWord("oops".to_string()));
        assert_eq!((err.offset, err.line, err.column), (44, 1, 45));
    }

    #[test]
    fn test_unknown_word_between_prop_and_colon() {
        assert_eq!(parse_err("a b: c;"), "<css input>:1:3: Unknown word b");
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(parse_err("a {"), "<css input>:1:1: Unclosed block");
        assert_eq!(parse_err("}"), "<css input>:1:1: Unexpected }");
        assert_eq!(parse_err("a: (b"), "<css input>:1:4: Unclosed bracket");
        assert_eq!(parse_err("@ a;"), "<css input>:1:1: At-rule without name");
        assert_eq!(
            parse_err("a: b c: d"),
            "<css input>:1:5: Missed semicolon"
        );
        assert_eq!(parse_err("a: :b"), "<css input>:1:4: Double colon");
    }

    #[test]
    fn test_error_reports_file_and_shifted_column() {
        let err = parse_fragment(
            "\n  a {",
            &FragmentOptions::new()
                .with_origin(Position::new(10, 2, 11))
                .with_from("Button.tsx"),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Button.tsx:3:3: Unclosed block");
    }
}
