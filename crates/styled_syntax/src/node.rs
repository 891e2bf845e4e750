//! Style tree produced by the parser.
//!
//! The tree is owned top-down: a [`Root`] owns its children, containers own
//! theirs. There are no parent pointers; anything that needs to know where a
//! node sits (its depth, whether it opens the root) gets that from the walk
//! that reached it, see [`Descendants`].
//!
//! Formatting that doesn't change meaning lives in [`Raws`]. A raw left as
//! `None` (as on nodes built by hand) is inferred from the rest of the tree
//! when printing.

use std::fmt;

use crate::stringifier;

/// A position in the full source. Line and column are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Position {
    /// Byte offset.
    pub offset: usize,
    pub line: usize,
    /// Counted in characters.
    pub column: usize,
}

impl Position {
    pub const fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Where a node came from. `end` is unknown for nodes cut short by the end of
/// input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Source {
    pub start: Position,
    pub end: Option<Position>,
}

impl Source {
    pub const fn new(start: Position) -> Self {
        Self { start, end: None }
    }
}

/// A value next to the raw text it was cleaned from.
///
/// The raw text is printed only while `value` still matches the node's field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawValue {
    pub value: String,
    pub raw: String,
}

/// Formatting of a child node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Raws {
    /// Text before the node: whitespace, stray semicolons, standalone
    /// interpolations.
    pub before: Option<String>,
    /// Text before a container's closing `}`.
    pub after: Option<String>,
    /// Between property and value, or between selector/params and `{`.
    pub between: Option<String>,
    /// Whether the last child of a container ends with `;`.
    pub semicolon: Option<bool>,
    /// Spelling of `!important` when it isn't exactly ` !important`.
    pub important: Option<String>,
    /// Between an at-rule's name and its params.
    pub after_name: Option<String>,
    /// Inside a comment, after `/*`.
    pub left: Option<String>,
    /// Inside a comment, before `*/`.
    pub right: Option<String>,
    /// A `;` (with leading whitespace) right after a rule's `}`.
    pub own_semicolon: Option<String>,
    pub selector: Option<RawValue>,
    pub value: Option<RawValue>,
    pub params: Option<RawValue>,
    /// Where the raws above end in the full source.
    pub ends: RawEnds,
}

/// Absolute offsets just past the last character of a raw.
///
/// Recorded by the parser so nested fragments can be found inside a raw
/// even when `source` covers more or less than the raw does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawEnds {
    pub before: Option<usize>,
    /// Offset of the closing `}`.
    pub after: Option<usize>,
    pub own_semicolon: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// May be or contain an interpolation, e.g. `${prop}` or `${prefix}-color`.
    pub prop: String,
    pub value: String,
    pub important: bool,
    pub raws: Raws,
    pub source: Option<Source>,
}

impl Declaration {
    pub fn new(prop: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            prop: prop.into(),
            value: value.into(),
            important: false,
            raws: Raws::default(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    pub selector: String,
    pub nodes: Vec<Node>,
    pub raws: Raws,
    pub source: Option<Source>,
}

impl Rule {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            nodes: Vec::new(),
            raws: Raws::default(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtRule {
    /// Without the leading `@`.
    pub name: String,
    pub params: String,
    /// `None` for bodyless at-rules such as `@import url(a.css);`.
    pub nodes: Option<Vec<Node>>,
    pub raws: Raws,
    pub source: Option<Source>,
}

impl AtRule {
    pub fn new(name: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: params.into(),
            nodes: None,
            raws: Raws::default(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
    pub raws: Raws,
    pub source: Option<Source>,
}

impl Comment {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            raws: Raws::default(),
            source: None,
        }
    }
}

/// A child of a [`Root`] or of another container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Declaration(Declaration),
    Rule(Rule),
    AtRule(AtRule),
    Comment(Comment),
}

impl Node {
    pub fn raws(&self) -> &Raws {
        match self {
            Self::Declaration(node) => &node.raws,
            Self::Rule(node) => &node.raws,
            Self::AtRule(node) => &node.raws,
            Self::Comment(node) => &node.raws,
        }
    }

    pub fn raws_mut(&mut self) -> &mut Raws {
        match self {
            Self::Declaration(node) => &mut node.raws,
            Self::Rule(node) => &mut node.raws,
            Self::AtRule(node) => &mut node.raws,
            Self::Comment(node) => &mut node.raws,
        }
    }

    pub fn source(&self) -> Option<&Source> {
        match self {
            Self::Declaration(node) => node.source.as_ref(),
            Self::Rule(node) => node.source.as_ref(),
            Self::AtRule(node) => node.source.as_ref(),
            Self::Comment(node) => node.source.as_ref(),
        }
    }

    pub fn source_mut(&mut self) -> Option<&mut Source> {
        match self {
            Self::Declaration(node) => node.source.as_mut(),
            Self::Rule(node) => node.source.as_mut(),
            Self::AtRule(node) => node.source.as_mut(),
            Self::Comment(node) => node.source.as_mut(),
        }
    }

    /// Children, for rules and at-rules with a body.
    pub fn nodes(&self) -> Option<&[Node]> {
        match self {
            Self::Rule(rule) => Some(&rule.nodes),
            Self::AtRule(at_rule) => at_rule.nodes.as_deref(),
            Self::Declaration(_) | Self::Comment(_) => None,
        }
    }

    pub fn nodes_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Self::Rule(rule) => Some(&mut rule.nodes),
            Self::AtRule(at_rule) => at_rule.nodes.as_mut(),
            Self::Declaration(_) | Self::Comment(_) => None,
        }
    }

    pub fn as_declaration(&self) -> Option<&Declaration> {
        match self {
            Self::Declaration(decl) => Some(decl),
            _ => None,
        }
    }

    pub fn as_rule(&self) -> Option<&Rule> {
        match self {
            Self::Rule(rule) => Some(rule),
            _ => None,
        }
    }

    pub fn as_at_rule(&self) -> Option<&AtRule> {
        match self {
            Self::AtRule(at_rule) => Some(at_rule),
            _ => None,
        }
    }

    pub fn as_comment(&self) -> Option<&Comment> {
        match self {
            Self::Comment(comment) => Some(comment),
            _ => None,
        }
    }

    pub fn is_declaration(&self) -> bool {
        matches!(self, Self::Declaration(_))
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Self::Comment(_))
    }
}

impl From<Declaration> for Node {
    fn from(node: Declaration) -> Self {
        Self::Declaration(node)
    }
}

impl From<Rule> for Node {
    fn from(node: Rule) -> Self {
        Self::Rule(node)
    }
}

impl From<AtRule> for Node {
    fn from(node: AtRule) -> Self {
        Self::AtRule(node)
    }
}

impl From<Comment> for Node {
    fn from(node: Comment) -> Self {
        Self::Comment(node)
    }
}

/// Role of a root in its document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FragmentKind {
    /// A top-level fragment, printed between the JS code around it.
    Component {
        /// Source text from the previous component (or the start of the
        /// file) up to this fragment.
        code_before: String,
        /// Source text after this fragment; only set on the last component.
        code_after: Option<String>,
    },
    /// A fragment nested inside another fragment's `${...}`.
    Interpolation {
        /// The fragment text as it appears in the source.
        original_content: String,
    },
}

/// Formatting and placement of a [`Root`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRaws {
    /// Text after the last child.
    pub after: String,
    /// Whether the last child ends with `;`. Unset when the root is empty.
    pub semicolon: Option<bool>,
    /// Always true: a fragment behaves like the body of a rule.
    pub is_rule_like: bool,
    /// Absolute offset of the fragment, just after the opening backtick.
    pub range_start: usize,
    /// Absolute offset of the closing backtick.
    pub range_end: usize,
    pub fragment: FragmentKind,
}

/// One parsed fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Root {
    pub nodes: Vec<Node>,
    pub raws: RootRaws,
    pub source: Source,
}

impl Root {
    pub fn is_component(&self) -> bool {
        matches!(self.raws.fragment, FragmentKind::Component { .. })
    }

    pub fn code_before(&self) -> Option<&str> {
        match &self.raws.fragment {
            FragmentKind::Component { code_before, .. } => Some(code_before),
            FragmentKind::Interpolation { .. } => None,
        }
    }

    pub fn code_after(&self) -> Option<&str> {
        match &self.raws.fragment {
            FragmentKind::Component { code_after, .. } => code_after.as_deref(),
            FragmentKind::Interpolation { .. } => None,
        }
    }

    /// Source text of a nested fragment.
    pub fn original_content(&self) -> Option<&str> {
        match &self.raws.fragment {
            FragmentKind::Interpolation { original_content } => Some(original_content),
            FragmentKind::Component { .. } => None,
        }
    }
}

/// Shared behavior of nodes with children.
pub trait Container {
    fn nodes(&self) -> &[Node];

    fn nodes_mut(&mut self) -> &mut Vec<Node>;

    fn first(&self) -> Option<&Node> {
        self.nodes().first()
    }

    fn last(&self) -> Option<&Node> {
        self.nodes().last()
    }

    fn append(&mut self, node: impl Into<Node>)
    where
        Self: Sized,
    {
        self.nodes_mut().push(node.into());
    }

    /// Every descendant in document order, with depth and index.
    fn descendants(&self) -> Descendants<'_> {
        Descendants::new(self.nodes())
    }

    /// Visit every descendant in document order. Returning `false` from the
    /// callback stops the walk; the result tells whether it ran to the end.
    fn walk(&self, mut f: impl FnMut(&Node) -> bool) -> bool {
        self.descendants().all(|entry| f(entry.node))
    }

    fn walk_decls(&self, mut f: impl FnMut(&Declaration) -> bool) -> bool {
        self.walk(|node| node.as_declaration().is_none_or(&mut f))
    }

    fn walk_rules(&self, mut f: impl FnMut(&Rule) -> bool) -> bool {
        self.walk(|node| node.as_rule().is_none_or(&mut f))
    }

    fn walk_at_rules(&self, mut f: impl FnMut(&AtRule) -> bool) -> bool {
        self.walk(|node| node.as_at_rule().is_none_or(&mut f))
    }

    fn walk_comments(&self, mut f: impl FnMut(&Comment) -> bool) -> bool {
        self.walk(|node| node.as_comment().is_none_or(&mut f))
    }
}

impl Container for Root {
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }
}

impl Container for Rule {
    fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    fn nodes_mut(&mut self) -> &mut Vec<Node> {
        &mut self.nodes
    }
}

impl Container for AtRule {
    fn nodes(&self) -> &[Node] {
        self.nodes.as_deref().unwrap_or_default()
    }

    fn nodes_mut(&mut self) -> &mut Vec<Node> {
        self.nodes.get_or_insert_with(Vec::new)
    }
}

/// A node reached by [`Descendants`].
#[derive(Debug, Clone, Copy)]
pub struct WalkEntry<'n> {
    pub node: &'n Node,
    /// 1 for direct children of the container being walked.
    pub depth: usize,
    /// Position among its siblings.
    pub index: usize,
}

/// Pre-order iterator over a container's descendants.
pub struct Descendants<'n> {
    stack: Vec<std::iter::Enumerate<std::slice::Iter<'n, Node>>>,
}

impl<'n> Descendants<'n> {
    pub(crate) fn new(nodes: &'n [Node]) -> Self {
        Self {
            stack: vec![nodes.iter().enumerate()],
        }
    }
}

impl<'n> Iterator for Descendants<'n> {
    type Item = WalkEntry<'n>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let depth = self.stack.len();
            let level = self.stack.last_mut()?;
            match level.next() {
                Some((index, node)) => {
                    if let Some(children) = node.nodes() {
                        self.stack.push(children.iter().enumerate());
                    }
                    return Some(WalkEntry { node, depth, index });
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringifier::node_to_string(self))
    }
}

impl fmt::Display for Root {
    /// The CSS of this fragment alone, without the surrounding code.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringifier::root_to_string(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Rule {
        let mut inner = Rule::new("&:hover");
        inner.append(Declaration::new("color", "blue"));
        let mut media = AtRule::new("media", "screen");
        media.append(Comment::new("note"));

        let mut rule = Rule::new("a");
        rule.append(Declaration::new("color", "red"));
        rule.append(inner);
        rule.append(media);
        rule
    }

    #[test]
    fn test_descendants_are_pre_order_with_depth() {
        let rule = sample();
        let entries: Vec<(usize, usize, bool)> = rule
            .descendants()
            .map(|entry| (entry.depth, entry.index, entry.node.is_declaration()))
            .collect();
        assert_eq!(
            entries,
            vec![
                (1, 0, true),
                (1, 1, false),
                (2, 0, true),
                (1, 2, false),
                (2, 0, false),
            ]
        );
    }

    #[test]
    fn test_walk_decls() {
        let rule = sample();
        let mut values = Vec::new();
        assert!(rule.walk_decls(|decl| {
            values.push(decl.value.clone());
            true
        }));
        assert_eq!(values, vec!["red", "blue"]);
    }

    #[test]
    fn test_walk_stops_early() {
        let rule = sample();
        let mut seen = 0;
        let finished = rule.walk(|_| {
            seen += 1;
            seen < 2
        });
        assert!(!finished);
        assert_eq!(seen, 2);
    }

    #[test]
    fn test_walk_comments_and_at_rules() {
        let rule = sample();
        let mut comments = Vec::new();
        rule.walk_comments(|comment| {
            comments.push(comment.text.clone());
            true
        });
        assert_eq!(comments, vec!["note"]);

        let mut names = Vec::new();
        rule.walk_at_rules(|at_rule| {
            names.push(at_rule.name.clone());
            true
        });
        assert_eq!(names, vec!["media"]);
    }

    #[test]
    fn test_bodyless_at_rule_gets_body_on_append() {
        let mut at_rule = AtRule::new("import", "url(a.css)");
        assert!(at_rule.first().is_none());
        assert!(Node::from(at_rule.clone()).nodes().is_none());
        at_rule.append(Declaration::new("a", "b"));
        assert_eq!(at_rule.nodes.as_ref().map(Vec::len), Some(1));
    }
}
