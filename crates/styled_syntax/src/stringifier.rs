//! Stringifier: style tree back to source text.
//!
//! Printing a [`Document`] runs in two passes:
//!
//! 1. Every nested fragment (a root living inside another fragment's `${...}`)
//!    is rendered on its own, innermost first.
//! 2. Component roots are printed in document order, each framed by the host
//!    code around it. Whenever a `before`/`after` raw contains `${`, the
//!    rendered nested fragments that fall inside it are spliced in, so edits
//!    to nested fragments show up in the output.
//!
//! Raws missing from the tree (nodes built or edited by hand) are inferred
//! from other nodes of the same root, falling back to fixed defaults. The tree
//! is never written to; inferred values live in a cache owned by one printer.

use std::{borrow::Cow, cmp::Reverse};

use cow_utils::CowUtils;
use rustc_hash::FxHashMap;

use crate::{
    document::Document,
    node::{AtRule, Comment, Declaration, Descendants, Node, RawValue, Root, Rule},
};

/// Print `document` into `builder`, one piece at a time.
///
/// An unedited document prints back to exactly the source it was parsed
/// from. A document without fragments prints its source verbatim.
pub fn stringify(document: &Document, mut builder: impl FnMut(&str)) {
    if document.nodes.is_empty() {
        builder(&document.source);
        return;
    }

    let rendered = render_nested(&document.nodes);
    for root in document.nodes.iter().filter(|root| root.is_component()) {
        Printer::new(&root.nodes, &rendered, &mut builder).root(root);
    }
}

/// Print a single root together with its surrounding code.
pub fn stringify_root(root: &Root, mut builder: impl FnMut(&str)) {
    Printer::new(&root.nodes, &[], &mut builder).root(root);
}

pub(crate) fn document_to_string(document: &Document) -> String {
    let mut out = String::with_capacity(document.source.len());
    stringify(document, |text| out.push_str(text));
    out
}

/// The CSS of a root, without the code around it.
pub(crate) fn root_to_string(root: &Root) -> String {
    let mut out = String::new();
    {
        let mut sink = |text: &str| out.push_str(text);
        let mut printer = Printer::new(&root.nodes, &[], &mut sink);
        let semicolon = root
            .raws
            .semicolon
            .unwrap_or_else(|| printer.infer_semicolon());
        printer.body(&root.nodes, semicolon, Parent::Root, 0);
        printer.print_raw(&root.raws.after, None);
    }
    out
}

/// A node printed on its own, without its `before` raw.
pub(crate) fn node_to_string(node: &Node) -> String {
    let mut out = String::new();
    {
        let mut sink = |text: &str| out.push_str(text);
        Printer::new(node.nodes().unwrap_or_default(), &[], &mut sink).node(
            node,
            Place::FLOATING,
            false,
        );
    }
    out
}

/// A nested fragment rendered in the first pass.
#[derive(Debug)]
struct RenderedFragment {
    start: usize,
    end: usize,
    content: String,
    original_content: String,
}

fn render_nested(roots: &[Root]) -> Vec<RenderedFragment> {
    let mut nested: Vec<&Root> = roots.iter().filter(|root| !root.is_component()).collect();
    // A fragment is shorter than any fragment around it.
    nested.sort_by_key(|root| root.raws.range_end.saturating_sub(root.raws.range_start));

    let mut rendered = Vec::with_capacity(nested.len());
    for root in nested {
        let mut content = String::new();
        {
            let mut sink = |text: &str| content.push_str(text);
            Printer::new(&root.nodes, &rendered, &mut sink).root(root);
        }
        rendered.push(RenderedFragment {
            start: root.raws.range_start,
            end: root.raws.range_end,
            content,
            original_content: root.original_content().unwrap_or_default().to_string(),
        });
    }
    tracing::trace!(fragments = rendered.len(), "rendered nested fragments");
    rendered
}

/// Replace nested fragments inside a raw that ends at absolute offset `end`.
///
/// Only the outermost fragments are spliced: their rendered content already
/// includes the fragments nested in them. When the raw was edited and the
/// offsets no longer line up, the first occurrence of each fragment's
/// original text is replaced instead.
fn splice_interpolations<'t>(
    rendered: &[RenderedFragment],
    text: &'t str,
    end: usize,
) -> Cow<'t, str> {
    if rendered.is_empty() || !text.contains("${") {
        return Cow::Borrowed(text);
    }
    let start = end.saturating_sub(text.len());

    let mut inside: Vec<&RenderedFragment> = rendered
        .iter()
        .filter(|fragment| start <= fragment.start && fragment.end <= end)
        .collect();
    if inside.is_empty() {
        return Cow::Borrowed(text);
    }
    inside.sort_by_key(|fragment| (fragment.start, Reverse(fragment.end)));

    let mut outermost: Vec<&RenderedFragment> = Vec::with_capacity(inside.len());
    for fragment in inside {
        if outermost.last().is_none_or(|outer| fragment.start >= outer.end) {
            outermost.push(fragment);
        }
    }

    let lines_up = outermost.iter().all(|fragment| {
        text.get(fragment.start - start..fragment.end - start)
            == Some(fragment.original_content.as_str())
    });

    if lines_up {
        let mut out = String::with_capacity(text.len());
        let mut cursor = 0;
        for fragment in &outermost {
            out.push_str(&text[cursor..fragment.start - start]);
            out.push_str(&fragment.content);
            cursor = fragment.end - start;
        }
        out.push_str(&text[cursor..]);
        return Cow::Owned(out);
    }

    let mut out = text.to_string();
    for fragment in outermost {
        let replaced = out
            .cow_replacen(fragment.original_content.as_str(), &fragment.content, 1)
            .into_owned();
        out = replaced;
    }
    Cow::Owned(out)
}

/// Raws that can be inferred from the rest of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum Detect {
    BeforeDecl,
    BeforeRule,
    BeforeClose,
    BeforeComment,
    BeforeOpen,
    Colon,
    EmptyBody,
    Indent,
    CommentLeft,
    CommentRight,
}

impl Detect {
    const fn default_value(self) -> &'static str {
        match self {
            Self::BeforeDecl | Self::BeforeRule | Self::BeforeClose | Self::BeforeComment => "\n",
            Self::BeforeOpen | Self::CommentLeft | Self::CommentRight => " ",
            Self::Colon => ": ",
            Self::EmptyBody => "",
            Self::Indent => "    ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Parent {
    /// The node is printed on its own.
    None,
    Root,
    Node,
}

/// Where a node sits, as seen by the walk that reached it.
#[derive(Debug, Clone, Copy)]
struct Place {
    parent: Parent,
    /// Number of containers between the node and its root.
    depth: usize,
    index: usize,
}

impl Place {
    const FLOATING: Self = Self {
        parent: Parent::None,
        depth: 0,
        index: 0,
    };

    fn is_floating(self) -> bool {
        self.parent == Parent::None
    }
}

#[derive(Debug, Clone, Copy)]
enum Side {
    Before,
    After,
}

struct Printer<'n, 'b> {
    /// Nodes consulted when a raw has to be inferred.
    scope: &'n [Node],
    rendered: &'b [RenderedFragment],
    out: &'b mut dyn FnMut(&str),
    cache: FxHashMap<Detect, String>,
    semicolon: Option<bool>,
}

impl<'n, 'b> Printer<'n, 'b> {
    fn new(
        scope: &'n [Node],
        rendered: &'b [RenderedFragment],
        out: &'b mut dyn FnMut(&str),
    ) -> Self {
        Self {
            scope,
            rendered,
            out,
            cache: FxHashMap::default(),
            semicolon: None,
        }
    }

    fn write(&mut self, text: &str) {
        (self.out)(text);
    }

    /// Print a raw that ends at `end`, splicing nested fragments into it.
    fn print_raw(&mut self, text: &str, end: Option<usize>) {
        if text.is_empty() {
            return;
        }
        let text = match end {
            Some(end) => splice_interpolations(self.rendered, text, end),
            None => Cow::Borrowed(text),
        };
        (self.out)(&text);
    }

    fn root(&mut self, root: &'n Root) {
        if let Some(code_before) = root.code_before() {
            self.print_raw(code_before, None);
        }
        let semicolon = root
            .raws
            .semicolon
            .unwrap_or_else(|| self.infer_semicolon());
        self.body(&root.nodes, semicolon, Parent::Root, 0);
        self.print_raw(&root.raws.after, Some(root.raws.range_end));
        if let Some(code_after) = root.code_after() {
            self.print_raw(code_after, None);
        }
    }

    fn body(&mut self, nodes: &'n [Node], semicolon: bool, parent: Parent, depth: usize) {
        let last = nodes.iter().rposition(|node| !node.is_comment()).unwrap_or(0);
        for (index, child) in nodes.iter().enumerate() {
            let place = Place {
                parent,
                depth,
                index,
            };
            let before = self.raw_before(child, place);
            let before_end = child
                .raws()
                .ends
                .before
                .or_else(|| child.source().map(|source| source.start.offset));
            self.print_raw(&before, before_end);
            self.node(child, place, index != last || semicolon);
        }
    }

    fn node(&mut self, node: &'n Node, place: Place, semicolon: bool) {
        match node {
            Node::Declaration(decl) => self.decl(decl, place, semicolon),
            Node::Rule(rule) => self.rule(node, rule, place),
            Node::AtRule(at_rule) => self.at_rule(node, at_rule, place, semicolon),
            Node::Comment(comment) => self.comment(comment, place),
        }
    }

    fn decl(&mut self, decl: &'n Declaration, place: Place, semicolon: bool) {
        let between = self.raw_or_infer(decl.raws.between.as_deref(), place, Detect::Colon);
        let mut text = String::new();
        text.push_str(&decl.prop);
        text.push_str(&between);
        text.push_str(raw_value(&decl.value, decl.raws.value.as_ref()));
        if decl.important {
            text.push_str(
                decl.raws
                    .important
                    .as_deref()
                    .filter(|important| !important.is_empty())
                    .unwrap_or(" !important"),
            );
        }
        if semicolon {
            text.push(';');
        }
        self.write(&text);
    }

    fn rule(&mut self, node: &'n Node, rule: &'n Rule, place: Place) {
        self.block(node, raw_value(&rule.selector, rule.raws.selector.as_ref()), place);
        if let Some(own_semicolon) = &rule.raws.own_semicolon {
            self.print_raw(own_semicolon, rule.raws.ends.own_semicolon);
        }
    }

    fn at_rule(&mut self, node: &'n Node, at_rule: &'n AtRule, place: Place, semicolon: bool) {
        let params = if at_rule.params.is_empty() {
            ""
        } else {
            raw_value(&at_rule.params, at_rule.raws.params.as_ref())
        };
        let mut start = format!("@{}", at_rule.name);
        match &at_rule.raws.after_name {
            Some(after_name) => start.push_str(after_name),
            None if !params.is_empty() => start.push(' '),
            None => {}
        }
        start.push_str(params);

        if at_rule.nodes.is_some() {
            self.block(node, &start, place);
        } else {
            start.push_str(at_rule.raws.between.as_deref().unwrap_or_default());
            if semicolon {
                start.push(';');
            }
            self.write(&start);
        }
    }

    fn comment(&mut self, comment: &'n Comment, place: Place) {
        let left = self.raw_or_infer(comment.raws.left.as_deref(), place, Detect::CommentLeft);
        let right = self.raw_or_infer(comment.raws.right.as_deref(), place, Detect::CommentRight);
        self.write(&format!("/*{left}{}{right}*/", comment.text));
    }

    fn block(&mut self, node: &'n Node, start: &str, place: Place) {
        let raws = node.raws();
        let between = self.raw_or_infer(raws.between.as_deref(), place, Detect::BeforeOpen);
        self.write(&format!("{start}{between}{{"));

        let children = node.nodes().unwrap_or_default();
        let after = if children.is_empty() {
            self.raw_or_infer(raws.after.as_deref(), place, Detect::EmptyBody)
        } else {
            let semicolon = match raws.semicolon {
                Some(semicolon) => semicolon,
                None if place.is_floating() => false,
                None => self.infer_semicolon(),
            };
            self.body(children, semicolon, Parent::Node, place.depth + 1);
            self.raw_after(node, place)
        };
        self.print_raw(&after, raws.ends.after);
        self.write("}");
    }

    // Raw lookup

    fn raw_or_infer(&mut self, own: Option<&'n str>, place: Place, detect: Detect) -> Cow<'n, str> {
        match own {
            Some(own) => Cow::Borrowed(own),
            None if place.is_floating() => Cow::Borrowed(detect.default_value()),
            None => Cow::Owned(self.infer(detect)),
        }
    }

    fn raw_before(&mut self, node: &'n Node, place: Place) -> Cow<'n, str> {
        if let Some(before) = node.raws().before.as_deref() {
            return Cow::Borrowed(before);
        }
        if place.is_floating() || (place.parent == Parent::Root && place.index == 0) {
            return Cow::Borrowed("");
        }
        Cow::Owned(self.before_after(node, place, Side::Before))
    }

    fn raw_after(&mut self, node: &'n Node, place: Place) -> Cow<'n, str> {
        if let Some(after) = node.raws().after.as_deref() {
            return Cow::Borrowed(after);
        }
        if place.is_floating() {
            return Cow::Borrowed("\n");
        }
        Cow::Owned(self.before_after(node, place, Side::After))
    }

    fn before_after(&mut self, node: &Node, place: Place, side: Side) -> String {
        let mut value = match (node, side) {
            (Node::Declaration(_), _) => self.infer(Detect::BeforeDecl),
            (Node::Comment(_), _) => self.infer(Detect::BeforeComment),
            (_, Side::Before) => self.infer(Detect::BeforeRule),
            (_, Side::After) => self.infer(Detect::BeforeClose),
        };
        if value.contains('\n') {
            let indent = self.infer(Detect::Indent);
            value.push_str(&indent.repeat(place.depth));
        }
        value
    }

    // Inference

    fn walk(&self) -> Descendants<'n> {
        Descendants::new(self.scope)
    }

    fn infer(&mut self, detect: Detect) -> String {
        if let Some(value) = self.cache.get(&detect) {
            return value.clone();
        }
        let value = match detect {
            Detect::BeforeDecl => Some(
                match self
                    .walk()
                    .find_map(|entry| entry.node.as_declaration()?.raws.before.as_deref())
                {
                    Some(before) => clean_before(before),
                    None => self.infer(Detect::BeforeRule),
                },
            ),
            Detect::BeforeComment => Some(
                match self
                    .walk()
                    .find_map(|entry| entry.node.as_comment()?.raws.before.as_deref())
                {
                    Some(before) => clean_before(before),
                    None => self.infer(Detect::BeforeDecl),
                },
            ),
            Detect::BeforeRule => self
                .walk()
                .find_map(|entry| {
                    let opens_root = entry.depth == 1 && entry.index == 0;
                    if entry.node.nodes().is_none() || opens_root {
                        return None;
                    }
                    entry.node.raws().before.as_deref()
                })
                .map(clean_before),
            Detect::BeforeClose => self
                .walk()
                .find_map(|entry| {
                    if entry.node.nodes()?.is_empty() {
                        return None;
                    }
                    entry.node.raws().after.as_deref()
                })
                .map(clean_before),
            Detect::BeforeOpen => self
                .walk()
                .find_map(|entry| {
                    if entry.node.is_declaration() {
                        return None;
                    }
                    entry.node.raws().between.as_deref()
                })
                .map(ToString::to_string),
            Detect::Colon => self
                .walk()
                .find_map(|entry| entry.node.as_declaration()?.raws.between.as_deref())
                .map(|between| {
                    between
                        .chars()
                        .filter(|c| c.is_whitespace() || *c == ':')
                        .collect()
                }),
            Detect::EmptyBody => self
                .walk()
                .find_map(|entry| {
                    if !entry.node.nodes()?.is_empty() {
                        return None;
                    }
                    entry.node.raws().after.as_deref()
                })
                .map(ToString::to_string),
            Detect::Indent => self
                .walk()
                .find_map(|entry| {
                    if entry.depth != 2 {
                        return None;
                    }
                    entry.node.raws().before.as_deref()
                })
                .map(|before| whitespace_only(before.rsplit('\n').next().unwrap_or_default())),
            Detect::CommentLeft => self
                .walk()
                .find_map(|entry| entry.node.raws().left.as_deref())
                .map(ToString::to_string),
            Detect::CommentRight => self
                .walk()
                .find_map(|entry| entry.node.raws().right.as_deref())
                .map(ToString::to_string),
        }
        .unwrap_or_else(|| detect.default_value().to_string());

        self.cache.insert(detect, value.clone());
        value
    }

    fn infer_semicolon(&mut self) -> bool {
        if let Some(semicolon) = self.semicolon {
            return semicolon;
        }
        let semicolon = self
            .walk()
            .find_map(|entry| {
                if !entry.node.nodes()?.last()?.is_declaration() {
                    return None;
                }
                entry.node.raws().semicolon
            })
            .unwrap_or(false);
        self.semicolon = Some(semicolon);
        semicolon
    }
}

/// The raw text when the value hasn't changed since parsing.
fn raw_value<'a>(value: &'a str, raw: Option<&'a RawValue>) -> &'a str {
    match raw {
        Some(raw) if raw.value == value => &raw.raw,
        _ => value,
    }
}

/// Whitespace of a `before`/`after` raw, cut after its last newline.
fn clean_before(value: &str) -> String {
    let value = value.rfind('\n').map_or(value, |i| &value[..=i]);
    whitespace_only(value)
}

fn whitespace_only(value: &str) -> String {
    value.chars().filter(|c| c.is_whitespace()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        node::{Container, FragmentKind, Position, RootRaws, Source},
        parser::{FragmentOptions, parse_fragment},
    };

    fn root(css: &str) -> Root {
        parse_fragment(css, &FragmentOptions::default()).unwrap()
    }

    fn empty_root() -> Root {
        Root {
            nodes: Vec::new(),
            raws: RootRaws {
                after: String::new(),
                semicolon: None,
                is_rule_like: true,
                range_start: 0,
                range_end: 0,
                fragment: FragmentKind::Component {
                    code_before: String::new(),
                    code_after: None,
                },
            },
            source: Source::new(Position::new(0, 1, 1)),
        }
    }

    #[test]
    fn test_root_round_trip() {
        for css in [
            "",
            " \n\tcolor: red;\n",
            "a { color: red } ;",
            "@media screen { a { b: c !IMPORTANT } }",
            "/* c */\n@import url(a.css);\n*zoom: 1",
            "a: b /* c */ d;\n--x: { y: z }",
        ] {
            assert_eq!(root(css).to_string(), css);
        }
    }

    #[test]
    fn test_node_display_skips_before() {
        let root = root("\n  a {\n    color: red;\n  }");
        assert_eq!(root.nodes[0].to_string(), "a {\n    color: red;\n  }");
        let rule = root.nodes[0].as_rule().unwrap();
        assert_eq!(rule.nodes[0].to_string(), "color: red");
    }

    #[test]
    fn test_inferred_raws_follow_siblings() {
        let mut root = root("a {\n  color: red;\n}");
        let Some(Node::Rule(rule)) = root.nodes.first_mut() else {
            panic!("expected a rule");
        };
        rule.append(Declaration::new("margin", "0"));
        insta::assert_snapshot!(root.to_string(), @r"
        a {
          color: red;
          margin: 0;
        }
        ");
    }

    #[test]
    fn test_defaults_for_built_tree() {
        let mut root = empty_root();
        let mut rule = Rule::new("a");
        rule.append(Declaration::new("color", "red"));
        rule.append(Comment::new("note"));
        root.append(rule);
        root.append(AtRule::new("import", "url(a.css)"));
        insta::assert_snapshot!(root.to_string(), @r"
        a {
            color: red
            /* note */
        }
        @import url(a.css)
        ");
    }

    #[test]
    fn test_floating_node_uses_defaults() {
        let mut rule = Rule::new("a");
        rule.append(Declaration::new("color", "red"));
        assert_eq!(Node::from(rule).to_string(), "a {\n    color: red\n}");
        let mut at_rule = AtRule::new("media", "print");
        at_rule.nodes = Some(Vec::new());
        assert_eq!(Node::from(at_rule).to_string(), "@media print {}");
    }

    #[test]
    fn test_raw_value_only_while_unchanged() {
        let mut root = root("a: b /* c */ d");
        assert_eq!(root.to_string(), "a: b /* c */ d");
        let Some(Node::Declaration(decl)) = root.nodes.first_mut() else {
            panic!("expected a declaration");
        };
        decl.value = "e".to_string();
        assert_eq!(root.to_string(), "a: e");
    }

    #[test]
    fn test_stringify_root_includes_code() {
        let mut root = root("color: red;");
        root.raws.fragment = FragmentKind::Component {
            code_before: "css`".to_string(),
            code_after: Some("`;".to_string()),
        };
        let mut out = String::new();
        stringify_root(&root, |text| out.push_str(text));
        assert_eq!(out, "css`color: red;`;");
        assert_eq!(root.to_string(), "color: red;");
    }

    fn fragment(start: usize, end: usize, original: &str, content: &str) -> RenderedFragment {
        RenderedFragment {
            start,
            end,
            content: content.to_string(),
            original_content: original.to_string(),
        }
    }

    #[test]
    fn test_splice_picks_fragment_by_offset() {
        // Two identical nested bodies; only the second one was edited.
        let text = "${css`a: b;`} ${css`a: b;`}";
        let rendered = [
            fragment(106, 111, "a: b;", "a: b;"),
            fragment(120, 125, "a: b;", "a: c;"),
        ];
        assert_eq!(
            splice_interpolations(&rendered, text, 127),
            "${css`a: b;`} ${css`a: c;`}"
        );
    }

    #[test]
    fn test_splice_skips_fragments_outside_raw() {
        let text = "${css`a: b;`}";
        let rendered = [fragment(6, 11, "a: b;", "x")];
        assert_eq!(splice_interpolations(&rendered, text, 100), text);
    }

    #[test]
    fn test_splice_falls_back_to_replace() {
        let text = "  ${css`a: b;`}";
        let rendered = [fragment(6, 11, "a: b;", "a: c;")];
        assert_eq!(
            splice_interpolations(&rendered, text, 16),
            "  ${css`a: c;`}"
        );
    }

    #[test]
    fn test_clean_before() {
        assert_eq!(clean_before("\n  "), "\n");
        assert_eq!(clean_before("${a}\n  "), "\n");
        assert_eq!(clean_before(" ;\n\t x"), " \n");
    }
}
