//! Fragment locator.
//!
//! Parses the host JavaScript/TypeScript with oxc and walks the AST once,
//! collecting every template literal that holds styles:
//!
//! - tagged templates whose tag is `styled.x`, `styled(X)`,
//!   `styled.x.attrs(...)`, `styled(X).attrs(...)`, `css` or
//!   `createGlobalStyle`
//! - `styled.x(props => `...`)` and `styled(X)(props => `...`)`, where the
//!   template is the arrow function's expression body
//!
//! Records come out in pre-order, so an outer template always precedes the
//! templates nested in its `${...}`.

use oxc_allocator::Allocator;
use oxc_ast::ast::{Argument, CallExpression, Expression, TaggedTemplateExpression, TemplateLiteral};
use oxc_ast_visit::{Visit, walk};
use oxc_parser::Parser;

use crate::{diagnostic::Diagnostic, input::Input, node::Position, options::ParseOptions};

/// A `${...}` in the full source, from `$` to just past `}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterpolationRange {
    pub start: usize,
    pub end: usize,
}

/// One template literal holding styles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FragmentRecord {
    /// Text between the backticks.
    pub text: String,
    /// Offset just after the opening backtick.
    pub range_start: usize,
    /// Offset of the closing backtick.
    pub range_end: usize,
    /// Every `${...}` of this template, in source order.
    pub interpolation_ranges: Vec<InterpolationRange>,
    /// Position of `range_start`.
    pub location_start: Position,
}

impl FragmentRecord {
    /// Whether this template sits inside one of `other`'s interpolations.
    pub fn is_nested_in(&self, other: &Self) -> bool {
        other
            .interpolation_ranges
            .iter()
            .any(|range| range.start < self.range_start && self.range_end < range.end)
    }
}

/// Result of [`locate_fragments`].
#[derive(Debug, Default)]
pub struct LocateResult {
    pub fragments: Vec<FragmentRecord>,
    /// Why the host source couldn't be scanned. Empty on success.
    pub diagnostics: Vec<Diagnostic>,
}

/// Find every styled template literal in `source`.
///
/// A host file with syntax errors yields no fragments; the errors are
/// returned as diagnostics.
pub fn locate_fragments(source: &str, options: &ParseOptions) -> LocateResult {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, options.source_type()).parse();

    if ret.panicked || !ret.errors.is_empty() {
        tracing::debug!(
            errors = ret.errors.len(),
            file = options.from.as_deref(),
            "host source has syntax errors, skipping fragment lookup"
        );
        return LocateResult {
            fragments: Vec::new(),
            diagnostics: Diagnostic::from_oxc_list(source, &ret.errors),
        };
    }

    let mut locator = FragmentLocator::new(source);
    locator.visit_program(&ret.program);
    tracing::debug!(fragments = locator.fragments.len(), "located fragments");

    LocateResult {
        fragments: locator.fragments,
        diagnostics: Vec::new(),
    }
}

struct FragmentLocator<'s> {
    source: &'s str,
    lines: Input<'s>,
    fragments: Vec<FragmentRecord>,
}

impl<'s> FragmentLocator<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            lines: Input::standalone(source),
            fragments: Vec::new(),
        }
    }

    fn record(&mut self, template: &TemplateLiteral<'_>) {
        let range_start = template.span.start as usize + 1;
        let range_end = (template.span.end as usize)
            .saturating_sub(1)
            .max(range_start);

        // Element spans exclude the `}` before and the `${` after them, so the
        // gap between two neighbors is exactly one interpolation.
        let interpolation_ranges = template
            .quasis
            .windows(2)
            .map(|pair| InterpolationRange {
                start: pair[0].span.end as usize,
                end: pair[1].span.start as usize,
            })
            .collect();

        self.fragments.push(FragmentRecord {
            text: self
                .source
                .get(range_start..range_end)
                .unwrap_or_default()
                .to_string(),
            range_start,
            range_end,
            interpolation_ranges,
            location_start: self.lines.position(range_start),
        });
    }
}

impl<'a> Visit<'a> for FragmentLocator<'_> {
    fn visit_tagged_template_expression(&mut self, it: &TaggedTemplateExpression<'a>) {
        if is_styled_tag(&it.tag) {
            self.record(&it.quasi);
        }
        walk::walk_tagged_template_expression(self, it);
    }

    fn visit_call_expression(&mut self, it: &CallExpression<'a>) {
        if let Some(template) = styled_call_template(it) {
            self.record(template);
        }
        walk::walk_call_expression(self, it);
    }
}

fn is_styled(expr: &Expression<'_>) -> bool {
    matches!(expr, Expression::Identifier(ident) if ident.name.as_str() == "styled")
}

/// `styled.x` or `styled(X)`.
fn is_styled_factory(expr: &Expression<'_>) -> bool {
    match expr {
        Expression::StaticMemberExpression(member) => is_styled(&member.object),
        Expression::CallExpression(call) => is_styled(&call.callee),
        _ => false,
    }
}

fn is_styled_tag(tag: &Expression<'_>) -> bool {
    match tag {
        Expression::StaticMemberExpression(member) => is_styled(&member.object),
        Expression::CallExpression(call) => {
            is_styled(&call.callee)
                || matches!(
                    &call.callee,
                    Expression::StaticMemberExpression(member) if is_styled_factory(&member.object)
                )
        }
        Expression::Identifier(ident) => {
            matches!(ident.name.as_str(), "css" | "createGlobalStyle")
        }
        _ => false,
    }
}

/// Template returned by the arrow passed to `styled.x(...)` or `styled(X)(...)`.
fn styled_call_template<'b, 'a>(call: &'b CallExpression<'a>) -> Option<&'b TemplateLiteral<'a>> {
    if !is_styled_factory(&call.callee) {
        return None;
    }
    let Some(Argument::ArrowFunctionExpression(arrow)) = call.arguments.first() else {
        return None;
    };
    match arrow.get_expression()? {
        Expression::TemplateLiteral(template) => Some(template),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locate(source: &str) -> Vec<FragmentRecord> {
        let result = locate_fragments(source, &ParseOptions::default());
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        result.fragments
    }

    fn texts(source: &str) -> Vec<String> {
        locate(source).into_iter().map(|f| f.text).collect()
    }

    #[test]
    fn test_tagged_template_shapes() {
        let source = r"
let a = styled.div`a: 1;`;
let b = styled(Button)`b: 1;`;
let c = styled.div.attrs({ x: 1 })`c: 1;`;
let d = styled(Button).attrs({ x: 1 })`d: 1;`;
let e = css`e: 1;`;
let f = createGlobalStyle`f: 1;`;
";
        assert_eq!(
            texts(source),
            ["a: 1;", "b: 1;", "c: 1;", "d: 1;", "e: 1;", "f: 1;"]
        );
    }

    #[test]
    fn test_ignores_other_templates() {
        let source = r"
let a = `plain`;
let b = html`<div></div>`;
let c = styled['div']`a: 1;`;
let d = notStyled.div`a: 1;`;
let e = styles.css`a: 1;`;
";
        assert!(texts(source).is_empty());
    }

    #[test]
    fn test_typescript_generic() {
        let source = "const Box = styled.div<{ $wide: boolean }>`width: 1px;`;";
        assert_eq!(texts(source), ["width: 1px;"]);
    }

    #[test]
    fn test_call_with_arrow_template() {
        let source = "let Component = styled.div(props => `color: red;`);";
        let fragments = locate(source);
        assert_eq!(fragments.len(), 1);
        assert_eq!(fragments[0].text, "color: red;");
        assert_eq!(fragments[0].range_start, 37);
        assert_eq!(fragments[0].range_end, 48);

        let source = "let Component = styled(Button)(() => `color: red;`);";
        assert_eq!(texts(source), ["color: red;"]);

        let source = "let Component = styled.div(props => { return `color: red;`; });";
        assert!(texts(source).is_empty());
    }

    #[test]
    fn test_ranges_and_location() {
        let source = "// header\nlet a = css`a: ${b};`;";
        let fragments = locate(source);
        let fragment = &fragments[0];
        assert_eq!(fragment.text, "a: ${b};");
        assert_eq!(fragment.range_start, 22);
        assert_eq!(fragment.range_end, 30);
        assert_eq!(
            fragment.interpolation_ranges,
            [InterpolationRange { start: 25, end: 29 }]
        );
        assert_eq!(fragment.location_start, Position::new(22, 2, 13));
    }

    #[test]
    fn test_nested_templates_follow_outer() {
        let source = "let A = styled.div`\n\t${css`color: red;`}\n`;\nlet B = css``;";
        let fragments = locate(source);
        assert_eq!(fragments.len(), 3);
        assert_eq!(fragments[1].text, "color: red;");
        assert!(fragments[1].is_nested_in(&fragments[0]));
        assert!(!fragments[0].is_nested_in(&fragments[1]));
        assert!(!fragments[2].is_nested_in(&fragments[0]));
        assert_eq!(fragments[2].text, "");
    }

    #[test]
    fn test_syntax_errors_yield_diagnostics() {
        let result = locate_fragments("let a = css`a: 1;`; let = ;", &ParseOptions::default());
        assert!(result.fragments.is_empty());
        assert!(!result.diagnostics.is_empty());
    }

    #[test]
    fn test_jsx_needs_jsx_source_type() {
        let source = "const A = styled.div`a: 1;`; const B = () => <A />;";
        let result = locate_fragments(source, &ParseOptions::default());
        assert!(!result.diagnostics.is_empty());
        let result = locate_fragments(source, &ParseOptions::new().with_from("A.tsx"));
        assert_eq!(result.fragments.len(), 1);
    }
}
