//! Document assembly: located fragments to one [`Document`].
//!
//! Each fragment is classified before it is parsed. A fragment sitting inside
//! another fragment's `${...}` is a nested interpolation and keeps its source
//! text for splicing on print. Every other fragment is a component and owns
//! the host code in front of it; the last component also owns the code after
//! it.

use std::fmt;

use crate::{
    error::CssSyntaxError,
    locator::{FragmentRecord, locate_fragments},
    node::{FragmentKind, Root},
    options::ParseOptions,
    parser::{FragmentOptions, parse_fragment},
    stringifier,
    tokenizer::Interpolation,
};

/// A parsed host file: one root per fragment, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub nodes: Vec<Root>,
    /// The full host source.
    pub source: String,
}

impl Document {
    /// Assemble a document from fragments found by any locator.
    ///
    /// `fragments` must be in source order. Their role is decided by
    /// containment, not by order.
    ///
    /// # Errors
    ///
    /// Returns the first [`CssSyntaxError`] raised by a fragment.
    pub fn from_fragments(
        source: &str,
        fragments: &[FragmentRecord],
        options: &ParseOptions,
    ) -> Result<Self, CssSyntaxError> {
        let is_component: Vec<bool> = fragments
            .iter()
            .map(|fragment| !fragments.iter().any(|other| fragment.is_nested_in(other)))
            .collect();
        let last_component = is_component.iter().rposition(|&component| component);

        let mut previous_end = 0;
        let mut nodes = Vec::with_capacity(fragments.len());
        for (index, fragment) in fragments.iter().enumerate() {
            let kind = if is_component[index] {
                let code_before = source
                    .get(previous_end..fragment.range_start)
                    .unwrap_or_default()
                    .to_string();
                previous_end = fragment.range_end;
                let code_after = (last_component == Some(index)).then(|| {
                    source
                        .get(fragment.range_end..)
                        .unwrap_or_default()
                        .to_string()
                });
                FragmentKind::Component {
                    code_before,
                    code_after,
                }
            } else {
                FragmentKind::Interpolation {
                    original_content: fragment.text.clone(),
                }
            };

            let interpolations = fragment
                .interpolation_ranges
                .iter()
                .map(|range| {
                    Interpolation::new(
                        range.start.saturating_sub(fragment.range_start),
                        range.end.saturating_sub(fragment.range_start + 1),
                    )
                })
                .collect();
            let fragment_options = FragmentOptions {
                interpolations,
                origin: fragment.location_start,
                from: options.from.clone(),
                fragment: kind,
            };
            nodes.push(parse_fragment(&fragment.text, &fragment_options)?);
        }

        tracing::trace!(
            roots = nodes.len(),
            components = is_component.iter().filter(|&&component| component).count(),
            "assembled document"
        );

        Ok(Self {
            nodes,
            source: source.to_string(),
        })
    }

    /// Roots that stand on their own in the host code.
    pub fn components(&self) -> impl Iterator<Item = &Root> {
        self.nodes.iter().filter(|root| root.is_component())
    }
}

impl fmt::Display for Document {
    /// The host source, with every edit to the tree applied.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&stringifier::document_to_string(self))
    }
}

/// Parse a JavaScript/TypeScript source into a [`Document`].
///
/// Host code that doesn't parse yields an empty document, which prints back
/// verbatim.
///
/// # Errors
///
/// Returns a [`CssSyntaxError`] when a fragment is not valid styled CSS.
pub fn parse(source: &str, options: &ParseOptions) -> Result<Document, CssSyntaxError> {
    let _span = tracing::debug_span!("parse", file = options.from.as_deref()).entered();
    let located = locate_fragments(source, options);
    Document::from_fragments(source, &located.fragments, options)
}

/// Shorthand for [`Document::from_fragments`].
///
/// # Errors
///
/// Returns the first [`CssSyntaxError`] raised by a fragment.
pub fn parse_fragments(
    source: &str,
    fragments: &[FragmentRecord],
    options: &ParseOptions,
) -> Result<Document, CssSyntaxError> {
    Document::from_fragments(source, fragments, options)
}
