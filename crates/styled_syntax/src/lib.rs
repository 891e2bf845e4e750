//! Styled Syntax
//!
//! Parses the CSS held in styled-components style tagged templates
//! (`styled.div`, `styled(Button)`, `css`, `createGlobalStyle`) into a style
//! tree, and prints the tree back into the original JavaScript/TypeScript.
//!
//! ## Pipeline
//!
//! 1. [`locate_fragments`] parses the host source with oxc and records every
//!    styled template literal, with its `${...}` holes.
//! 2. Each fragment is tokenized and parsed into a [`Root`]. Interpolations are
//!    opaque tokens that may stand for a property, a value, a selector part or
//!    a whole statement.
//! 3. [`stringify`] prints the [`Document`] back. An unedited document prints
//!    exactly the source it came from; edits to nested `css` fragments are
//!    spliced into the fragments around them.
//!
//! ```
//! use styled_syntax::{Container, ParseOptions, parse};
//!
//! let source = "const Title = styled.h1`\n\tcolor: red;\n`;";
//! let document = parse(source, &ParseOptions::default()).unwrap();
//! assert_eq!(document.to_string(), source);
//!
//! let mut values = Vec::new();
//! document.nodes[0].walk_decls(|decl| {
//!     values.push(decl.value.clone());
//!     true
//! });
//! assert_eq!(values, ["red"]);
//! ```

mod diagnostic;
mod document;
mod error;
mod input;
mod locator;
mod node;
mod options;
mod parser;
mod stringifier;
pub mod tokenizer;

pub use diagnostic::{Diagnostic, DiagnosticLabel, DiagnosticSeverity};
pub use document::{Document, parse, parse_fragments};
pub use error::{CssSyntaxError, CssSyntaxErrorKind};
pub use input::Input;
pub use locator::{FragmentRecord, InterpolationRange, LocateResult, locate_fragments};
pub use node::{
    AtRule, Comment, Container, Declaration, Descendants, FragmentKind, Node, Position, RawEnds,
    RawValue, Raws, Root, RootRaws, Rule, Source, WalkEntry,
};
pub use options::ParseOptions;
pub use parser::{FragmentOptions, parse_fragment};
pub use stringifier::{stringify, stringify_root};
