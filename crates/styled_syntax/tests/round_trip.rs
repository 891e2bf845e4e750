//! Round-trip tests over real-world component files.
//!
//! Uses `insta::glob!` to discover fixture files. Every fixture must parse
//! and print back byte for byte, and the outline of its parsed roots is
//! compared against a co-located `.snap` snapshot file.

use std::{fmt::Write, fs};

use styled_syntax::{Container, Document, Node, ParseOptions, locate_fragments, parse};

/// One line per root and per node, indented by depth.
fn outline(document: &Document) -> String {
    let mut out = String::new();
    for (index, root) in document.nodes.iter().enumerate() {
        let kind = if root.is_component() {
            "component"
        } else {
            "interpolation"
        };
        writeln!(out, "root {index} ({kind})").unwrap();
        outline_nodes(&root.nodes, 1, &mut out);
    }
    out
}

fn outline_nodes(nodes: &[Node], depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        let line = match node {
            Node::Declaration(decl) => {
                let important = if decl.important { " !important" } else { "" };
                format!("decl {:?}: {:?}{important}", decl.prop, decl.value)
            }
            Node::Rule(rule) => format!("rule {:?}", rule.selector),
            Node::AtRule(at_rule) => format!("at-rule @{} {:?}", at_rule.name, at_rule.params),
            Node::Comment(comment) => format!("comment {:?}", comment.text),
        };
        writeln!(out, "{indent}{line}").unwrap();
        if let Some(children) = node.nodes() {
            outline_nodes(children, depth + 1, out);
        }
    }
}

#[test]
fn round_trip_fixtures() {
    insta::glob!("fixtures/*.{js,jsx,tsx}", |path| {
        let source_text = fs::read_to_string(path).unwrap();
        let file_name = path.file_name().unwrap().to_str().unwrap();
        let options = ParseOptions::new().with_from(file_name);

        let located = locate_fragments(&source_text, &options);
        assert!(located.diagnostics.is_empty(), "{file_name}: {:?}", located.diagnostics);
        assert!(!located.fragments.is_empty(), "{file_name}: no fragments");

        let document = parse(&source_text, &options)
            .unwrap_or_else(|error| panic!("{file_name}: {error}"));
        assert_eq!(document.nodes.len(), located.fragments.len());
        assert_eq!(document.to_string(), source_text, "{file_name}");

        for root in &document.nodes {
            root.walk_decls(|decl| {
                assert!(!decl.prop.is_empty(), "{file_name}: empty property");
                true
            });
        }

        let name = path.file_stem().unwrap().to_str().unwrap();
        insta::with_settings!({
            snapshot_path => path.parent().unwrap(),
            prepend_module_to_snapshot => false,
            snapshot_suffix => "",
            omit_expression => true,
        }, {
            insta::assert_snapshot!(name, outline(&document));
        });
    });
}
