//! Options for parsing styled-component sources.
//!
//! Only `from` is recognized. It names the file in error messages and picks the
//! JS/TS dialect used to locate fragments.

use oxc_span::SourceType;

/// Options for [`crate::parse`].
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Logical filename of the source being parsed.
    ///
    /// Shows up in `CssSyntaxError` messages. Its extension selects the
    /// source type (`.tsx`, `.jsx`, `.js`, ...). Without it the source is
    /// parsed as TypeScript.
    pub from: Option<String>,
}

impl ParseOptions {
    /// Create new options with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the logical filename.
    #[must_use]
    pub fn with_from(mut self, from: impl Into<String>) -> Self {
        self.from = Some(from.into());
        self
    }

    /// Source type used when scanning for fragments.
    pub(crate) fn source_type(&self) -> SourceType {
        self.from
            .as_deref()
            .and_then(|path| SourceType::from_path(path).ok())
            .unwrap_or_else(SourceType::ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_source_type_is_typescript() {
        let source_type = ParseOptions::new().source_type();
        assert!(source_type.is_typescript());
        assert!(!source_type.is_jsx());
    }

    #[test]
    fn test_source_type_follows_extension() {
        let source_type = ParseOptions::new().with_from("Button.tsx").source_type();
        assert!(source_type.is_typescript());
        assert!(source_type.is_jsx());

        let source_type = ParseOptions::new().with_from("Button.jsx").source_type();
        assert!(source_type.is_javascript());
    }

    #[test]
    fn test_unknown_extension_falls_back() {
        let source_type = ParseOptions::new().with_from("styles.css").source_type();
        assert!(source_type.is_typescript());
    }
}
