use crate::error::{Result, SyntaxError};
use std::path::Path;

/// Language of a sample or test file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    JavaScript,
    TypeScript,
    Python,
    Ruby,
    Php,
    Unknown,
}

impl Language {
    /// Detect language from file extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "js" | "mjs" | "cjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "py" | "pyw" => Language::Python,
            "rb" => Language::Ruby,
            "php" => Language::Php,
            _ => Language::Unknown,
        }
    }

    /// Detect language from file path
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .map(Self::from_extension)
            .unwrap_or(Language::Unknown)
    }

    /// Get language name as string
    pub fn as_str(self) -> &'static str {
        match self {
            Language::JavaScript => "javascript",
            Language::TypeScript => "typescript",
            Language::Python => "python",
            Language::Ruby => "ruby",
            Language::Php => "php",
            Language::Unknown => "unknown",
        }
    }

    /// Check if this language can be turned into a [`crate::SyntaxTree`]
    pub fn supports_ast(self) -> bool {
        matches!(self, Language::JavaScript)
    }

    /// Get Tree-sitter language instance
    pub fn tree_sitter_language(self) -> Result<tree_sitter::Language> {
        match self {
            Language::JavaScript => Ok(tree_sitter_javascript::LANGUAGE.into()),
            _ => Err(SyntaxError::unsupported_language(self.as_str())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_extension() {
        assert_eq!(Language::from_extension("js"), Language::JavaScript);
        assert_eq!(Language::from_extension("JS"), Language::JavaScript);
        assert_eq!(Language::from_extension("mjs"), Language::JavaScript);
        assert_eq!(Language::from_extension("py"), Language::Python);
        assert_eq!(Language::from_extension("rb"), Language::Ruby);
        assert_eq!(Language::from_extension("unknown"), Language::Unknown);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(Language::from_path("samples/index.js"), Language::JavaScript);
        assert_eq!(Language::from_path("test/index.test.js"), Language::JavaScript);
        assert_eq!(Language::from_path("main.py"), Language::Python);
        assert_eq!(Language::from_path("no_extension"), Language::Unknown);
    }

    #[test]
    fn test_supports_ast() {
        assert!(Language::JavaScript.supports_ast());
        assert!(!Language::Python.supports_ast());
        assert!(!Language::Unknown.supports_ast());
    }

    #[test]
    fn test_tree_sitter_language() {
        assert!(Language::JavaScript.tree_sitter_language().is_ok());
        assert!(Language::Ruby.tree_sitter_language().is_err());
    }
}
