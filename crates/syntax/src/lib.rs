//! # Drift Syntax
//!
//! Program text to owned, location-annotated syntax trees.
//!
//! ## Architecture
//!
//! ```text
//! Program text
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> Tree-sitter Parsing → concrete tree
//!     │
//!     └──> Conversion
//!          ├─> Named nodes only, with field names and 1-indexed line spans
//!          ├─> Leaf text kept for identifiers, literals and fragments
//!          └─> Comments lifted into a separate stream
//! ```
//!
//! ## Example
//!
//! ```rust
//! use drift_syntax::parse_source;
//!
//! let tree = parse_source("// [START hello]\nfunction hello() {}\n// [END hello]\n").unwrap();
//! assert_eq!(tree.comments.len(), 2);
//! assert!(tree.statements()[0].is("function_declaration"));
//! ```

mod error;
mod language;
mod parser;
mod tree;

pub use error::{Result, SyntaxError};
pub use language::Language;
pub use parser::{parse_source, JsParser};
pub use tree::{Comment, LineSpan, SyntaxNode, SyntaxTree};
