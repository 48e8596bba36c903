//! # Drift Engine
//!
//! Region-tag extraction and test association for JavaScript samples.
//!
//! ## Architecture
//!
//! ```text
//! Sample directory
//!     │
//!     ├──> FileScanner → source files, test files, override files
//!     │
//!     ├──> Source files
//!     │    ├─> SourceMethodExtractor (5 strategies) → SnippetMethod[]
//!     │    ├─> Region tags: [START tag] ... [END tag] spans nesting each method
//!     │    └─> CLI invocation names from the command-builder chain
//!     │
//!     ├──> Test files
//!     │    ├─> TestChainExtractor: describe/it chains → LookupTable
//!     │    └─> Associator: first matching rule attaches test data
//!     │
//!     ├──> OverrideSet: aliases → manual associations → suppressed tags
//!     │
//!     └──> Analysis
//!          ├─> repo.json method records
//!          ├─> region-tag and source-file reports
//!          └─> xUnit snippet mapping
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use drift_engine::{analyze_dir, DriftConfig};
//!
//! let config = DriftConfig::default();
//! let analysis = analyze_dir("samples", &config).unwrap();
//! for method in analysis.methods.iter().filter(|m| !m.is_tested()) {
//!     println!("{}:{} {} is untested", method.source_path, method.start_line, method.name);
//! }
//! ```

mod analyze;
mod associator;
mod cli_commands;
mod config;
mod error;
mod labeler;
mod lookup;
mod overrides;
mod region_tags;
mod report;
mod scanner;
mod source;
mod test_chains;
mod types;

pub use analyze::{analyze_dir, validate_overrides, Analysis};
pub use associator::{associate, first_match, AssociationRule, MatchFn, ASSOCIATION_RULES};
pub use cli_commands::extract as extract_cli_commands;
pub use config::DriftConfig;
pub use error::{DriftError, Result};
pub use labeler::{find_closing_block, find_preceding_block, wrap_test, wrap_test_file, WrapOutcome};
pub use lookup::{LookupEntry, LookupTable};
pub use overrides::{OverrideFile, OverrideRecord, OverrideSet, ProblemKind, ValidationProblem};
pub use region_tags::{index as index_region_tags, scan_marker_tags, RegionTagIndex};
pub use report::{
    inject_snippet_mapping, region_tag_report, source_files, RegionTagReport, TagSummary,
    TestedFilter,
};
pub use scanner::{FileScanner, ScannedFiles};
pub use source::{
    default_strategies, Candidate, DirectDeclarationStrategy, ExportedHandlerStrategy,
    ExtractContext, ExtractedSource, RouteHandlerStrategy, SourceMethodExtractor, SourceStrategy,
    WrappedDirectDeclarationStrategy, WrappedEntryPointStrategy,
};
pub use test_chains::{
    default_matchers, file_wide_invocation, top_level_constants, CaseContext, DirectCallMatcher,
    HandlerInvocationMatcher, HttpClientMatcher, RegionTagConstantMatcher, ShellCommandMatcher,
    TestChainExtractor, TestFileIndex, TestMatcher,
};
pub use types::{Diagnostic, Extraction, RegionTagSpan, SnippetMethod, TestAssociation};

pub use drift_syntax::Language;
