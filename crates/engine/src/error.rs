use drift_syntax::SyntaxError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for drift operations
pub type Result<T> = std::result::Result<T, DriftError>;

/// Errors that abort an analysis run
#[derive(Error, Debug)]
pub enum DriftError {
    /// Reading a file failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be turned into a syntax tree
    #[error("Failed to parse {path}: {source}")]
    Syntax {
        path: PathBuf,
        #[source]
        source: SyntaxError,
    },

    /// An override record names a tag that no snippet method carries
    #[error("Tag {tag} in file {file} doesn't map to a snippet method")]
    DanglingOverride { tag: String, file: PathBuf },

    /// An override record matches none of the recognized shapes
    #[error("Malformed entry {key} in file {file}: {reason}")]
    MalformedOverride {
        key: String,
        file: PathBuf,
        reason: String,
    },

    /// An override file is not valid TOML
    #[error("Failed to parse override file {file}: {message}")]
    OverrideParse { file: PathBuf, message: String },

    /// Block lookup requested for a file category without block rules
    #[error("File category not supported: {0}")]
    UnsupportedCategory(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Reporting input could not be processed
    #[error("Report error: {0}")]
    Report(String),
}

impl DriftError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn syntax(path: impl Into<PathBuf>, source: SyntaxError) -> Self {
        Self::Syntax {
            path: path.into(),
            source,
        }
    }

    pub fn malformed(key: impl Into<String>, file: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedOverride {
            key: key.into(),
            file: file.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn report(msg: impl Into<String>) -> Self {
        Self::Report(msg.into())
    }
}
