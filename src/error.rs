use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("unknown field name '{0}' (expected one of: ip, date, code, method, uri, protocol, request, ua, ref)")]
    UnknownField(String),

    #[error("invalid format '{spec}': {reason}")]
    InvalidFormat { spec: String, reason: String },

    #[error("invalid pattern for field '{field}': {pattern}")]
    InvalidPattern {
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("pattern '{0}' is not bound to a field name")]
    UnboundPattern(String),

    #[error("group field list is empty")]
    EmptyGroup,

    #[error("cannot read {}: {source}", path.display())]
    FileAccess {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Files not found: no input files were given")]
    NoInput,

    #[error("cannot read config {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid filter rule: {0}")]
    InvalidRule(String),

    #[error("unknown preset '{0}'")]
    UnknownPreset(String),

    #[error("invalid selection '{0}'")]
    InvalidSelection(String),

    #[error("key path has {actual} components, tree depth is {expected}")]
    KeyPathDepth { expected: usize, actual: usize },

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn invalid_format(spec: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            spec: spec.into(),
            reason: reason.into(),
        }
    }

    pub fn file_access(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileAccess {
            path: path.into(),
            source,
        }
    }
}
