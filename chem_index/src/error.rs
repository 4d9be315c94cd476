//! Errors raised while loading the catalog and reading records.
//!
//! Anything returned while building a [`crate::context::Context`] is fatal for the server. The
//! same variants show up per request, where handlers log them and fall back to an empty response.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed line {line} in {path}: {content:?}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        content: String,
    },

    #[error("invalid catalog {path}: {source}")]
    Catalog {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate id in catalog: {0}")]
    DuplicateId(String),

    #[error("files referenced by the catalog are missing: {0:?}")]
    MissingFiles(Vec<PathBuf>),

    #[error("index {index} has an entry ending at byte {end} but {records} is only {size} bytes")]
    IndexOutOfBounds {
        index: PathBuf,
        records: PathBuf,
        end: u64,
        size: u64,
    },

    #[error("unknown {kind} id: {id}")]
    UnknownId { kind: &'static str, id: String },

    #[error("ordinal {ordinal} out of range (len {len})")]
    OrdinalOutOfRange { ordinal: usize, len: usize },

    #[error("record {ordinal} has {found} fields, expected at least {expected}")]
    MalformedRecord {
        ordinal: usize,
        found: usize,
        expected: usize,
    },

    #[error("bin {bin} out of range for variant {variant} ({len} bins)")]
    BinOutOfRange {
        variant: String,
        bin: usize,
        len: usize,
    },

    #[error("bin {bin} of variant {variant} is empty")]
    EmptyBin { variant: String, bin: usize },

    #[error("{command} expects an argument at position {position}")]
    MissingArgument {
        command: &'static str,
        position: usize,
    },

    #[error("invalid argument: {0:?}")]
    InvalidArgument(String),
}

impl Error {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub fn unknown(kind: &'static str, id: &str) -> Self {
        Error::UnknownId {
            kind,
            id: id.to_string(),
        }
    }
}
