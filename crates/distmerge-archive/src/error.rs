use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Stream(#[from] std::io::Error),

    #[error("ZIP error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A required entry is absent from an archive.
    #[error("{archive}: missing entry {entry}")]
    MissingEntry { archive: String, entry: String },

    #[error("{archive}: manifest has no Bundler-Format attribute, not a bundled server archive")]
    MissingBundlerFormat { archive: String },

    #[error("{archive}: unsupported Bundler-Format {format}, expected 1.0")]
    UnsupportedBundlerFormat { archive: String, format: String },

    #[error("{archive}: invalid versions list line `{line}`, expected hash, id and path separated by tabs")]
    InvalidVersionsLine { archive: String, line: String },

    #[error("{archive}: versions list has {count} entries, expected exactly 1")]
    VersionsCount { archive: String, count: usize },

    #[error("{0} is not valid UTF-8 text")]
    NotText(String),

    #[error("duplicate output entry: {0}")]
    DuplicateEntry(String),

    #[error("timestamp out of range for archive entries")]
    InvalidTimestamp,
}

impl ArchiveError {
    /// Attach a path to an I/O error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;
