use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("class {class}: {source}")]
    Class {
        class: String,
        #[source]
        source: distmerge_classfile::ClassError,
    },

    #[error("merge error: {0}")]
    Merge(#[from] distmerge_merge::MergeError),

    #[error("archive error: {0}")]
    Archive(#[from] distmerge_archive::ArchiveError),

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{path}:{line}: unrecognized mapping line `{text}`")]
    Mapping { path: PathBuf, line: usize, text: String },

    #[error("marker class {class} could not be generated: {source}")]
    MarkerClass {
        class: String,
        #[source]
        source: distmerge_classfile::ClassError,
    },
}

impl EngineError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        EngineError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn class(class: impl Into<String>, source: distmerge_classfile::ClassError) -> Self {
        EngineError::Class {
            class: class.into(),
            source,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
