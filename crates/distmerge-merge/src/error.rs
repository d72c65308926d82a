use thiserror::Error;

use crate::members::Side;

#[derive(Debug, Error)]
pub enum MergeError {
    /// Two members on one side share an equivalence key.
    #[error("duplicate {kind} `{key}` on the {side} side")]
    DuplicateKey {
        kind: &'static str,
        key: String,
        side: Side,
    },

    /// The two member lists could not be threaded into one consistent order.
    #[error("{kind} lists could not be aligned: {reason}")]
    Misaligned { kind: &'static str, reason: String },

    /// A structural failure inside one class pair.
    #[error("merging class {class}: {source}")]
    Class {
        class: String,
        #[source]
        source: Box<MergeError>,
    },

    #[error("unrecognized version identifier `{0}`")]
    InvalidVersion(String),
}

pub type MergeResult<T> = Result<T, MergeError>;
