use thiserror::Error;

/// A malformed unit in a corpus or morphology file. These are never fatal:
/// the offending sentence or line is skipped, logged and counted.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{path}:{line}: row has {found} fields, expected {expected}")]
    TooFewFields {
        path: String,
        line: usize,
        found: usize,
        expected: usize,
    },
    #[error("{path}:{line}: invalid token id {id:?}")]
    InvalidTokenId {
        path: String,
        line: usize,
        id: String,
    },
    #[error("{path}:{line}: invalid head index {head:?}")]
    InvalidHead {
        path: String,
        line: usize,
        head: String,
    },
    #[error("{path}:{line}: head index {head} out of range for sentence of {len} tokens")]
    HeadOutOfRange {
        path: String,
        line: usize,
        head: usize,
        len: usize,
    },
    #[error("{path}:{line}: invalid multiword token range {range:?}")]
    InvalidMultiwordRange {
        path: String,
        line: usize,
        range: String,
    },
}
