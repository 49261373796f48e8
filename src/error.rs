use crate::filters::Filter;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("{filter}: argument {index}: {reason}")]
    ArgumentError {
        filter: Filter,
        index: usize,
        reason: String,
    },

    #[error("unknown filter: {0}")]
    UnknownFilter(String),

    #[error("strict mode: {0} problem(s) in input")]
    Strict(usize),
}
