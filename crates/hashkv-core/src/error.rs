use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HashkvError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("value not found for key {0:?}")]
    NotFound(String),

    #[error("failed to encode value: {0}")]
    Encode(serde_json::Error),

    #[error("failed to decode value for key {0:?}: {1}")]
    Decode(String, serde_json::Error),

    #[error("bucket split failed: {0}")]
    Split(Box<HashkvError>),
}

pub type HashkvResult<T> = Result<T, HashkvError>;
