use thiserror::Error;

use tuplestream_operators::OpError;

#[derive(Debug, Error)]
pub enum ExecError {
    #[error("operation failed: {0}")]
    Op(#[from] OpError),

    #[error("codec: {0}")]
    Codec(#[from] tuplestream_codec::Error),

    #[error("core: {0}")]
    Core(#[from] tuplestream_core::Error),

    #[error("invalid input: {0}")]
    Invalid(String),

    #[error("worker: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, ExecError>;
