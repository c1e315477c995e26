use crate::transport::TransportError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("report length error: rep_len=0 with {count} active touches")]
    ReportLength { count: usize },

    #[error("exclusive access request failed: {0}")]
    Exclusive(TransportError),

    #[error("invalid value: {0:?}")]
    InvalidValue(String),

    #[error("device parameter {param} failed: {source}")]
    Param {
        param: &'static str,
        source: TransportError,
    },

    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("capture line {line}: {reason}")]
    Capture { line: usize, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
