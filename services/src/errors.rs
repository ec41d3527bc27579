use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    /// The request to the peer failed or the parsing of the response
    /// failed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The request returned a non-OK status code.
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The peer answered with something its contract does not allow.
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    /// The record store has no row for the given key.
    #[error("Not found: {0}")]
    NotFound(String),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
