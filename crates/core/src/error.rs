use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Relay error: {0}")]
    Relay(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("{0}")]
    Other(String),
}

/// Faults raised by the external-engine channel. Callers branch on the
/// variant: unreachable means the engine process is not running at all,
/// busy means the endpoint exists but is serving another caller.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Engine endpoint not found: {0} (is the engine running?)")]
    Unreachable(String),

    #[error("Engine endpoint busy: {0}")]
    Busy(String),

    #[error("Engine response timeout after {0:?}")]
    Timeout(Duration),

    #[error("Engine returned malformed response: {0}")]
    Malformed(String),

    #[error("Engine channel error: {0}")]
    Channel(std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
