use sql_middleware::SqlMiddlewareDbError;
use thiserror::Error;

/// Crate-wide error type. Payloads are plain strings so results stay `Clone`,
/// which the single-flight registry needs to hand one outcome to every joiner.
#[derive(Error, Debug, Clone)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),
    #[error("db error: {0}")]
    Db(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Other(String),
}

impl From<SqlMiddlewareDbError> for EngineError {
    fn from(err: SqlMiddlewareDbError) -> Self {
        Self::Db(err.to_string())
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<String> for EngineError {
    fn from(err: String) -> Self {
        Self::Other(err)
    }
}

impl From<&str> for EngineError {
    fn from(err: &str) -> Self {
        Self::Other(err.to_string())
    }
}
