use std::{fmt, io};

use http::status::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;
use tokio::sync::mpsc::error::SendError as TokioSendError;

use crate::worker::{CorrelationReply, CorrelationRequest};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum CorrNetError {
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File System error: {0}")]
    Io(String),
    #[error("Item Not Found: {0}")]
    NotFound(String),
    #[error("Computation cancelled before completion")]
    OperationCancelled,
    #[error("Could not parse tabular input: {0}")]
    Parse(String),
    #[error("Invalid attribute query at offset {offset}: {message}")]
    QueryGrammar { message: String, offset: usize },
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
    #[error("Graph failed structural verification: {0}")]
    Structural(String),
    #[error("Correlation worker error: {0}")]
    Worker(String),
}

impl CorrNetError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            CorrNetError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CorrNetError::Custom(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CorrNetError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CorrNetError::NotFound(_) => StatusCode::NOT_FOUND,
            CorrNetError::OperationCancelled => StatusCode::NO_CONTENT,
            CorrNetError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CorrNetError::QueryGrammar { .. } => StatusCode::BAD_REQUEST,
            CorrNetError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            CorrNetError::Structural(_) => StatusCode::UNPROCESSABLE_ENTITY,
            CorrNetError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<toml::de::Error> for CorrNetError {
    fn from(src: toml::de::Error) -> CorrNetError {
        CorrNetError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for CorrNetError {
    fn from(src: toml::ser::Error) -> CorrNetError {
        CorrNetError::Serialization(format!("Toml serialization error: {src}"))
    }
}

impl From<JsonError> for CorrNetError {
    fn from(src: JsonError) -> CorrNetError {
        CorrNetError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<io::Error> for CorrNetError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => CorrNetError::NotFound(format!("{x}")),
            _ => CorrNetError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<fmt::Error> for CorrNetError {
    fn from(x: fmt::Error) -> Self {
        CorrNetError::Custom(format!("{x}"))
    }
}

impl From<TokioSendError<CorrelationRequest>> for CorrNetError {
    fn from(x: TokioSendError<CorrelationRequest>) -> Self {
        CorrNetError::Worker(format!(
            "Channel send error, could not transmit correlation request {}",
            x.0.id
        ))
    }
}

impl From<TokioSendError<CorrelationReply>> for CorrNetError {
    fn from(x: TokioSendError<CorrelationReply>) -> Self {
        CorrNetError::Worker(format!(
            "Channel send error, could not transmit correlation reply {}",
            x.0.id
        ))
    }
}
