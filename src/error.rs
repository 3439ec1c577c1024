use actix_web::{http::StatusCode, ResponseError};
use bigdecimal::ParseBigDecimalError as BIG_DECIMAL_ERROR;
use reqwest::header::InvalidHeaderValue as INVALID_HEADER_VALUE;
use reqwest::Error as REQWEST_ERROR;
use sqlx::error::Error as SQL_ERROR;
use std::{
    io::Error as IO_ERROR, num::ParseIntError,
    str::ParseBoolError as PARSE_BOOL_ERROR,
};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::subscriber::SetGlobalDefaultError as TRACING_GLOBAL_DEFAULT_ERROR;
use url::ParseError as URL_ERROR;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Io(#[from] IO_ERROR),

    #[error("{0}")]
    URL(#[from] URL_ERROR),

    #[error("{0}")]
    INT(#[from] ParseIntError),

    #[error("{0}")]
    SQL(#[from] SQL_ERROR),

    #[error("{0}")]
    TokioJoinError(#[from] JoinError),

    #[error("{0}")]
    BigDecimalError(#[from] BIG_DECIMAL_ERROR),

    #[error("{0}")]
    ParseBoolError(#[from] PARSE_BOOL_ERROR),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("Tracing error: {0}")]
    SetGlobalDefaultError(#[from] TRACING_GLOBAL_DEFAULT_ERROR),

    #[error("{0}")]
    ReqwestError(#[from] REQWEST_ERROR),

    #[error("{0}")]
    InvalidHeaderValue(#[from] INVALID_HEADER_VALUE),

    #[error("Invalid option {option}")]
    InvalidOption { option: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Lookup failure: {0}")]
    LookupFailure(String),

    #[error("Persistence failure: {0}")]
    PersistenceFailure(String),
}

impl ResponseError for Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidOption { .. } | Error::BigDecimalError(_) => {
                StatusCode::BAD_REQUEST
            },
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
