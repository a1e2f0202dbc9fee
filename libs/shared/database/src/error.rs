use thiserror::Error;

use shared_models::{AppError, SheetTableError};

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Sheets API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Malformed range: {0}")]
    Table(#[from] SheetTableError),

    #[error("Credentials error: {0}")]
    Credentials(String),
}

impl From<SheetsError> for AppError {
    fn from(err: SheetsError) -> Self {
        AppError::Sheets(err.to_string())
    }
}
