use thiserror::Error;

use shared_config::ConfigError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Spreadsheet error: {0}")]
    Sheets(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Captcha error: {0}")]
    Captcha(String),

    #[error("Amplimed error: {0}")]
    Amplimed(String),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Run aborted by operator")]
    Aborted,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
